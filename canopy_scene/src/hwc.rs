// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-surface hardware-composition bookkeeping.

use alloc::vec::Vec;
use hashbrown::HashMap;

use canopy_region::RectI;

/// Why a surface was denied the hardware overlay path this frame.
///
/// Reasons are diagnostics only; the load-bearing state is the forced-
/// disabled flag on [`HwcRecorder`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HwcDisabledReason {
    /// Background fill is translucent; the overlay would show through
    /// incorrectly.
    BackgroundAlpha,
    /// Accumulated ancestor alpha below one.
    AccumulatedAlpha,
    /// A solid-color layer quota or heuristic rejected the surface.
    SolidColorLayer,
    /// Buffer dimensions incompatible with the overlay scaler.
    BufferSize,
    /// The node or an ancestor is rotated by a non-multiple of 90 degrees.
    Rotation,
    /// Overlaps a hardware-composed surface below it in the same app.
    HwcNodeBelow,
    /// Rounded corners over a node below require GPU blending.
    CornerRadius,
    /// Intersects a transparent clean filter region.
    CleanFilter,
    /// Intersects a filter region with dirty content below it.
    DirtyFilter,
    /// Intersects a color-picker sampling region.
    ColorPicker,
    /// Covered by a transparent surface whose own hardware path was denied.
    TransparentCover,
    /// Part of a cross-display scene that must compose on the GPU.
    CrossDisplay,
    /// The hardware prevalidate query rejected the layer.
    Prevalidate,
    /// A pluggable device policy vetoed the surface.
    Policy,
}

impl HwcDisabledReason {
    /// Short label for logs and tooling.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::BackgroundAlpha => "background-alpha",
            Self::AccumulatedAlpha => "accumulated-alpha",
            Self::SolidColorLayer => "solid-color-layer",
            Self::BufferSize => "buffer-size",
            Self::Rotation => "rotation",
            Self::HwcNodeBelow => "hwc-node-below",
            Self::CornerRadius => "corner-radius",
            Self::CleanFilter => "clean-filter",
            Self::DirtyFilter => "dirty-filter",
            Self::ColorPicker => "color-picker",
            Self::TransparentCover => "transparent-cover",
            Self::CrossDisplay => "cross-display",
            Self::Prevalidate => "prevalidate",
            Self::Policy => "policy",
        }
    }
}

/// Disable reasons collected per node id for external tooling.
///
/// Answers "why wasn't this surface hardware-composed" without affecting
/// the decision itself.
#[derive(Clone, Debug, Default)]
pub struct HwcDisabledReasonCollection {
    reasons: HashMap<u64, Vec<HwcDisabledReason>>,
}

impl HwcDisabledReasonCollection {
    /// An empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reason against a node. Duplicate reasons for the same node
    /// are kept once.
    pub fn add(&mut self, node: u64, reason: HwcDisabledReason) {
        let entry = self.reasons.entry(node).or_default();
        if !entry.contains(&reason) {
            entry.push(reason);
        }
    }

    /// The reasons recorded for a node this frame.
    #[must_use]
    pub fn reasons_for(&self, node: u64) -> &[HwcDisabledReason] {
        self.reasons.get(&node).map_or(&[], Vec::as_slice)
    }

    /// Returns true when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    /// Clears all records for a new frame.
    pub fn clear(&mut self) {
        self.reasons.clear();
    }

    /// Iterates `(node, reasons)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[HwcDisabledReason])> {
        self.reasons.iter().map(|(&id, v)| (id, v.as_slice()))
    }
}

/// Per-surface hardware-composition state for the current frame.
///
/// Mutated only by the eligibility engine during the walk and read by the
/// downstream composition stage. The forced-disabled flag is monotonic
/// within a frame: [`disable`](Self::disable) sets it and nothing clears it
/// until [`begin_frame`](Self::begin_frame).
#[derive(Clone, Debug, Default)]
pub struct HwcRecorder {
    forced_disabled: bool,
    /// Whether the surface actually took the overlay path last frame.
    pub enabled_last_frame: bool,
    /// Pre-order counter value used for filter z-comparisons.
    pub z_order_for_filter: u32,
    /// Final stacking order handed to the composer.
    pub global_z_order: u32,
    /// Buffer-space rect sampled by the overlay.
    pub src_rect: RectI,
    /// Display-space rect the overlay covers.
    pub dst_rect: RectI,
    /// Protected content may keep the overlay path despite other disables.
    pub protected_force_enable: bool,
}

impl HwcRecorder {
    /// Starts a new frame: the previous decision becomes
    /// [`enabled_last_frame`](Self::enabled_last_frame) and the forced-
    /// disabled flag resets.
    pub fn begin_frame(&mut self) {
        self.enabled_last_frame = !self.is_forced_disabled();
        self.forced_disabled = false;
        self.protected_force_enable = false;
        self.z_order_for_filter = 0;
    }

    /// Denies the overlay path for the rest of the frame.
    pub fn disable(&mut self) {
        self.forced_disabled = true;
    }

    /// Whether the overlay path is currently denied.
    #[must_use]
    pub fn is_forced_disabled(&self) -> bool {
        self.forced_disabled && !self.protected_force_enable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disable_is_monotonic_within_frame() {
        let mut r = HwcRecorder::default();
        r.begin_frame();
        assert!(!r.is_forced_disabled());
        r.disable();
        assert!(r.is_forced_disabled());
        // Nothing short of a new frame clears it.
        r.z_order_for_filter = 3;
        assert!(r.is_forced_disabled());
        r.begin_frame();
        assert!(!r.is_forced_disabled());
        assert!(!r.enabled_last_frame);
    }

    #[test]
    fn protected_force_enable_overrides_disable() {
        let mut r = HwcRecorder::default();
        r.begin_frame();
        r.disable();
        r.protected_force_enable = true;
        assert!(!r.is_forced_disabled());
    }

    #[test]
    fn reason_collection_dedupes() {
        let mut c = HwcDisabledReasonCollection::new();
        c.add(7, HwcDisabledReason::Rotation);
        c.add(7, HwcDisabledReason::Rotation);
        c.add(7, HwcDisabledReason::DirtyFilter);
        assert_eq!(
            c.reasons_for(7),
            [HwcDisabledReason::Rotation, HwcDisabledReason::DirtyFilter]
        );
        assert!(c.reasons_for(8).is_empty());
    }
}
