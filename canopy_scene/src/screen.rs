// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Screen and logical-display state.

use canopy_dirty::DirtyRegionManager;
use canopy_region::RectI;

use crate::id::NodeId;
use crate::special::SpecialLayerManager;

/// Display rotation in multiples of 90 degrees.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScreenRotation {
    /// Natural orientation.
    #[default]
    Rotation0,
    /// Rotated 90 degrees.
    Rotation90,
    /// Rotated 180 degrees.
    Rotation180,
    /// Rotated 270 degrees.
    Rotation270,
}

impl ScreenRotation {
    /// Returns true when the rotation swaps width and height.
    #[must_use]
    pub const fn swaps_axes(&self) -> bool {
        matches!(self, Self::Rotation90 | Self::Rotation270)
    }

    /// Rotation angle in degrees.
    #[must_use]
    pub const fn degrees(&self) -> f64 {
        match self {
            Self::Rotation0 => 0.0,
            Self::Rotation90 => 90.0,
            Self::Rotation180 => 180.0,
            Self::Rotation270 => 270.0,
        }
    }
}

/// Static and power state of a physical screen, supplied by the screen
/// manager outside this core.
#[derive(Clone, Debug, Default)]
pub struct ScreenInfo {
    /// Screen-manager id of the screen.
    pub id: u64,
    /// Panel width in pixels at natural orientation.
    pub width: u32,
    /// Panel height in pixels at natural orientation.
    pub height: u32,
    /// Current rotation applied by the display pipeline.
    pub rotation: ScreenRotation,
    /// Whether the panel is powered on.
    pub power_on: bool,
    /// A privacy curtain covers the screen.
    pub curtain_on: bool,
    /// Current panel luminance level.
    pub luminance: u32,
    /// Whether this is a virtual (capture/cast) screen.
    pub is_virtual: bool,
}

impl ScreenInfo {
    /// The screen's rect in device pixels at natural orientation.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "panel dimensions fit in i32"
    )]
    pub fn rect(&self) -> RectI {
        RectI::from_size(0, 0, self.width as i32, self.height as i32)
    }

    /// The screen rect with rotation applied.
    #[must_use]
    pub fn rotated_rect(&self) -> RectI {
        let r = self.rect();
        if self.rotation.swaps_axes() {
            RectI::new(r.top, r.left, r.bottom, r.right)
        } else {
            r
        }
    }
}

/// Per-frame state of a screen node.
#[derive(Clone, Debug, Default)]
pub struct ScreenState {
    /// Screen-manager data for this screen.
    pub info: ScreenInfo,
    /// The screen-level dirty accumulator.
    pub dirty: DirtyRegionManager,
    /// Whether any display on this screen is mid-rotation this frame.
    pub rotation_animating: bool,
}

/// Per-frame state of a logical-display node.
///
/// A logical display maps part of a screen; mirrored and cast displays
/// reference the display they reproduce.
#[derive(Clone, Debug, Default)]
pub struct DisplayState {
    /// The screen this display presents on.
    pub screen_id: u64,
    /// Display offset on the screen, device pixels.
    pub offset_x: i32,
    /// Display offset on the screen, device pixels.
    pub offset_y: i32,
    /// Display rotation relative to the screen.
    pub rotation: ScreenRotation,
    /// Rotation changed since the previous frame.
    pub rotation_changed: bool,
    /// The display is a mirror of another logical display.
    pub mirror_source: Option<NodeId>,
    /// Security-exempt displays still show `SECURITY` layers.
    pub security_exempt: bool,
    /// Aggregate special-layer bits merged from visited surfaces.
    pub special_layers: SpecialLayerManager,
    /// The display is zoomed (magnification); zoom edges invalidate fully.
    pub zoomed: bool,
    /// Zoom state of the previous frame.
    pub was_zoomed: bool,
    /// Whether HDR content was present on this display this frame.
    pub has_hdr_content: bool,
    /// Largest opaque rects of the top surfaces, for stencil culling.
    pub top_opaque_rects: alloc::vec::Vec<RectI>,
    /// Stencil collection order; the sentinel disables further collection.
    pub occlusion_surface_order: i32,
}

/// Stencil collection stops once this sentinel is assigned.
pub(crate) const OCCLUSION_ORDER_DISABLED: i32 = -1;

impl DisplayState {
    /// Resets the per-frame accumulators for a new prepare pass.
    pub fn begin_frame(&mut self) {
        self.special_layers.reset();
        self.top_opaque_rects.clear();
        self.occlusion_surface_order = 0;
        self.has_hdr_content = false;
        self.rotation_changed = false;
    }

    /// Whether stencil opaque-rect collection is still running.
    #[must_use]
    pub fn stencil_collection_active(&self) -> bool {
        self.occlusion_surface_order != OCCLUSION_ORDER_DISABLED
    }

    /// Stops stencil collection for the rest of the pass.
    pub fn disable_stencil_collection(&mut self) {
        self.occlusion_surface_order = OCCLUSION_ORDER_DISABLED;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_axis_swap() {
        assert!(!ScreenRotation::Rotation0.swaps_axes());
        assert!(ScreenRotation::Rotation90.swaps_axes());
        assert!(!ScreenRotation::Rotation180.swaps_axes());
        assert!(ScreenRotation::Rotation270.swaps_axes());
    }

    #[test]
    fn rotated_rect_swaps_dimensions() {
        let info = ScreenInfo {
            width: 1080,
            height: 2340,
            rotation: ScreenRotation::Rotation90,
            ..Default::default()
        };
        let r = info.rotated_rect();
        assert_eq!((r.width(), r.height()), (2340, 1080));
    }

    #[test]
    fn stencil_sentinel_stops_collection() {
        let mut d = DisplayState::default();
        d.begin_frame();
        assert!(d.stencil_collection_active());
        d.disable_stencil_collection();
        assert!(!d.stencil_collection_active());
        d.begin_frame();
        assert!(d.stencil_collection_active());
    }
}
