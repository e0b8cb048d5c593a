// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-surface window state.

use alloc::string::String;
use kurbo::Affine;

use canopy_dirty::DirtyRegionManager;
use canopy_region::{RectI, Region};

use crate::hwc::HwcRecorder;
use crate::id::NodeId;
use crate::special::SpecialLayerManager;

/// Window classification of a surface node.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SurfaceWindowType {
    /// Plain surface with no window role.
    #[default]
    Default,
    /// Application content window.
    Main,
    /// Transient container wrapping a main window during animation.
    Leash,
    /// Self-drawing surface with its own producer buffer; the hardware
    /// overlay candidate class.
    SelfDrawing,
}

impl SurfaceWindowType {
    /// Main windows participate in occlusion and dirty finalization.
    #[must_use]
    pub const fn is_main(&self) -> bool {
        matches!(self, Self::Main)
    }

    /// Leash windows drive front-to-back child iteration.
    #[must_use]
    pub const fn is_leash(&self) -> bool {
        matches!(self, Self::Leash)
    }

    /// Surfaces walked by the global dirty pass.
    #[must_use]
    pub const fn is_leash_or_main(&self) -> bool {
        matches!(self, Self::Main | Self::Leash)
    }

    /// Surfaces eligible for the hardware overlay path.
    #[must_use]
    pub const fn is_hardware_candidate(&self) -> bool {
        matches!(self, Self::SelfDrawing)
    }
}

/// How much of a surface remains visible after occlusion, reported to the
/// window manager for QoS decisions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum VisibleLevel {
    /// Fully occluded.
    #[default]
    Invisible,
    /// Visible area at or below the minimum-visibility ratio.
    SemiMinimum,
    /// Partially visible.
    Semi,
    /// Nothing in front occludes it.
    All,
}

/// Producer buffer metadata of a self-drawing surface.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BufferInfo {
    /// Buffer width in pixels.
    pub width: u32,
    /// Buffer height in pixels.
    pub height: u32,
    /// The buffer transform swaps width and height at scanout.
    pub transform_swap: bool,
}

/// Mutable per-surface state owned by a surface node.
///
/// Regions and hardware bookkeeping are rebuilt every prepare pass; the
/// dirty manager, the surface's own special-layer classification, and the
/// cross/clone references persist across frames.
#[derive(Clone, Debug, Default)]
pub struct SurfaceState {
    /// Window name, used in diagnostics only.
    pub name: String,
    /// Window classification.
    pub window_type: SurfaceWindowType,
    /// The surface's dirty accumulator.
    pub dirty: DirtyRegionManager,
    /// Absolute rect on the current display, set by the geometry pass.
    pub abs_rect: RectI,
    /// Self rect minus everything opaque in front.
    pub visible_region: Region,
    /// Visible region further reduced by behind-window blur occlusion.
    pub visible_region_behind_window: Region,
    /// The part of the surface guaranteed fully opaque.
    pub opaque_region: Region,
    /// Self rect minus the opaque region.
    pub transparent_region: Region,
    /// The container chrome around the content is transparent.
    pub container_transparent: bool,
    /// Width of the container chrome border in pixels; subtracted from the
    /// opaque region when the chrome is transparent.
    pub container_inset: i32,
    /// Special-layer classification of this surface.
    pub special: SpecialLayerManager,
    /// Hardware-composition state.
    pub hwc: HwcRecorder,
    /// Producer buffer metadata; `None` until the first buffer arrives.
    pub buffer: Option<BufferInfo>,
    /// The producer declared HDR metadata on its buffer.
    pub hdr_present: bool,
    /// The surface holds window focus.
    pub is_focused: bool,
    /// A window animation is running on this surface.
    pub animating: bool,
    /// Debug override forcing the surface to count as visible.
    pub debug_force_visible: bool,
    /// A ui-first snapshot is pending; the subtree must be prepared even
    /// when occluded.
    pub snapshot_pending: bool,
    /// The surface reported no content change since last frame.
    pub content_static: bool,
    /// This surface has a behind-window blur sampling content below it.
    pub has_behind_window_blur: bool,
    /// Cursor and other top layers compose on a dedicated hardware plane
    /// and bypass the eligibility cascade.
    pub is_top_layer: bool,
    /// Canonical node when this surface is mirrored across displays.
    pub source_cross_node: Option<NodeId>,
    /// Whether the cross-display source was already walked this cycle.
    pub cross_visited: bool,
    /// Absolute matrix recorded on the first visit of a cross node.
    pub first_visit_abs_matrix: Option<Affine>,
    /// Surface whose prepared drawable this clone presents.
    pub clone_source: Option<NodeId>,
    /// Visibility classification reported to the window manager.
    pub visible_level: VisibleLevel,
    /// Stacking order assigned in the previous frame's global pass.
    pub last_frame_z_order: u32,
    /// Absolute rect observed by the previous frame's global pass.
    pub last_frame_abs_rect: RectI,
    /// Stencil reference value assigned during top-surface collection.
    pub stencil_value: i32,
}

impl SurfaceState {
    /// Resets the per-frame rebuilt state; persistent state (dirty history,
    /// own special-layer classification, cross/clone references, last-frame
    /// records) is kept.
    pub fn begin_frame(&mut self) {
        self.visible_region = Region::new();
        self.visible_region_behind_window = Region::new();
        self.opaque_region = Region::new();
        self.transparent_region = Region::new();
        self.special.clear_aggregates();
        self.hwc.begin_frame();
        self.visible_level = VisibleLevel::Invisible;
        self.stencil_value = 0;
    }

    /// Returns true when the whole surface is occluded.
    #[must_use]
    pub fn is_fully_occluded(&self) -> bool {
        self.visible_region.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::special::SpecialLayerFlags;

    #[test]
    fn window_type_classification() {
        assert!(SurfaceWindowType::Main.is_leash_or_main());
        assert!(SurfaceWindowType::Leash.is_leash_or_main());
        assert!(!SurfaceWindowType::SelfDrawing.is_leash_or_main());
        assert!(SurfaceWindowType::SelfDrawing.is_hardware_candidate());
        assert!(!SurfaceWindowType::Default.is_hardware_candidate());
    }

    #[test]
    fn begin_frame_keeps_persistent_state() {
        let mut s = SurfaceState {
            is_focused: true,
            last_frame_z_order: 9,
            ..Default::default()
        };
        s.visible_region = Region::from_rect(RectI::new(0, 0, 10, 10));
        s.begin_frame();
        assert!(s.visible_region.is_empty());
        assert!(s.is_focused);
        assert_eq!(s.last_frame_z_order, 9);
    }

    #[test]
    fn begin_frame_keeps_own_special_classification() {
        let mut s = SurfaceState::default();
        s.special.set(SpecialLayerFlags::PROTECTED, true);
        let mut child = SpecialLayerManager::new();
        child.set(SpecialLayerFlags::SKIP, true);
        s.special.merge_from(&child);

        s.begin_frame();
        assert!(s.special.has(SpecialLayerFlags::PROTECTED));
        assert!(!s.special.has(SpecialLayerFlags::HAS_SKIP));
    }
}
