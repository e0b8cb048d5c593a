// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Classification of why a rectangle was merged into a dirty region.

/// Why a rectangle was merged into a [`DirtyRegionManager`].
///
/// Causes exist for debug visualization only. They are recorded alongside
/// merges when cause tracking is enabled and never feed back into the dirty
/// computation.
///
/// [`DirtyRegionManager`]: crate::DirtyRegionManager
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DirtyCause {
    /// The node's absolute rect, matrix, or clip changed, or its content was
    /// marked dirty.
    Geometry,
    /// A child was removed and its last-frame rect must be repainted.
    RemovedChild,
    /// A filter's cached output became stale and its extent was invalidated.
    Filter,
    /// A shadow extent changed along with its caster.
    Shadow,
    /// A subtree skipped last frame is replaying its deferred dirty rect.
    SubtreeSkip,
    /// A transparent surface's dirty rect was promoted to the display.
    Transparent,
    /// A surface changed its stacking position among its siblings.
    ZOrderChange,
    /// A surface moved on screen.
    PositionChange,
    /// A surface present last frame disappeared this frame.
    SurfaceRemoved,
    /// A surface moved between the hardware overlay path and GPU
    /// composition; either direction needs a repaint.
    HwcTransition,
    /// A cross-display node's dirty rect was re-projected onto this display.
    CrossProjection,
    /// Screen zoom state changed, invalidating the whole screen.
    Zoom,
}

impl DirtyCause {
    /// Short label used by debug overlays and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::RemovedChild => "removed-child",
            Self::Filter => "filter",
            Self::Shadow => "shadow",
            Self::SubtreeSkip => "subtree-skip",
            Self::Transparent => "transparent",
            Self::ZOrderChange => "z-order",
            Self::PositionChange => "position",
            Self::SurfaceRemoved => "surface-removed",
            Self::HwcTransition => "hwc-transition",
            Self::CrossProjection => "cross-projection",
            Self::Zoom => "zoom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_distinct() {
        let causes = [
            DirtyCause::Geometry,
            DirtyCause::RemovedChild,
            DirtyCause::Filter,
            DirtyCause::Shadow,
            DirtyCause::SubtreeSkip,
            DirtyCause::Transparent,
            DirtyCause::ZOrderChange,
            DirtyCause::PositionChange,
            DirtyCause::SurfaceRemoved,
            DirtyCause::HwcTransition,
            DirtyCause::CrossProjection,
            DirtyCause::Zoom,
        ];
        for (i, a) in causes.iter().enumerate() {
            for b in &causes[i + 1..] {
                assert_ne!(a.label(), b.label(), "duplicate cause label");
            }
        }
    }
}
