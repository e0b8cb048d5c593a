// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Feature configuration for the prepare pass.

/// Immutable feature flags for one [`PrepareVisitor`].
///
/// Constructed once by the embedder and passed in by reference; the visitor
/// never reads configuration from anywhere else, so its behavior is a pure
/// function of config, frame state, and the scene graph.
///
/// [`PrepareVisitor`]: crate::PrepareVisitor
#[derive(Clone, Debug)]
pub struct PrepareConfig {
    /// Compute partial redraw regions; disabled means every frame repaints
    /// fully.
    pub partial_render_enabled: bool,
    /// Expand dirty rects outward to an alignment grid.
    pub dirty_align_enabled: bool,
    /// Alignment grid size when [`dirty_align_enabled`] is set.
    ///
    /// [`dirty_align_enabled`]: Self::dirty_align_enabled
    pub dirty_align_size: i32,
    /// Compute per-surface visible regions and skip occluded subtrees.
    pub occlusion_enabled: bool,
    /// Collect per-surface stencil values and largest opaque rects for
    /// GPU stencil occlusion rejection.
    pub stencil_occlusion_enabled: bool,
    /// How many top leash/main surfaces participate in stencil collection.
    pub stencil_top_surface_count: usize,
    /// Subtract behind-window blur occlusion from visible regions.
    pub behind_window_occlusion_enabled: bool,
    /// Allow the hardware overlay path at all.
    pub hwc_enabled: bool,
    /// Query the hardware prevalidate interface before confirming layers.
    pub prevalidate_enabled: bool,
    /// Maximum solid-color layers the composer accepts.
    pub solid_layer_limit: usize,
    /// Skip prepare for surfaces that report static content or full
    /// occlusion across frames.
    pub quick_skip_enabled: bool,
    /// Record per-merge dirty causes for debug overlays.
    pub dirty_cause_tracking: bool,
    /// Generation counter of the accessibility configuration (high
    /// contrast, color inversion). A change since the last observed frame
    /// purges every filter cache and repaints the screen fully.
    pub accessibility_generation: u64,
    /// Visible-area ratio at or below which a surface reports
    /// [`VisibleLevel::SemiMinimum`](canopy_scene::VisibleLevel::SemiMinimum).
    pub min_visible_ratio: f64,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            partial_render_enabled: true,
            dirty_align_enabled: false,
            dirty_align_size: 32,
            occlusion_enabled: true,
            stencil_occlusion_enabled: false,
            stencil_top_surface_count: 3,
            behind_window_occlusion_enabled: true,
            hwc_enabled: true,
            prevalidate_enabled: true,
            solid_layer_limit: 1,
            quick_skip_enabled: false,
            dirty_cause_tracking: false,
            accessibility_generation: 0,
            min_visible_ratio: 0.25,
        }
    }
}
