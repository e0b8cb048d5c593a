// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Prepare: the per-frame quick-prepare pass.
//!
//! One [`PrepareVisitor`] run walks a screen's subtree in the scene graph
//! and produces everything the later pipeline stages consume, without
//! touching pixels:
//!
//! - incremental geometry and dirty-region computation per node, fed into
//!   per-surface and per-screen [`DirtyRegionManager`]s;
//! - front-to-back occlusion culling with per-surface visible regions,
//!   visibility levels for the window manager, and whole-subtree skips for
//!   fully occluded windows;
//! - hardware-composer eligibility for self-drawing surfaces, run as a
//!   monotonic disable cascade with recorded reasons;
//! - blur/filter cache validity and the dirty propagation blurs cause;
//! - cross-display projection and clone resolution for mirrored scenes;
//! - the global pass that finalizes per-surface dirty against display-wide
//!   totals and buffer-age history.
//!
//! The pass is a pure function of three explicit inputs: an immutable
//! [`PrepareConfig`], the mutable scene graph, and the cross-frame
//! [`PipelineFrameState`] owned by the embedder. Hardware integration
//! points plug in through the [`Prevalidate`] and [`HwcPolicy`] traits.
//!
//! ```
//! use canopy_prepare::{
//!     AcceptAll, DefaultHwcPolicy, PipelineFrameState, PrepareConfig, PrepareVisitor,
//! };
//! use canopy_scene::{NodeKind, SceneGraph, ScreenInfo};
//!
//! let mut graph = SceneGraph::new();
//! let screen = graph.insert(NodeKind::Screen, None);
//! if let Some(state) = graph.get_mut(screen).and_then(|n| n.screen.as_mut()) {
//!     state.info = ScreenInfo {
//!         id: 1,
//!         width: 1080,
//!         height: 2340,
//!         power_on: true,
//!         ..Default::default()
//!     };
//! }
//!
//! let config = PrepareConfig::default();
//! let mut frame = PipelineFrameState::new();
//! let mut visitor =
//!     PrepareVisitor::new(&config, &mut frame, &mut graph, &AcceptAll, &DefaultHwcPolicy);
//! let output = visitor.quick_prepare_screen(screen).expect("screen node is live");
//! assert!(output.layers.is_empty());
//! ```
//!
//! [`DirtyRegionManager`]: canopy_dirty::DirtyRegionManager

mod config;
mod context;
mod cross;
mod filter;
mod frame_state;
mod geometry;
mod global_dirty;
mod hwc;
mod occlusion;
mod visitor;

pub use config::PrepareConfig;
pub use context::TraversalContext;
pub use cross::{
    check_skip_cross_node, conversion_matrix, prepare_for_clone_node,
    prepare_for_skipped_cross_node, reset_cross_nodes_visited,
};
pub use filter::{
    check_merge_filter_dirty_with_pre_dirty, collect_filter_info_and_update_dirty,
    FilterCacheAction, FilterTracker, TransparentFilter,
};
pub use frame_state::PipelineFrameState;
pub use geometry::{
    defer_subtree_dirty, merge_removed_child_dirty, replay_deferred_subtree_dirty,
    update_draw_rect_and_dirty_region, GeometryUpdate,
};
pub use global_dirty::{update_surface_dirty_and_global_dirty, GlobalDirty};
pub use hwc::{
    compute_dst_rect, compute_src_rect, AcceptAll, DefaultHwcPolicy, HwcCandidate, HwcEngine,
    HwcPolicy, LayerRequest, Prevalidate,
};
pub use occlusion::{
    classify_visible_level, collect_top_occlusion_surface, compute_opaque_region,
    is_subtree_occluded, participates_in_occlusion, update_visible_region,
};
pub use visitor::{FrameOutput, LayerInfo, PrepareVisitor};
