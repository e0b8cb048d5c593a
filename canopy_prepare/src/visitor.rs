// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The quick-prepare tree walk.

use hashbrown::HashMap;
use kurbo::Affine;
use tracing::{debug, error, warn};

use canopy_dirty::{DirtyCause, DirtyRegionManager};
use canopy_region::{RectI, Region};
use canopy_scene::{
    HwcDisabledReasonCollection, NodeId, NodeKind, SceneGraph, SpecialLayerFlags,
    SpecialLayerManager, SurfaceState, VisibleLevel,
};

use crate::config::PrepareConfig;
use crate::context::TraversalContext;
use crate::cross::{check_skip_cross_node, prepare_for_clone_node, prepare_for_skipped_cross_node};
use crate::filter::{collect_filter_info_and_update_dirty, FilterCacheAction, FilterTracker};
use crate::frame_state::PipelineFrameState;
use crate::geometry::{
    merge_removed_child_dirty, replay_deferred_subtree_dirty, round_out,
    update_draw_rect_and_dirty_region,
};
use crate::global_dirty::update_surface_dirty_and_global_dirty;
use crate::hwc::{HwcCandidate, HwcEngine, HwcPolicy, Prevalidate};
use crate::occlusion::{
    classify_visible_level, collect_top_occlusion_surface, compute_opaque_region,
    is_subtree_occluded, participates_in_occlusion, update_visible_region,
};

/// One finalized hardware layer, consumed by the composition stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerInfo {
    /// Packed id of the surface.
    pub surface: u64,
    /// Whether the surface kept the overlay path.
    pub enabled: bool,
    /// Buffer-space source rect.
    pub src_rect: RectI,
    /// Display-space destination rect.
    pub dst_rect: RectI,
    /// Final stacking order.
    pub z_order: u32,
}

/// Everything a prepare pass hands to the next pipeline stage.
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
    /// Hardware layer decisions for every overlay candidate.
    pub layers: Vec<LayerInfo>,
    /// Why candidates were denied the overlay path; diagnostics only.
    pub hwc_disabled_reasons: HwcDisabledReasonCollection,
    /// Surfaces whose visibility level changed since last frame.
    pub visible_changes: Vec<(u64, VisibleLevel)>,
    /// Everything that must repaint on the screen.
    pub global_dirty: Region,
    /// The screen-level dirty rect after history resolution.
    pub display_dirty_rect: RectI,
    /// Opaque coverage excluding capture-skip layers, for capture paths.
    pub opaque_without_skip: Region,
    /// Clone pairs `(clone, source)` for the sync stage.
    pub clones: Vec<(NodeId, NodeId)>,
    /// Per-filter-node cache decision.
    pub filter_cache_actions: HashMap<u64, FilterCacheAction>,
}

/// The per-frame tree visitor.
///
/// Walks one screen's subtree per [`quick_prepare_screen`] call: pre-order
/// for geometry (children need their parent's matrix), with siblings of
/// screens and leash windows iterated front to back so occlusion
/// accumulates correctly, then the global dirty pass and the hardware
/// eligibility cascade over what the walk collected.
///
/// [`quick_prepare_screen`]: Self::quick_prepare_screen
pub struct PrepareVisitor<'a> {
    config: &'a PrepareConfig,
    frame: &'a mut PipelineFrameState,
    graph: &'a mut SceneGraph,
    prevalidate: &'a dyn Prevalidate,
    policy: &'a dyn HwcPolicy,

    screen_rect: RectI,
    screen_id: u64,
    screen_is_virtual: bool,
    display_matrix: Affine,
    cur_display: Option<NodeId>,
    cur_surface: Option<NodeId>,
    cur_surface_dirty: Option<DirtyRegionManager>,
    cur_surface_transparent: bool,
    cur_transparent_filter: Region,
    cur_app: Option<u64>,
    screen_dirty: Option<DirtyRegionManager>,

    accumulated_occlusion: Region,
    occlusion_behind_window: Region,
    occlusion_without_skip: Region,
    display_special: SpecialLayerManager,
    rotating_this_frame: bool,

    cur_z_for_filter: u32,
    filter_tracker: FilterTracker,
    hwc: HwcEngine,
    reasons: HwcDisabledReasonCollection,
    app_dst: HashMap<u64, RectI>,
    candidates: Vec<(NodeId, HwcCandidate)>,
    surfaces_paint_order: Vec<NodeId>,
    visible_vec: Vec<(u64, VisibleLevel)>,
    clones: Vec<(NodeId, NodeId)>,
}

impl<'a> PrepareVisitor<'a> {
    /// Creates a visitor for one frame over the given graph.
    pub fn new(
        config: &'a PrepareConfig,
        frame: &'a mut PipelineFrameState,
        graph: &'a mut SceneGraph,
        prevalidate: &'a dyn Prevalidate,
        policy: &'a dyn HwcPolicy,
    ) -> Self {
        Self {
            config,
            frame,
            graph,
            prevalidate,
            policy,
            screen_rect: RectI::ZERO,
            screen_id: 0,
            screen_is_virtual: false,
            display_matrix: Affine::IDENTITY,
            cur_display: None,
            cur_surface: None,
            cur_surface_dirty: None,
            cur_surface_transparent: false,
            cur_transparent_filter: Region::new(),
            cur_app: None,
            screen_dirty: None,
            accumulated_occlusion: Region::new(),
            occlusion_behind_window: Region::new(),
            occlusion_without_skip: Region::new(),
            display_special: SpecialLayerManager::new(),
            rotating_this_frame: false,
            cur_z_for_filter: 0,
            filter_tracker: FilterTracker::new(),
            hwc: HwcEngine::new(),
            reasons: HwcDisabledReasonCollection::new(),
            app_dst: HashMap::new(),
            candidates: Vec::new(),
            surfaces_paint_order: Vec::new(),
            visible_vec: Vec::new(),
            clones: Vec::new(),
        }
    }

    /// Prepares one screen's subtree and returns the frame's outputs.
    ///
    /// Returns `None` when `screen` is not a live screen node with screen
    /// state; the subtree is then left as-is and prepared fully next frame.
    pub fn quick_prepare_screen(&mut self, screen: NodeId) -> Option<FrameOutput> {
        let Some(node) = self.graph.get_mut(screen) else {
            error!(node = screen.to_bits(), "prepare called on a dead node");
            return None;
        };
        if node.kind != NodeKind::Screen {
            error!(node = screen.to_bits(), "prepare called on a non-screen node");
            return None;
        }
        let Some(mut state) = node.screen.take() else {
            error!(node = screen.to_bits(), "screen node without screen state");
            return None;
        };
        node.subtree_dirty = false;

        self.init_screen_info(&mut state);
        let mut dm = std::mem::take(&mut state.dirty);
        dm.clear();
        dm.set_surface_rect(self.screen_rect);
        dm.set_cause_tracking(self.config.dirty_cause_tracking);
        if !self.config.partial_render_enabled {
            dm.reset_dirty_as_surface_size();
        }
        let screen_edges = self.frame.power_edge(self.screen_id, state.info.power_on)
            | self.frame.curtain_edge(self.screen_id, state.info.curtain_on)
            | self.frame.luminance_edge(self.screen_id, state.info.luminance)
            | self.frame.accessibility_edge(self.config.accessibility_generation);
        if screen_edges {
            debug!(screen = self.screen_id, "screen state edge, full invalidation");
            dm.reset_dirty_as_surface_size();
            self.filter_tracker.purge_all = true;
        }
        self.screen_dirty = Some(dm);

        if let Some(node) = self.graph.get_mut(screen) {
            node.screen = Some(state);
            if let Some(dm) = self.screen_dirty.as_mut() {
                merge_removed_child_dirty(node, dm);
            }
        }

        self.quick_prepare_children(screen, TraversalContext::root(), true);

        // Children were visited front to back; the global pass wants paint
        // order (back to front).
        self.surfaces_paint_order.reverse();

        self.assign_layer_z_orders(screen);
        self.run_hwc_pass();

        let Some(mut dm) = self.screen_dirty.take() else {
            error!(screen = self.screen_id, "screen dirty manager lost during walk");
            return None;
        };
        let surfaces = std::mem::take(&mut self.surfaces_paint_order);
        let global = update_surface_dirty_and_global_dirty(
            self.graph,
            &surfaces,
            &mut dm,
            &mut self.filter_tracker,
            self.config,
        );

        let visible_vec = std::mem::take(&mut self.visible_vec);
        let visible_changes = self.frame.visible_diff(&visible_vec);
        self.frame.last_frame_rotating = self.rotating_this_frame;

        let layers = self.collect_layers();

        if let Some(state) = self.graph.get_mut(screen).and_then(|n| n.screen.as_mut()) {
            state.dirty = dm;
            state.rotation_animating = self.rotating_this_frame;
        }

        Some(FrameOutput {
            layers,
            hwc_disabled_reasons: std::mem::take(&mut self.reasons),
            visible_changes,
            global_dirty: global.region,
            display_dirty_rect: global.display_rect,
            opaque_without_skip: std::mem::take(&mut self.occlusion_without_skip),
            clones: std::mem::take(&mut self.clones),
            filter_cache_actions: std::mem::take(&mut self.filter_tracker.cache_actions),
        })
    }

    fn init_screen_info(&mut self, state: &mut canopy_scene::ScreenState) {
        self.screen_rect = state.info.rotated_rect();
        self.screen_id = state.info.id;
        self.screen_is_virtual = state.info.is_virtual;
        self.display_matrix = Affine::IDENTITY;
        self.cur_display = None;
        self.cur_surface = None;
        self.cur_surface_dirty = None;
        self.cur_surface_transparent = false;
        self.cur_transparent_filter = Region::new();
        self.cur_app = None;
        self.accumulated_occlusion = Region::new();
        self.occlusion_behind_window = Region::new();
        self.occlusion_without_skip = Region::new();
        self.display_special = SpecialLayerManager::new();
        self.rotating_this_frame = false;
        self.cur_z_for_filter = 0;
        self.filter_tracker.begin_display();
        self.hwc.begin_display();
        self.reasons.clear();
        self.app_dst.clear();
        self.candidates.clear();
        self.surfaces_paint_order.clear();
        self.visible_vec.clear();
        self.clones.clear();
    }

    /// Visits `id`'s children; `reverse` walks them front to back, used for
    /// screens and leash windows so occlusion accumulates ahead of the
    /// surfaces it covers.
    fn quick_prepare_children(&mut self, id: NodeId, ctx: TraversalContext, reverse: bool) {
        let children: Vec<NodeId> = self.graph.children(id).to_vec();
        if reverse {
            for &child in children.iter().rev() {
                self.prepare_node(child, ctx);
            }
        } else {
            for &child in &children {
                self.prepare_node(child, ctx);
            }
        }
    }

    fn prepare_node(&mut self, id: NodeId, ctx: TraversalContext) {
        let Some(kind) = self.graph.get(id).map(|n| n.kind) else {
            return;
        };
        match kind {
            NodeKind::Screen => {
                // Screens never nest; a screen below another is a scene bug.
                warn!(node = id.to_bits(), "nested screen node skipped");
            }
            NodeKind::LogicalDisplay => self.quick_prepare_logical_display(id, ctx),
            NodeKind::Surface => self.quick_prepare_surface(id, ctx),
            NodeKind::Canvas | NodeKind::Root | NodeKind::Union => {
                self.quick_prepare_canvas(id, ctx, false);
            }
            NodeKind::Effect => self.quick_prepare_effect(id, ctx),
            NodeKind::WindowKeyframe => {
                // A keyframe freeze behaves like a canvas whose subtree is
                // mid-animation.
                let mut ctx = ctx;
                ctx.ancestor_animating = true;
                self.quick_prepare_canvas(id, ctx, false);
            }
        }
    }

    fn quick_prepare_logical_display(&mut self, id: NodeId, ctx: TraversalContext) {
        let Some(node) = self.graph.get_mut(id) else {
            return;
        };
        let Some(mut dstate) = node.display.take() else {
            error!(node = id.to_bits(), "display node without display state");
            return;
        };
        node.subtree_dirty = false;
        let rotation_changed = dstate.rotation_changed;
        dstate.begin_frame();
        if let Some(dm) = self.screen_dirty.as_mut() {
            merge_removed_child_dirty(node, dm);
            replay_deferred_subtree_dirty(node, dm);
        }

        let mut full_invalidate = false;
        if rotation_changed {
            self.rotating_this_frame = true;
            self.filter_tracker.purge_all = true;
            full_invalidate = true;
        }
        if dstate.zoomed != dstate.was_zoomed {
            full_invalidate = true;
        }
        dstate.was_zoomed = dstate.zoomed;

        let display_matrix = ctx.parent_matrix
            * Affine::translate((f64::from(dstate.offset_x), f64::from(dstate.offset_y)));

        let prev_display = self.cur_display.replace(id);
        let prev_matrix = self.display_matrix;
        self.display_matrix = display_matrix;
        let prev_special = std::mem::take(&mut self.display_special);

        if let Some(node) = self.graph.get_mut(id) {
            node.display = Some(dstate);
        }
        if full_invalidate && let Some(dm) = self.screen_dirty.as_mut() {
            dm.reset_dirty_as_surface_size();
        }

        let mut child_ctx = ctx;
        child_ctx.parent_matrix = display_matrix;
        self.quick_prepare_children(id, child_ctx, true);

        let special = std::mem::replace(&mut self.display_special, prev_special);
        if let Some(dstate) = self.graph.get_mut(id).and_then(|n| n.display.as_mut()) {
            dstate.special_layers = special;
        }
        self.cur_display = prev_display;
        self.display_matrix = prev_matrix;
    }

    fn quick_prepare_surface(&mut self, id: NodeId, ctx: TraversalContext) {
        let packed = id.to_bits();

        // Clones present their source's drawable; nothing below is walked.
        if self
            .graph
            .get(id)
            .and_then(|n| n.surface.as_ref())
            .is_some_and(|s| s.clone_source.is_some())
        {
            if let Some(pair) = prepare_for_clone_node(self.graph, id) {
                self.clones.push(pair);
            }
            return;
        }

        // Cross-display repeat visits re-project instead of re-walking.
        if check_skip_cross_node(self.graph, id, self.frame) {
            self.prepare_skipped_cross(id);
            return;
        }

        if self.screen_is_virtual
            && (self.frame.is_black_listed(self.screen_id, packed)
                || self.frame.is_excluded_by_white_list(self.screen_id, packed))
        {
            debug!(surface = packed, screen = self.screen_id, "surface filtered on virtual screen");
            return;
        }

        let Some(node) = self.graph.get_mut(id) else {
            return;
        };
        let Some(mut sstate) = node.surface.take() else {
            error!(node = packed, "surface node without surface state, subtree skipped");
            return;
        };
        let subtree_dirty = std::mem::take(&mut node.subtree_dirty);
        sstate.begin_frame();
        sstate.dirty.set_cause_tracking(self.config.dirty_cause_tracking);

        let mut dm = std::mem::take(&mut sstate.dirty);
        dm.clear();
        let geo = update_draw_rect_and_dirty_region(node, &mut dm, &ctx);
        merge_removed_child_dirty(node, &mut dm);
        replay_deferred_subtree_dirty(node, &mut dm);
        let props = node.properties.clone();

        sstate.abs_rect = geo.abs_rect;
        if sstate.source_cross_node.is_some() && sstate.first_visit_abs_matrix.is_none() {
            sstate.first_visit_abs_matrix = Some(geo.abs_matrix);
        }

        self.cur_z_for_filter += 1;
        sstate.hwc.z_order_for_filter = self.cur_z_for_filter;

        let accumulated_alpha = ctx.alpha * props.alpha;
        let is_main = sstate.window_type.is_main();
        let is_leash = sstate.window_type.is_leash();

        if sstate.window_type.is_leash_or_main() {
            self.surfaces_paint_order.push(id);
        }

        // Special-layer bits roll up into the display aggregate.
        self.display_special.merge_from(&sstate.special);

        // Occlusion, front-to-back: everything already accumulated sits in
        // front of this surface.
        let mut skip_subtree = false;
        if is_main && self.config.occlusion_enabled {
            sstate.opaque_region =
                compute_opaque_region(&sstate, accumulated_alpha, props.corner_radius);
            update_visible_region(
                &mut sstate,
                &self.accumulated_occlusion,
                &self.occlusion_behind_window,
                self.config.behind_window_occlusion_enabled,
            );
            sstate.visible_level = classify_visible_level(&sstate, self.config.min_visible_ratio);
            self.visible_vec.push((packed, sstate.visible_level));

            if is_subtree_occluded(&sstate) {
                debug!(surface = sstate.name.as_str(), "subtree fully occluded, skipped");
                crate::geometry::defer_subtree_dirty(node, dm.current_frame_dirty());
                dm.clear();
                skip_subtree = true;
            }
        }

        // Quick skip: static content with no dirt anywhere in the subtree.
        if !skip_subtree
            && self.config.quick_skip_enabled
            && sstate.content_static
            && !subtree_dirty
            && !geo.dirty
        {
            debug!(surface = sstate.name.as_str(), "static surface quick-skipped");
            skip_subtree = true;
        }

        if is_main {
            self.app_dst.insert(packed, geo.abs_rect);
        }

        if sstate.window_type.is_hardware_candidate() && self.config.hwc_enabled {
            self.candidates.push((
                id,
                HwcCandidate {
                    surface: packed,
                    abs_matrix: geo.abs_matrix,
                    abs_rect: geo.abs_rect,
                    local_bounds: props.bounds,
                    accumulated_alpha,
                    corner_radius: ctx.corner_radius,
                    corner_rect: ctx.corner_rect,
                    z_order_for_filter: sstate.hwc.z_order_for_filter,
                    app_surface: self.cur_app,
                    clip_rect: ctx.clip_rect,
                    background_transparent: props.is_background_transparent(),
                    background_solid: props.background_solid,
                },
            ));
        }

        let surface_transparent = accumulated_alpha < 1.0 - 1e-4
            || props.is_background_transparent()
            || sstate.container_transparent;

        if sstate.hdr_present {
            self.hwc.screen_has_hdr = true;
            if let Some(display) = self.cur_display
                && let Some(dstate) = self.graph.get_mut(display).and_then(|n| n.display.as_mut())
            {
                dstate.has_hdr_content = true;
            }
        }

        if skip_subtree {
            self.finish_surface(id, sstate, dm, ctx.ancestor_animating);
            return;
        }

        // Lend this surface's dirty manager to the subtree.
        if let Some(node) = self.graph.get_mut(id) {
            node.surface = Some(sstate);
        }
        let prev_dm = self.cur_surface_dirty.replace(dm);
        let prev_surface = self.cur_surface.replace(id);
        let prev_transparent = self.cur_surface_transparent;
        self.cur_surface_transparent = surface_transparent;
        let prev_filter_region = std::mem::take(&mut self.cur_transparent_filter);
        let prev_app = self.cur_app;
        if is_main {
            self.cur_app = Some(packed);
        }

        let mut child_ctx = ctx;
        child_ctx.parent_matrix = geo.abs_matrix;
        child_ctx.alpha = accumulated_alpha;
        child_ctx.dirty = geo.dirty;
        if props.needs_clip() {
            let clip = round_out(geo.abs_matrix.transform_rect_bbox(props.clip_rect_local()));
            child_ctx = child_ctx.clipped_by(clip);
            if props.corner_radius > 0.0 {
                child_ctx.corner_radius = props.corner_radius;
                child_ctx.corner_rect = Some(clip);
            }
        }

        // Leash windows stack their children like a screen does.
        self.quick_prepare_children(id, child_ctx, is_leash);

        self.cur_app = prev_app;
        self.cur_surface = prev_surface;
        self.cur_surface_transparent = prev_transparent;
        let transparent_filter =
            std::mem::replace(&mut self.cur_transparent_filter, prev_filter_region);
        let dm = match self.cur_surface_dirty.take() {
            Some(dm) => dm,
            None => {
                error!(surface = packed, "surface dirty manager lost during subtree walk");
                DirtyRegionManager::new()
            }
        };
        self.cur_surface_dirty = prev_dm;

        let Some(sstate) = self.graph.get_mut(id).and_then(|n| n.surface.take()) else {
            error!(surface = packed, "surface state lost during subtree walk");
            return;
        };

        // Stencil collection runs over the top few surfaces, front first.
        if let Some(display) = self.cur_display
            && let Some(dstate) = self.graph.get_mut(display).and_then(|n| n.display.as_mut())
        {
            let mut sstate = sstate;
            collect_top_occlusion_surface(dstate, &mut sstate, &transparent_filter, self.config);
            self.finish_surface(id, sstate, dm, ctx.ancestor_animating);
            return;
        }
        self.finish_surface(id, sstate, dm, ctx.ancestor_animating);
    }

    /// Accumulates the surface's occlusion contribution and hands its state
    /// and dirty manager back to the node.
    fn finish_surface(
        &mut self,
        id: NodeId,
        mut sstate: SurfaceState,
        dm: DirtyRegionManager,
        ancestor_animating: bool,
    ) {
        if self.config.occlusion_enabled && participates_in_occlusion(&sstate, ancestor_animating) {
            self.accumulated_occlusion.or_self(&sstate.opaque_region);
            if !sstate.special.has(SpecialLayerFlags::SKIP) {
                self.occlusion_without_skip.or_self(&sstate.opaque_region);
            }
        }
        if sstate.has_behind_window_blur {
            self.occlusion_behind_window.or_rect(&sstate.abs_rect);
        }
        sstate.dirty = dm;
        if let Some(node) = self.graph.get_mut(id) {
            node.surface = Some(sstate);
        }
    }

    fn prepare_skipped_cross(&mut self, id: NodeId) {
        let Some(surface) = self.graph.get(id).and_then(|n| n.surface.as_ref()) else {
            return;
        };
        let Some(first_matrix) = surface.first_visit_abs_matrix else {
            warn!(surface = id.to_bits(), "cross node revisited before its first matrix was recorded");
            return;
        };
        let last_dirty = surface.dirty.current_frame_dirty();
        let screen_rect = self.screen_rect;
        let current_matrix = self.display_matrix;
        let Some(dm) = self.screen_dirty.as_mut() else {
            error!(surface = id.to_bits(), "no screen dirty manager for cross projection");
            return;
        };
        prepare_for_skipped_cross_node(dm, screen_rect, &first_matrix, &current_matrix, last_dirty);
    }

    fn quick_prepare_canvas(&mut self, id: NodeId, ctx: TraversalContext, force_filter: bool) {
        let Some(node) = self.graph.get_mut(id) else {
            return;
        };
        node.subtree_dirty = false;
        let Some(dm) = self
            .cur_surface_dirty
            .as_mut()
            .or(self.screen_dirty.as_mut())
        else {
            error!(node = id.to_bits(), "no active dirty manager, node left for next frame");
            return;
        };
        let geo = update_draw_rect_and_dirty_region(node, dm, &ctx);
        merge_removed_child_dirty(node, dm);
        replay_deferred_subtree_dirty(node, dm);
        let props = node.properties.clone();

        if props.has_filter() || force_filter {
            self.cur_z_for_filter += 1;
            let filter_rect =
                round_out(geo.abs_matrix.transform_rect_bbox(props.extended_bounds()));
            let filter_rect = match ctx.clip_rect {
                Some(clip) => filter_rect.intersect(&clip),
                None => filter_rect,
            };
            collect_filter_info_and_update_dirty(
                id.to_bits(),
                filter_rect,
                dm,
                &mut self.filter_tracker,
                self.cur_surface.map(NodeId::to_bits),
                self.cur_surface_transparent,
                self.cur_z_for_filter,
            );
            if self.cur_surface_transparent {
                self.cur_transparent_filter.or_rect(&filter_rect);
            }
        }

        let mut child_ctx = ctx;
        child_ctx.parent_matrix = geo.abs_matrix;
        child_ctx.alpha *= props.alpha;
        child_ctx.dirty = geo.dirty;
        if props.needs_clip() {
            let clip = round_out(geo.abs_matrix.transform_rect_bbox(props.clip_rect_local()));
            child_ctx = child_ctx.clipped_by(clip);
            if props.corner_radius > 0.0 {
                child_ctx.corner_radius = props.corner_radius;
                child_ctx.corner_rect = Some(clip);
            }
        }
        self.quick_prepare_children(id, child_ctx, false);
    }

    fn quick_prepare_effect(&mut self, id: NodeId, ctx: TraversalContext) {
        // An effect node always contributes a filter region, whether or not
        // a filter property is set on it.
        self.quick_prepare_canvas(id, ctx, true);
    }

    /// Assigns final stacking z to every overlay candidate, bottom-up in
    /// paint order, before the cascade and prevalidate read them.
    fn assign_layer_z_orders(&mut self, screen: NodeId) {
        if self.candidates.is_empty() {
            return;
        }
        let candidate_ids: Vec<NodeId> = self.candidates.iter().map(|(id, _)| *id).collect();
        let mut z = 0u32;
        for id in self.graph.surfaces_below(screen) {
            if candidate_ids.contains(&id)
                && let Some(surface) = self.graph.get_mut(id).and_then(|n| n.surface.as_mut())
            {
                surface.hwc.global_z_order = z;
                z += 1;
            }
        }
    }

    /// Runs the eligibility cascade over collected candidates, then the
    /// hardware prevalidate query.
    fn run_hwc_pass(&mut self) {
        let candidates = std::mem::take(&mut self.candidates);
        let mut by_id: HashMap<u64, NodeId> = HashMap::new();
        for (id, candidate) in &candidates {
            by_id.insert(candidate.surface, *id);
        }

        for (id, candidate) in &candidates {
            let app_dst = candidate.app_surface.and_then(|app| self.app_dst.get(&app)).copied();
            let Some(mut sstate) = self.graph.get_mut(*id).and_then(|n| n.surface.take()) else {
                continue;
            };
            self.hwc.run_cascade(
                candidate,
                &mut sstate,
                self.screen_rect,
                app_dst,
                &self.filter_tracker,
                self.policy,
                self.config,
                &mut self.reasons,
            );
            if let Some(node) = self.graph.get_mut(*id) {
                node.surface = Some(sstate);
            }
        }

        let graph: &mut SceneGraph = self.graph;
        self.hwc.run_prevalidate(
            self.prevalidate,
            self.config,
            |surface| {
                if let Some(&id) = by_id.get(&surface)
                    && let Some(state) = graph.get_mut(id).and_then(|n| n.surface.as_mut())
                {
                    state.hwc.disable();
                }
            },
            &mut self.reasons,
        );

        // A surface that changed composition path repaints: pixels it
        // covered as an overlay are stale on the GPU target and vice versa.
        if let Some(dm) = self.screen_dirty.as_mut() {
            for (id, _) in &candidates {
                let Some(surface) = self.graph.get(*id).and_then(|n| n.surface.as_ref()) else {
                    continue;
                };
                let enabled = !surface.hwc.is_forced_disabled();
                if enabled != surface.hwc.enabled_last_frame {
                    dm.merge_dirty_rect_with_cause(&surface.hwc.dst_rect, DirtyCause::HwcTransition);
                }
            }
        }

        self.candidates = candidates;
    }

    fn collect_layers(&mut self) -> Vec<LayerInfo> {
        let candidates = std::mem::take(&mut self.candidates);
        let mut layers = Vec::with_capacity(candidates.len());
        for (id, candidate) in candidates {
            let Some(surface) = self.graph.get(id).and_then(|n| n.surface.as_ref()) else {
                continue;
            };
            layers.push(LayerInfo {
                surface: candidate.surface,
                enabled: !surface.hwc.is_forced_disabled(),
                src_rect: surface.hwc.src_rect,
                dst_rect: surface.hwc.dst_rect,
                z_order: surface.hwc.global_z_order,
            });
        }
        layers
    }
}

impl core::fmt::Debug for PrepareVisitor<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PrepareVisitor")
            .field("screen_id", &self.screen_id)
            .field("screen_rect", &self.screen_rect)
            .field("cur_display", &self.cur_display)
            .field("cur_surface", &self.cur_surface)
            .finish_non_exhaustive()
    }
}
