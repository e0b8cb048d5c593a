// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-display and clone surface handling.
//!
//! A surface mirrored onto several logical displays is walked in full only
//! on its first visit per global cycle. Later visits re-project its
//! last-known dirty rect into the visiting display's coordinates instead of
//! re-running the subtree, keeping the cost independent of display count.

use kurbo::{Affine, Rect};
use tracing::warn;

use canopy_dirty::{DirtyCause, DirtyRegionManager};
use canopy_region::RectI;
use canopy_scene::{NodeId, NodeKind, SceneGraph};

use crate::frame_state::PipelineFrameState;
use crate::geometry::{invert_affine, round_out};

/// Clears the visited flags recorded during the last global cycle.
///
/// Called once per global frame cycle, before the first screen is prepared.
pub fn reset_cross_nodes_visited(graph: &mut SceneGraph, frame: &mut PipelineFrameState) {
    for id in frame.visited_cross_nodes.drain(..) {
        if let Some(surface) = graph.get_mut(id).and_then(|n| n.surface.as_mut()) {
            surface.cross_visited = false;
            surface.first_visit_abs_matrix = None;
        }
    }
}

/// Decides whether a cross-display surface's subtree can be skipped.
///
/// The first visit this cycle marks the surface visited and returns false
/// (walk it normally); every later visit returns true. Surfaces that are
/// not part of a cross-display scene always return false.
pub fn check_skip_cross_node(
    graph: &mut SceneGraph,
    id: NodeId,
    frame: &mut PipelineFrameState,
) -> bool {
    let Some(surface) = graph.get_mut(id).and_then(|n| n.surface.as_mut()) else {
        return false;
    };
    if surface.source_cross_node.is_none() {
        return false;
    }
    if surface.cross_visited {
        return true;
    }
    surface.cross_visited = true;
    frame.visited_cross_nodes.push(id);
    false
}

/// The matrix taking first-visit display coordinates into the current
/// display's coordinates; `None` when the first-visit matrix cannot be
/// inverted.
#[must_use]
pub fn conversion_matrix(first_visit: &Affine, current: &Affine) -> Option<Affine> {
    invert_affine(first_visit).map(|inv| *current * inv)
}

/// Re-derives dirty state for a cross surface on a repeat visit.
///
/// Projects the surface's last dirty rect through the conversion matrix and
/// merges it into the visiting display's dirty manager. A failed inversion
/// falls back to invalidating the whole screen, a safe over-approximation.
pub fn prepare_for_skipped_cross_node(
    dirty_manager: &mut DirtyRegionManager,
    screen_rect: RectI,
    first_visit_matrix: &Affine,
    current_matrix: &Affine,
    last_dirty_rect: RectI,
) {
    let Some(conversion) = conversion_matrix(first_visit_matrix, current_matrix) else {
        warn!("cross-node conversion matrix not invertible, invalidating full screen");
        dirty_manager.merge_dirty_rect_with_cause(&screen_rect, DirtyCause::CrossProjection);
        return;
    };
    if last_dirty_rect.is_empty() {
        return;
    }
    let float_rect = Rect::new(
        f64::from(last_dirty_rect.left),
        f64::from(last_dirty_rect.top),
        f64::from(last_dirty_rect.right),
        f64::from(last_dirty_rect.bottom),
    );
    let projected = round_out(conversion.transform_rect_bbox(float_rect)).intersect(&screen_rect);
    dirty_manager.merge_dirty_rect_with_cause(&projected, DirtyCause::CrossProjection);
}

/// Resolves a clone surface to its source.
///
/// Clones present the source's already-prepared drawable; nothing in the
/// clone's subtree is walked. Returns the `(clone, source)` pair for the
/// sync stage's clone map, or `None` when the declared source is gone, in
/// which case the clone is simply not composed this frame.
#[must_use]
pub fn prepare_for_clone_node(graph: &SceneGraph, id: NodeId) -> Option<(NodeId, NodeId)> {
    let surface = graph.get(id)?.surface.as_ref()?;
    let source = surface.clone_source?;
    let source_alive = graph
        .get(source)
        .is_some_and(|n| n.kind == NodeKind::Surface);
    if !source_alive {
        warn!(clone = id.to_bits(), "clone source missing, clone not composed");
        return None;
    }
    Some((id, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_scene::NodeKind;

    fn manager(size: i32) -> DirtyRegionManager {
        let mut m = DirtyRegionManager::new();
        m.set_surface_rect(RectI::new(0, 0, size, size));
        m
    }

    #[test]
    fn projection_roundtrip_recovers_rect() {
        let first = Affine::translate((100.0, 50.0)) * Affine::scale(2.0);
        let current = Affine::translate((-20.0, 30.0));
        let forward = conversion_matrix(&first, &current).unwrap();
        let backward = conversion_matrix(&current, &first).unwrap();

        let rect = Rect::new(10.0, 10.0, 90.0, 70.0);
        let there = forward.transform_rect_bbox(rect);
        let back = backward.transform_rect_bbox(there);
        assert!((back.x0 - rect.x0).abs() < 1e-9);
        assert!((back.y0 - rect.y0).abs() < 1e-9);
        assert!((back.x1 - rect.x1).abs() < 1e-9);
        assert!((back.y1 - rect.y1).abs() < 1e-9);
    }

    #[test]
    fn skipped_cross_node_projects_dirty() {
        let mut dm = manager(1000);
        // First visit at identity, current display shifted right by 300.
        prepare_for_skipped_cross_node(
            &mut dm,
            RectI::new(0, 0, 1000, 1000),
            &Affine::IDENTITY,
            &Affine::translate((300.0, 0.0)),
            RectI::new(10, 10, 50, 50),
        );
        assert_eq!(dm.current_frame_dirty(), RectI::new(310, 10, 350, 50));
    }

    #[test]
    fn failed_inversion_invalidates_full_screen() {
        let mut dm = manager(800);
        prepare_for_skipped_cross_node(
            &mut dm,
            RectI::new(0, 0, 800, 800),
            &Affine::scale(0.0),
            &Affine::IDENTITY,
            RectI::new(10, 10, 50, 50),
        );
        assert_eq!(dm.current_frame_dirty(), RectI::new(0, 0, 800, 800));
    }

    #[test]
    fn cross_skip_triggers_on_second_visit() {
        let mut graph = SceneGraph::new();
        let mut frame = PipelineFrameState::new();
        let screen = graph.insert(NodeKind::Screen, None);
        let canonical = graph.insert(NodeKind::Surface, Some(screen));
        let mirrored = graph.insert(NodeKind::Surface, Some(screen));
        graph
            .get_mut(mirrored)
            .unwrap()
            .surface
            .as_mut()
            .unwrap()
            .source_cross_node = Some(canonical);

        assert!(!check_skip_cross_node(&mut graph, canonical, &mut frame));
        assert!(!check_skip_cross_node(&mut graph, mirrored, &mut frame));
        assert!(check_skip_cross_node(&mut graph, mirrored, &mut frame));

        reset_cross_nodes_visited(&mut graph, &mut frame);
        assert!(!check_skip_cross_node(&mut graph, mirrored, &mut frame));
    }

    #[test]
    fn clone_resolution() {
        let mut graph = SceneGraph::new();
        let screen = graph.insert(NodeKind::Screen, None);
        let source = graph.insert(NodeKind::Surface, Some(screen));
        let clone = graph.insert(NodeKind::Surface, Some(screen));
        graph
            .get_mut(clone)
            .unwrap()
            .surface
            .as_mut()
            .unwrap()
            .clone_source = Some(source);

        assert_eq!(prepare_for_clone_node(&graph, clone), Some((clone, source)));

        graph.remove(source);
        assert_eq!(prepare_for_clone_node(&graph, clone), None);
    }
}
