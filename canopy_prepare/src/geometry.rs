// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node geometry and dirty-rect computation.

use kurbo::{Affine, Rect};

use canopy_dirty::{DirtyCause, DirtyRegionManager};
use canopy_region::RectI;
use canopy_scene::Node;

use crate::context::TraversalContext;

/// Result of one node's geometry update.
#[derive(Copy, Clone, Debug)]
pub struct GeometryUpdate {
    /// Dirty flag to propagate to children: inherited dirty OR this node's
    /// own geometry or content changed.
    pub dirty: bool,
    /// The node's accumulated absolute transform.
    pub abs_matrix: Affine,
    /// The node's absolute draw rect after clipping.
    pub abs_rect: RectI,
}

/// Rounds a float rect outward to integer pixels.
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "display coordinates fit in i32"
)]
pub(crate) fn round_out(rect: Rect) -> RectI {
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return RectI::ZERO;
    }
    RectI::new(
        rect.x0.floor() as i32,
        rect.y0.floor() as i32,
        rect.x1.ceil() as i32,
        rect.y1.ceil() as i32,
    )
}

/// Inverts an affine, refusing near-singular matrices.
#[must_use]
pub(crate) fn invert_affine(matrix: &Affine) -> Option<Affine> {
    let c = matrix.as_coeffs();
    let det = c[0] * c[3] - c[1] * c[2];
    if det.abs() < 1e-9 || !det.is_finite() {
        return None;
    }
    Some(matrix.inverse())
}

/// Returns true when the affine rotates by a multiple of 90 degrees only.
#[must_use]
pub(crate) fn is_rotation_multiple_of_90(matrix: &Affine) -> bool {
    const EPS: f64 = 1e-6;
    let c = matrix.as_coeffs();
    // Axis-aligned: either the diagonal or the anti-diagonal vanishes.
    (c[1].abs() < EPS && c[2].abs() < EPS) || (c[0].abs() < EPS && c[3].abs() < EPS)
}

/// Recomputes one node's absolute geometry and merges any delta into the
/// active dirty manager.
///
/// Follows the incremental contract: the absolute rect is the node's bounds
/// mapped through `parent matrix ∘ local transform`, clipped by the
/// inherited clip when the node clips. When geometry changed, the node is
/// content-dirty, or an ancestor was dirty, `old rect ∪ new rect` is merged;
/// otherwise nothing is. The node's cache is updated as next frame's diff
/// base either way, and the node's content-dirty mark is consumed.
pub fn update_draw_rect_and_dirty_region(
    node: &mut Node,
    dirty_manager: &mut DirtyRegionManager,
    ctx: &TraversalContext,
) -> GeometryUpdate {
    let abs_matrix = ctx.parent_matrix * node.properties.local_transform;
    let mut abs_rect = round_out(abs_matrix.transform_rect_bbox(node.properties.bounds));
    let clip_rect = if node.properties.needs_clip() {
        if let Some(clip) = ctx.clip_rect {
            abs_rect = abs_rect.intersect(&clip);
        }
        ctx.clip_rect.unwrap_or(RectI::ZERO)
    } else {
        node.cache.old_clip_rect
    };

    let geometry_changed = abs_rect != node.cache.old_abs_rect
        || abs_matrix != node.cache.old_abs_matrix
        || clip_rect != node.cache.old_clip_rect;
    let content_dirty = core::mem::take(&mut node.content_dirty);
    let dirty = ctx.dirty || geometry_changed || content_dirty;

    let merged = if dirty {
        let rect = node.cache.old_abs_rect.union(&abs_rect);
        dirty_manager.merge_dirty_rect_with_cause(&rect, DirtyCause::Geometry);
        rect
    } else {
        RectI::ZERO
    };

    node.cache.old_abs_rect = abs_rect;
    node.cache.old_abs_matrix = abs_matrix;
    node.cache.old_clip_rect = clip_rect;
    node.cache.old_dirty_rect = merged;

    GeometryUpdate {
        dirty,
        abs_matrix,
        abs_rect,
    }
}

/// Merges the rects of children removed since the last visit, then clears
/// the record.
pub fn merge_removed_child_dirty(node: &mut Node, dirty_manager: &mut DirtyRegionManager) {
    let rect = core::mem::take(&mut node.cache.removed_children_rect);
    dirty_manager.merge_dirty_rect_with_cause(&rect, DirtyCause::RemovedChild);
}

/// Replays the dirty rect deferred while this subtree was skipped.
pub fn replay_deferred_subtree_dirty(node: &mut Node, dirty_manager: &mut DirtyRegionManager) {
    if !node.cache.subtree_skipped_last_frame {
        return;
    }
    node.cache.subtree_skipped_last_frame = false;
    let rect = core::mem::take(&mut node.cache.deferred_dirty_rect);
    dirty_manager.merge_dirty_rect_with_cause(&rect, DirtyCause::SubtreeSkip);
}

/// Records that this subtree is being skipped this frame: its current dirty
/// contribution is deferred until the subtree is next prepared.
pub fn defer_subtree_dirty(node: &mut Node, pending: RectI) {
    node.cache.subtree_skipped_last_frame = true;
    node.cache.deferred_dirty_rect = node.cache.deferred_dirty_rect.union(&pending);
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_scene::NodeKind;
    use kurbo::Affine;

    fn canvas_at(x: f64, y: f64, w: f64, h: f64) -> Node {
        let mut node = Node::new(NodeKind::Canvas);
        node.properties.bounds = Rect::new(0.0, 0.0, w, h);
        node.properties.local_transform = Affine::translate((x, y));
        node.properties.clip_to_bounds = true;
        node
    }

    fn manager() -> DirtyRegionManager {
        let mut m = DirtyRegionManager::new();
        m.set_surface_rect(RectI::new(0, 0, 1000, 1000));
        m
    }

    #[test]
    fn move_merges_union_of_old_and_new() {
        let mut node = canvas_at(0.0, 0.0, 100.0, 100.0);
        let mut dm = manager();
        let ctx = TraversalContext::root();

        let first = update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        assert_eq!(first.abs_rect, RectI::new(0, 0, 100, 100));
        dm.clear();

        node.properties.local_transform = Affine::translate((10.0, 10.0));
        let second = update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        assert!(second.dirty);
        assert_eq!(second.abs_rect, RectI::new(10, 10, 110, 110));
        assert_eq!(dm.current_frame_dirty(), RectI::new(0, 0, 110, 110));
    }

    #[test]
    fn unchanged_node_contributes_nothing() {
        let mut node = canvas_at(5.0, 5.0, 50.0, 50.0);
        let mut dm = manager();
        let ctx = TraversalContext::root();

        update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        dm.clear();
        let second = update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        assert!(!second.dirty);
        assert!(!dm.is_current_frame_dirty());
    }

    #[test]
    fn inherited_dirty_forces_merge() {
        let mut node = canvas_at(5.0, 5.0, 50.0, 50.0);
        let mut dm = manager();
        let ctx = TraversalContext::root();

        update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        dm.clear();

        let dirty_ctx = TraversalContext {
            dirty: true,
            ..ctx
        };
        let result = update_draw_rect_and_dirty_region(&mut node, &mut dm, &dirty_ctx);
        assert!(result.dirty);
        assert_eq!(dm.current_frame_dirty(), RectI::new(5, 5, 55, 55));
    }

    #[test]
    fn content_dirty_is_consumed() {
        let mut node = canvas_at(0.0, 0.0, 10.0, 10.0);
        let mut dm = manager();
        let ctx = TraversalContext::root();
        update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        dm.clear();

        node.content_dirty = true;
        let result = update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        assert!(result.dirty);
        assert!(!node.content_dirty);
        dm.clear();

        let again = update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        assert!(!again.dirty);
    }

    #[test]
    fn clip_intersects_abs_rect() {
        let mut node = canvas_at(0.0, 0.0, 100.0, 100.0);
        let mut dm = manager();
        let ctx = TraversalContext::root().clipped_by(RectI::new(0, 0, 60, 60));
        let result = update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        assert_eq!(result.abs_rect, RectI::new(0, 0, 60, 60));
    }

    #[test]
    fn degenerate_rect_merges_nothing() {
        let mut node = canvas_at(0.0, 0.0, 0.0, 0.0);
        node.content_dirty = true;
        let mut dm = manager();
        let ctx = TraversalContext::root();
        let result = update_draw_rect_and_dirty_region(&mut node, &mut dm, &ctx);
        assert!(result.dirty);
        assert!(!dm.is_current_frame_dirty());
    }

    #[test]
    fn removed_child_rect_is_merged_once() {
        let mut node = canvas_at(0.0, 0.0, 10.0, 10.0);
        node.cache.removed_children_rect = RectI::new(100, 100, 200, 200);
        let mut dm = manager();
        merge_removed_child_dirty(&mut node, &mut dm);
        assert_eq!(dm.current_frame_dirty(), RectI::new(100, 100, 200, 200));
        dm.clear();
        merge_removed_child_dirty(&mut node, &mut dm);
        assert!(!dm.is_current_frame_dirty());
    }

    #[test]
    fn deferred_dirty_replays_after_skip() {
        let mut node = canvas_at(0.0, 0.0, 10.0, 10.0);
        defer_subtree_dirty(&mut node, RectI::new(0, 0, 30, 30));
        defer_subtree_dirty(&mut node, RectI::new(20, 20, 40, 40));

        let mut dm = manager();
        replay_deferred_subtree_dirty(&mut node, &mut dm);
        assert_eq!(dm.current_frame_dirty(), RectI::new(0, 0, 40, 40));
        assert!(!node.cache.subtree_skipped_last_frame);

        dm.clear();
        replay_deferred_subtree_dirty(&mut node, &mut dm);
        assert!(!dm.is_current_frame_dirty());
    }

    #[test]
    fn rotation_classification() {
        assert!(is_rotation_multiple_of_90(&Affine::IDENTITY));
        assert!(is_rotation_multiple_of_90(&Affine::rotate(
            core::f64::consts::FRAC_PI_2
        )));
        assert!(!is_rotation_multiple_of_90(&Affine::rotate(0.3)));
    }

    #[test]
    fn singular_matrix_does_not_invert() {
        assert!(invert_affine(&Affine::scale(0.0)).is_none());
        let inv = invert_affine(&Affine::translate((5.0, 7.0))).unwrap();
        let p = inv * kurbo::Point::new(5.0, 7.0);
        assert!((p.x.abs() + p.y.abs()) < 1e-9);
    }
}
