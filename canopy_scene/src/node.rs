// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph nodes.

use alloc::vec::Vec;
use kurbo::Affine;

use canopy_region::RectI;

use crate::id::NodeId;
use crate::properties::NodeProperties;
use crate::screen::{DisplayState, ScreenState};
use crate::surface::SurfaceState;

/// The closed set of node kinds the prepare pass understands.
///
/// There are no third-party node kinds; every walker can `match`
/// exhaustively.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A physical screen; the root of each prepare pass.
    Screen,
    /// A logical display mapped onto part of a screen.
    LogicalDisplay,
    /// A window surface with its own dirty manager and occlusion state.
    Surface,
    /// A drawing node inside a surface.
    Canvas,
    /// A node applying a filter effect to a captured region of its parent.
    Effect,
    /// The root canvas node of a surface's content tree.
    Root,
    /// Groups children without geometry of its own.
    Union,
    /// Freezes a window snapshot during keyframe animations.
    WindowKeyframe,
}

/// Last-frame values cached per node, the diff base for incremental dirty
/// computation.
#[derive(Clone, Debug, Default)]
pub struct FrameCache {
    /// Absolute transform of the previous frame.
    pub old_abs_matrix: Affine,
    /// Absolute draw rect of the previous frame.
    pub old_abs_rect: RectI,
    /// The dirty rect this node contributed last frame.
    pub old_dirty_rect: RectI,
    /// Clip rect applied last frame.
    pub old_clip_rect: RectI,
    /// Union of last-frame rects of children removed since then; merged
    /// into the dirty manager on the next visit, then cleared.
    pub removed_children_rect: RectI,
    /// The subtree was skipped last frame; its deferred dirty rect must be
    /// replayed when the subtree is next prepared.
    pub subtree_skipped_last_frame: bool,
    /// Dirty accumulated while the subtree was being skipped.
    pub deferred_dirty_rect: RectI,
}

/// One node in the scene graph.
///
/// Kind-specific state lives in the optional payloads; a node of kind
/// [`NodeKind::Surface`] without a [`SurfaceState`] is a defect the walker
/// treats defensively (logged, subtree left for the next frame).
#[derive(Clone, Debug)]
pub struct Node {
    /// What kind of node this is.
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    /// Children in paint order, back to front.
    pub(crate) children: Vec<NodeId>,
    /// Render properties.
    pub properties: NodeProperties,
    /// Last-frame diff base.
    pub cache: FrameCache,
    /// Content changed since last frame (repaint needed even when geometry
    /// is unchanged).
    pub content_dirty: bool,
    /// Something in the subtree is dirty; set upward on mutation.
    pub subtree_dirty: bool,
    /// Surface payload, present for [`NodeKind::Surface`].
    pub surface: Option<SurfaceState>,
    /// Display payload, present for [`NodeKind::LogicalDisplay`].
    pub display: Option<DisplayState>,
    /// Screen payload, present for [`NodeKind::Screen`].
    pub screen: Option<ScreenState>,
}

impl Node {
    /// Creates a node of the given kind with its matching payload.
    #[must_use]
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            properties: NodeProperties::default(),
            cache: FrameCache::default(),
            content_dirty: false,
            subtree_dirty: false,
            surface: matches!(kind, NodeKind::Surface).then(SurfaceState::default),
            display: matches!(kind, NodeKind::LogicalDisplay).then(DisplayState::default),
            screen: matches!(kind, NodeKind::Screen).then(ScreenState::default),
        }
    }

    /// The node's parent, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in paint order, back to front.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_matches_kind() {
        assert!(Node::new(NodeKind::Surface).surface.is_some());
        assert!(Node::new(NodeKind::Surface).screen.is_none());
        assert!(Node::new(NodeKind::Screen).screen.is_some());
        assert!(Node::new(NodeKind::LogicalDisplay).display.is_some());
        assert!(Node::new(NodeKind::Canvas).surface.is_none());
    }
}
