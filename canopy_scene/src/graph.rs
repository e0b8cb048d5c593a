// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arena storage for the scene graph.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::id::NodeId;
use crate::node::{Node, NodeKind};

struct Slot {
    generation: u32,
    node: Option<Node>,
}

impl core::fmt::Debug for Slot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Slot")
            .field("generation", &self.generation)
            .field("occupied", &self.node.is_some())
            .finish()
    }
}

/// Arena of scene nodes addressed by generational [`NodeId`] handles.
///
/// Parent links are explicit indices, never owning references, so upward
/// traversal cannot create ownership cycles. Children are kept in paint
/// order, back to front.
///
/// # Example
///
/// ```
/// use canopy_scene::{NodeKind, SceneGraph};
///
/// let mut graph = SceneGraph::new();
/// let screen = graph.insert(NodeKind::Screen, None);
/// let display = graph.insert(NodeKind::LogicalDisplay, Some(screen));
/// let surface = graph.insert(NodeKind::Surface, Some(display));
/// assert_eq!(graph.parent(surface), Some(display));
/// assert_eq!(graph.children(screen), [display]);
/// ```
#[derive(Debug, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl SceneGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new node, appending it as the frontmost child of `parent`.
    ///
    /// A stale `parent` handle leaves the node detached.
    pub fn insert(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let mut node = Node::new(kind);
        let parent = parent.filter(|p| self.is_alive(*p));
        node.parent = parent;

        let id = if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation += 1;
            slot.node = Some(node);
            NodeId::new(idx, slot.generation)
        } else {
            let idx = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 1,
                node: Some(node),
            });
            NodeId::new(idx, 1)
        };

        if let Some(parent) = parent
            && let Some(parent_node) = self.get_mut(parent)
        {
            parent_node.children.push(id);
        }
        id
    }

    /// Returns true when `id` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.slots
            .get(id.idx())
            .is_some_and(|slot| slot.generation == id.1 && slot.node.is_some())
    }

    /// Borrows a node; `None` for stale handles.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.node.as_ref()
    }

    /// Mutably borrows a node; `None` for stale handles.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.node.as_mut()
    }

    /// The node's parent, or `None` for roots and stale handles.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// The node's children in paint order; empty for stale handles.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], Node::children)
    }

    /// Removes `id` and its whole subtree.
    ///
    /// The subtree's last-frame absolute rect is recorded on the parent as
    /// a removed-child rect so the next prepare pass repaints the area the
    /// subtree used to cover.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        let parent = self.parent(id);
        let old_rect = self.get(id).map(|n| n.cache.old_abs_rect);

        if let Some(parent) = parent
            && let Some(parent_node) = self.get_mut(parent)
        {
            parent_node.children.retain(|&c| c != id);
            if let Some(rect) = old_rect {
                parent_node.cache.removed_children_rect =
                    parent_node.cache.removed_children_rect.union(&rect);
            }
        }
        self.free_subtree(id);
    }

    /// Moves `id` to the front (top) of its siblings.
    pub fn bring_to_front(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node.children.retain(|&c| c != id);
            parent_node.children.push(id);
        }
    }

    /// Marks `id` content-dirty and flags `subtree_dirty` on every
    /// ancestor.
    pub fn mark_content_dirty(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            node.content_dirty = true;
        } else {
            return;
        }
        let mut cursor = self.parent(id);
        while let Some(ancestor) = cursor {
            let Some(node) = self.get_mut(ancestor) else {
                break;
            };
            if node.subtree_dirty {
                break;
            }
            node.subtree_dirty = true;
            cursor = node.parent;
        }
    }

    /// Iterates live node handles in slot order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.node.as_ref().map(|_| {
                let idx = u32::try_from(idx).unwrap_or(u32::MAX);
                NodeId::new(idx, slot.generation)
            })
        })
    }

    /// Collects the surface nodes under `root` in paint order.
    #[must_use]
    pub fn surfaces_below(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.push(root);
        while let Some(id) = stack.pop() {
            if let Some(node) = self.get(id) {
                if node.kind == NodeKind::Surface && id != root {
                    out.push(id);
                }
                // Reverse push keeps paint order on the pop side.
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.push(id);
        while let Some(current) = stack.pop() {
            let Some(slot) = self.slots.get_mut(current.idx()) else {
                continue;
            };
            if slot.generation != current.1 {
                continue;
            }
            if let Some(node) = slot.node.take() {
                self.free.push(current.0);
                stack.extend(node.children);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_region::RectI;

    #[test]
    fn insert_links_parent_and_children() {
        let mut g = SceneGraph::new();
        let screen = g.insert(NodeKind::Screen, None);
        let a = g.insert(NodeKind::Surface, Some(screen));
        let b = g.insert(NodeKind::Surface, Some(screen));
        assert_eq!(g.children(screen), [a, b]);
        assert_eq!(g.parent(a), Some(screen));
        assert_eq!(g.parent(screen), None);
    }

    #[test]
    fn removed_handles_go_stale() {
        let mut g = SceneGraph::new();
        let screen = g.insert(NodeKind::Screen, None);
        let a = g.insert(NodeKind::Surface, Some(screen));
        g.remove(a);
        assert!(!g.is_alive(a));
        assert!(g.get(a).is_none());

        // Slot reuse bumps the generation; the stale handle stays stale.
        let b = g.insert(NodeKind::Canvas, Some(screen));
        assert!(g.is_alive(b));
        assert!(!g.is_alive(a));
        assert_ne!(a, b);
    }

    #[test]
    fn remove_records_removed_child_rect() {
        let mut g = SceneGraph::new();
        let screen = g.insert(NodeKind::Screen, None);
        let a = g.insert(NodeKind::Canvas, Some(screen));
        g.get_mut(a).unwrap().cache.old_abs_rect = RectI::new(10, 10, 50, 50);
        g.remove(a);
        assert_eq!(
            g.get(screen).unwrap().cache.removed_children_rect,
            RectI::new(10, 10, 50, 50)
        );
        assert!(g.children(screen).is_empty());
    }

    #[test]
    fn remove_frees_whole_subtree() {
        let mut g = SceneGraph::new();
        let screen = g.insert(NodeKind::Screen, None);
        let surface = g.insert(NodeKind::Surface, Some(screen));
        let canvas = g.insert(NodeKind::Canvas, Some(surface));
        let leaf = g.insert(NodeKind::Canvas, Some(canvas));
        g.remove(surface);
        assert!(!g.is_alive(surface));
        assert!(!g.is_alive(canvas));
        assert!(!g.is_alive(leaf));
        assert!(g.is_alive(screen));
    }

    #[test]
    fn bring_to_front_reorders_siblings() {
        let mut g = SceneGraph::new();
        let screen = g.insert(NodeKind::Screen, None);
        let a = g.insert(NodeKind::Surface, Some(screen));
        let b = g.insert(NodeKind::Surface, Some(screen));
        let c = g.insert(NodeKind::Surface, Some(screen));
        g.bring_to_front(a);
        assert_eq!(g.children(screen), [b, c, a]);
    }

    #[test]
    fn mark_content_dirty_flags_ancestors() {
        let mut g = SceneGraph::new();
        let screen = g.insert(NodeKind::Screen, None);
        let surface = g.insert(NodeKind::Surface, Some(screen));
        let canvas = g.insert(NodeKind::Canvas, Some(surface));
        g.mark_content_dirty(canvas);
        assert!(g.get(canvas).unwrap().content_dirty);
        assert!(g.get(surface).unwrap().subtree_dirty);
        assert!(g.get(screen).unwrap().subtree_dirty);
        assert!(!g.get(screen).unwrap().content_dirty);
    }

    #[test]
    fn surfaces_below_in_paint_order() {
        let mut g = SceneGraph::new();
        let screen = g.insert(NodeKind::Screen, None);
        let display = g.insert(NodeKind::LogicalDisplay, Some(screen));
        let back = g.insert(NodeKind::Surface, Some(display));
        let leash = g.insert(NodeKind::Surface, Some(display));
        let inner = g.insert(NodeKind::Surface, Some(leash));
        let front = g.insert(NodeKind::Surface, Some(display));
        assert_eq!(g.surfaces_below(screen), [back, leash, inner, front]);
    }
}
