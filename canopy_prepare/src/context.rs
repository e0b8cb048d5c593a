// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-descent traversal context.

use kurbo::Affine;

use canopy_region::RectI;

/// Rendering context accumulated down one branch of the tree.
///
/// Passed **by value** into each recursive call and dropped on return, so
/// every descent sees exactly its ancestors' state and nothing needs to be
/// saved and restored around recursion.
#[derive(Copy, Clone, Debug)]
pub struct TraversalContext {
    /// Alpha multiplied down the ancestor chain.
    pub alpha: f64,
    /// An ancestor's geometry or content changed; descendants must merge
    /// their rects regardless of their own deltas.
    pub dirty: bool,
    /// Accumulated clip in display coordinates, when any ancestor clips.
    pub clip_rect: Option<RectI>,
    /// Corner radius inherited from the nearest rounded ancestor clip.
    pub corner_radius: f64,
    /// The rect the inherited corner radius applies to.
    pub corner_rect: Option<RectI>,
    /// Parent's accumulated absolute transform.
    pub parent_matrix: Affine,
    /// An ancestor is running a window animation.
    pub ancestor_animating: bool,
}

impl Default for TraversalContext {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            dirty: false,
            clip_rect: None,
            corner_radius: 0.0,
            corner_rect: None,
            parent_matrix: Affine::IDENTITY,
            ancestor_animating: false,
        }
    }
}

impl TraversalContext {
    /// A fresh context for a screen root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Intersects the inherited clip with a new clip rect.
    #[must_use]
    pub fn clipped_by(mut self, clip: RectI) -> Self {
        self.clip_rect = Some(match self.clip_rect {
            Some(existing) => existing.intersect(&clip),
            None => clip,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clipping_narrows_monotonically() {
        let ctx = TraversalContext::root()
            .clipped_by(RectI::new(0, 0, 100, 100))
            .clipped_by(RectI::new(50, 50, 200, 200));
        assert_eq!(ctx.clip_rect, Some(RectI::new(50, 50, 100, 100)));
    }

    #[test]
    fn child_context_is_independent() {
        let parent = TraversalContext::root();
        let mut child = parent;
        child.alpha *= 0.5;
        child.dirty = true;
        assert_eq!(parent.alpha, 1.0);
        assert!(!parent.dirty);
    }
}
