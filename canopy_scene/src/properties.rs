// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node render properties consumed by the prepare pass.

use kurbo::{Affine, Rect};

/// Epsilon for alpha comparisons.
///
/// Animated alpha arrives with floating-point noise; exact comparison
/// against 1.0 or 0.0 would flicker surfaces between composition paths.
pub(crate) const ALPHA_EPSILON: f64 = 1e-4;

/// Drop shadow attributes of a node.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ShadowParams {
    /// Horizontal offset of the shadow in local units.
    pub offset_x: f64,
    /// Vertical offset of the shadow in local units.
    pub offset_y: f64,
    /// Blur radius; the shadow extends this far past the caster.
    pub radius: f64,
}

/// The property set the prepare pass reads from every node.
///
/// Property storage internals live outside this core; this struct is the
/// accessor contract. All geometry is in the node's local coordinate space
/// before [`local_transform`](Self::local_transform) is applied.
#[derive(Clone, Debug)]
pub struct NodeProperties {
    /// Drawable bounds in local space.
    pub bounds: Rect,
    /// Content frame in local space; clipped against when
    /// [`clip_to_frame`](Self::clip_to_frame) is set.
    pub frame: Rect,
    /// Transform relative to the parent.
    pub local_transform: Affine,
    /// This node's own alpha, multiplied down the ancestor chain.
    pub alpha: f64,
    /// Clip children to [`bounds`](Self::bounds).
    pub clip_to_bounds: bool,
    /// Clip children to [`frame`](Self::frame).
    pub clip_to_frame: bool,
    /// Uniform corner radius; a nonzero radius makes the corners
    /// transparent for occlusion purposes.
    pub corner_radius: f64,
    /// Alpha of the background fill, `0.0..=1.0`.
    pub background_alpha: f64,
    /// Whether the background is a solid fill covering the bounds.
    pub background_solid: bool,
    /// A background (behind-content) filter is attached.
    pub has_background_filter: bool,
    /// A foreground (over-content) filter is attached.
    pub has_foreground_filter: bool,
    /// How far the filter's visual effect reaches past the bounds.
    pub filter_outset: f64,
    /// Drop shadow, when present.
    pub shadow: Option<ShadowParams>,
}

impl Default for NodeProperties {
    fn default() -> Self {
        Self {
            bounds: Rect::ZERO,
            frame: Rect::ZERO,
            local_transform: Affine::IDENTITY,
            alpha: 1.0,
            clip_to_bounds: false,
            clip_to_frame: false,
            corner_radius: 0.0,
            background_alpha: 1.0,
            background_solid: false,
            has_background_filter: false,
            has_foreground_filter: false,
            filter_outset: 0.0,
            shadow: None,
        }
    }
}

impl NodeProperties {
    /// Returns true when either clip flag is set.
    #[must_use]
    pub fn needs_clip(&self) -> bool {
        self.clip_to_bounds || self.clip_to_frame
    }

    /// The rect children are clipped against in local space.
    #[must_use]
    pub fn clip_rect_local(&self) -> Rect {
        if self.clip_to_frame {
            self.frame
        } else {
            self.bounds
        }
    }

    /// Returns true when any filter is attached.
    #[must_use]
    pub fn has_filter(&self) -> bool {
        self.has_background_filter || self.has_foreground_filter
    }

    /// Returns true when the node's alpha is effectively fully opaque.
    #[must_use]
    pub fn is_alpha_opaque(&self) -> bool {
        self.alpha >= 1.0 - ALPHA_EPSILON
    }

    /// Returns true when the background fill is effectively transparent.
    #[must_use]
    pub fn is_background_transparent(&self) -> bool {
        self.background_alpha <= ALPHA_EPSILON
    }

    /// Bounds extended by filter reach and shadow extent; the area the node
    /// can affect visually in local space.
    #[must_use]
    pub fn extended_bounds(&self) -> Rect {
        let mut rect = self.bounds;
        if self.has_filter() && self.filter_outset > 0.0 {
            rect = rect.inflate(self.filter_outset, self.filter_outset);
        }
        if let Some(shadow) = &self.shadow {
            let shadow_rect = Rect::new(
                self.bounds.x0 + shadow.offset_x - shadow.radius,
                self.bounds.y0 + shadow.offset_y - shadow.radius,
                self.bounds.x1 + shadow.offset_x + shadow.radius,
                self.bounds.y1 + shadow.offset_y + shadow.radius,
            );
            rect = rect.union(shadow_rect);
        }
        rect
    }
}
