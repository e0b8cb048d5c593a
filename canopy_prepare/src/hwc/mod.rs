// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hardware-composer eligibility.
//!
//! Every self-drawing surface starts the frame as an overlay candidate and
//! either survives the disable cascade or drops to GPU composition with a
//! recorded reason. Disabling is monotonic within a frame; nothing
//! re-enables a surface except the protected-content override, which is
//! decided once.
//!
//! The cascade is structural; device-specific heuristics plug in through
//! [`HwcPolicy`], and the hardware's own post-hoc layer validation through
//! [`Prevalidate`].

mod cascade;
mod compute;
mod prevalidate;

pub use cascade::HwcEngine;
pub use compute::{compute_dst_rect, compute_src_rect};
pub use prevalidate::{AcceptAll, DefaultHwcPolicy, HwcPolicy, LayerRequest, Prevalidate};

use kurbo::{Affine, Rect};

use canopy_region::RectI;

/// A hardware overlay candidate, snapshotted during the walk.
#[derive(Clone, Debug)]
pub struct HwcCandidate {
    /// Packed id of the surface node.
    pub surface: u64,
    /// Absolute transform at the candidate.
    pub abs_matrix: Affine,
    /// Absolute rect before overlay clipping.
    pub abs_rect: RectI,
    /// Local bounds spanning the buffer content.
    pub local_bounds: Rect,
    /// Alpha accumulated down the ancestor chain.
    pub accumulated_alpha: f64,
    /// Corner radius inherited from the nearest rounded ancestor clip.
    pub corner_radius: f64,
    /// The rect the inherited corner radius applies to.
    pub corner_rect: Option<RectI>,
    /// Pre-order z value for filter comparisons.
    pub z_order_for_filter: u32,
    /// Packed id of the owning main window, when inside one.
    pub app_surface: Option<u64>,
    /// Clip accumulated at the candidate.
    pub clip_rect: Option<RectI>,
    /// The background fill is effectively transparent.
    pub background_transparent: bool,
    /// The background is an opaque solid fill (solid-layer heuristic).
    pub background_solid: bool,
}
