// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pluggable hardware queries and device policies.

use canopy_region::RectI;
use canopy_scene::SurfaceState;

use super::HwcCandidate;

/// One layer submitted to the hardware prevalidate query.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerRequest {
    /// Packed id of the surface.
    pub surface: u64,
    /// Buffer-space source rect.
    pub src_rect: RectI,
    /// Display-space destination rect.
    pub dst_rect: RectI,
    /// Stacking order among submitted layers.
    pub z_order: u32,
}

/// The hardware composer's own post-hoc layer validation.
///
/// The composer may reject a layer the structural cascade accepted, e.g.
/// for plane count or scaler limits only the hardware knows. Out of scope
/// for this core; supplied by the embedder.
pub trait Prevalidate {
    /// Returns acceptance per layer, index-aligned with `layers`.
    ///
    /// An empty result means the query is unavailable this frame and is
    /// treated as accepting everything.
    fn validate(&self, layers: &[LayerRequest]) -> Vec<bool>;
}

/// Accepts every layer; used when no hardware query is wired up.
#[derive(Copy, Clone, Debug, Default)]
pub struct AcceptAll;

impl Prevalidate for AcceptAll {
    fn validate(&self, layers: &[LayerRequest]) -> Vec<bool> {
        vec![true; layers.len()]
    }
}

/// Device-specific eligibility predicates.
///
/// Some disable conditions depend on vendor heuristics that are not
/// derivable from scene structure. They plug in here instead of being
/// hard-coded into the cascade.
pub trait HwcPolicy {
    /// Returns true to veto the overlay path for this candidate.
    fn veto(&self, candidate: &HwcCandidate, surface: &SurfaceState) -> bool;

    /// Whether a cross-display surface may still use the overlay path.
    fn allow_cross_display(&self, _surface: &SurfaceState) -> bool {
        false
    }
}

/// The structural default: no device vetoes.
#[derive(Copy, Clone, Debug, Default)]
pub struct DefaultHwcPolicy;

impl HwcPolicy for DefaultHwcPolicy {
    fn veto(&self, _candidate: &HwcCandidate, _surface: &SurfaceState) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_all_is_index_aligned() {
        let layers = vec![
            LayerRequest {
                surface: 1,
                src_rect: RectI::ZERO,
                dst_rect: RectI::ZERO,
                z_order: 0,
            };
            3
        ];
        assert_eq!(AcceptAll.validate(&layers), vec![true; 3]);
    }
}
