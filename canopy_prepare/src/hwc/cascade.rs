// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-candidate disable cascade.

use hashbrown::HashMap;
use tracing::debug;

use canopy_region::RectI;
use canopy_scene::{
    HwcDisabledReason, HwcDisabledReasonCollection, SpecialLayerFlags, SurfaceState,
};

use super::compute::{compute_dst_rect, compute_src_rect};
use super::prevalidate::{HwcPolicy, LayerRequest, Prevalidate};
use super::HwcCandidate;
use crate::config::PrepareConfig;
use crate::filter::FilterTracker;
use crate::geometry::is_rotation_multiple_of_90;

const ALPHA_EPSILON: f64 = 1e-4;

/// Per-display state of the eligibility cascade.
///
/// Reset at the start of each logical display; accumulates the solid-layer
/// quota and the destination rects of overlay surfaces already confirmed,
/// which later candidates in the same app are checked against.
#[derive(Clone, Debug, Default)]
pub struct HwcEngine {
    solid_layers: usize,
    /// Confirmed overlay dst rects per owning app window, in cascade order.
    rects_below_in_app: HashMap<u64, Vec<RectI>>,
    /// Regions sampled by color pickers; overlays under them must render
    /// on the GPU so the sampled pixels exist.
    pub color_picker_rects: Vec<RectI>,
    /// HDR content is present somewhere on the screen; solid-color planes
    /// are SDR and must then compose on the GPU.
    pub screen_has_hdr: bool,
    /// Confirmed layers pending the hardware prevalidate query.
    pending: Vec<(u64, LayerRequest)>,
}

impl HwcEngine {
    /// Creates an engine for a new display pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets per-display accumulators.
    pub fn begin_display(&mut self) {
        self.solid_layers = 0;
        self.rects_below_in_app.clear();
        self.color_picker_rects.clear();
        self.screen_has_hdr = false;
        self.pending.clear();
    }

    /// Runs the disable cascade for one candidate and, when it survives,
    /// finalizes its src/dst rects and queues it for prevalidation.
    ///
    /// The cascade evaluates in a fixed order; the first failing check
    /// disables the surface, and later checks may add further reasons but
    /// never re-enable it. Top layers (cursor) bypass the cascade entirely,
    /// and protected content may force the overlay path despite disables.
    pub fn run_cascade(
        &mut self,
        candidate: &HwcCandidate,
        surface: &mut SurfaceState,
        screen_rect: RectI,
        app_dst: Option<RectI>,
        tracker: &FilterTracker,
        policy: &dyn HwcPolicy,
        config: &PrepareConfig,
        reasons: &mut HwcDisabledReasonCollection,
    ) {
        if !config.hwc_enabled {
            surface.hwc.disable();
            return;
        }
        let dst_rect = compute_dst_rect(candidate, screen_rect, app_dst);
        surface.hwc.dst_rect = dst_rect;

        if surface.is_top_layer {
            self.finalize(candidate, surface, dst_rect);
            return;
        }

        if candidate.background_transparent {
            deny(surface, reasons, candidate.surface, HwcDisabledReason::BackgroundAlpha);
        } else if candidate.background_solid {
            if self.screen_has_hdr {
                deny(surface, reasons, candidate.surface, HwcDisabledReason::SolidColorLayer);
            } else {
                self.solid_layers += 1;
                if self.solid_layers > config.solid_layer_limit {
                    deny(surface, reasons, candidate.surface, HwcDisabledReason::SolidColorLayer);
                }
            }
        }

        if surface.buffer.is_none() {
            deny(surface, reasons, candidate.surface, HwcDisabledReason::BufferSize);
        }

        if candidate.accumulated_alpha < 1.0 - ALPHA_EPSILON {
            deny(surface, reasons, candidate.surface, HwcDisabledReason::AccumulatedAlpha);
        }

        if !is_rotation_multiple_of_90(&candidate.abs_matrix) {
            deny(surface, reasons, candidate.surface, HwcDisabledReason::Rotation);
        }

        if candidate.corner_radius > 0.0
            && candidate
                .corner_rect
                .is_some_and(|corner| corner.intersects(&dst_rect))
        {
            deny(surface, reasons, candidate.surface, HwcDisabledReason::CornerRadius);
        }

        if surface.source_cross_node.is_some() && !policy.allow_cross_display(surface) {
            deny(surface, reasons, candidate.surface, HwcDisabledReason::CrossDisplay);
        }

        if policy.veto(candidate, surface) {
            deny(surface, reasons, candidate.surface, HwcDisabledReason::Policy);
        }

        self.check_hwc_node_below(candidate, surface, dst_rect, reasons);
        self.check_filters(candidate, surface, dst_rect, tracker, reasons);
        self.check_color_picker(candidate, surface, dst_rect, reasons);

        if surface.special.has(SpecialLayerFlags::PROTECTED) && surface.hwc.is_forced_disabled() {
            // DRM content cannot be read back for GPU composition.
            debug!(surface = candidate.surface, "protected content keeps the overlay path");
            surface.hwc.protected_force_enable = true;
        }

        if !surface.hwc.is_forced_disabled() {
            self.finalize(candidate, surface, dst_rect);
        }
    }

    /// Submits confirmed layers to the hardware prevalidate query and
    /// disables the rejected ones.
    ///
    /// An empty response means the query is unavailable and every layer
    /// stands.
    pub fn run_prevalidate(
        &mut self,
        query: &dyn Prevalidate,
        config: &PrepareConfig,
        mut disable: impl FnMut(u64),
        reasons: &mut HwcDisabledReasonCollection,
    ) {
        if !config.prevalidate_enabled || self.pending.is_empty() {
            self.pending.clear();
            return;
        }
        let layers: Vec<LayerRequest> = self.pending.iter().map(|(_, l)| l.clone()).collect();
        let verdicts = query.validate(&layers);
        if verdicts.is_empty() {
            self.pending.clear();
            return;
        }
        for ((surface, _), accepted) in self.pending.drain(..).zip(verdicts) {
            if !accepted {
                disable(surface);
                reasons.add(surface, HwcDisabledReason::Prevalidate);
            }
        }
    }

    fn check_hwc_node_below(
        &mut self,
        candidate: &HwcCandidate,
        surface: &mut SurfaceState,
        dst_rect: RectI,
        reasons: &mut HwcDisabledReasonCollection,
    ) {
        let Some(app) = candidate.app_surface else {
            return;
        };
        let below = self.rects_below_in_app.entry(app).or_default();
        if below.iter().any(|rect| rect.intersects(&dst_rect)) {
            deny(surface, reasons, candidate.surface, HwcDisabledReason::HwcNodeBelow);
        } else if !surface.hwc.is_forced_disabled() {
            below.push(dst_rect);
        }
    }

    fn check_filters(
        &self,
        candidate: &HwcCandidate,
        surface: &mut SurfaceState,
        dst_rect: RectI,
        tracker: &FilterTracker,
        reasons: &mut HwcDisabledReasonCollection,
    ) {
        // A filter below the candidate samples what the candidate covers;
        // compositing the candidate on an overlay would bypass the blur.
        for filter in &tracker.clean_filters {
            if filter.z_order_for_filter < candidate.z_order_for_filter
                && filter.rect.intersects(&dst_rect)
            {
                deny(surface, reasons, candidate.surface, HwcDisabledReason::CleanFilter);
                return;
            }
        }
        // Stale blur content disables any overlap regardless of order.
        for filter in &tracker.dirty_filters {
            if filter.rect.intersects(&dst_rect) {
                deny(surface, reasons, candidate.surface, HwcDisabledReason::DirtyFilter);
                return;
            }
        }
    }

    fn check_color_picker(
        &self,
        candidate: &HwcCandidate,
        surface: &mut SurfaceState,
        dst_rect: RectI,
        reasons: &mut HwcDisabledReasonCollection,
    ) {
        if self
            .color_picker_rects
            .iter()
            .any(|rect| rect.intersects(&dst_rect))
        {
            deny(surface, reasons, candidate.surface, HwcDisabledReason::ColorPicker);
        }
    }

    fn finalize(&mut self, candidate: &HwcCandidate, surface: &mut SurfaceState, dst_rect: RectI) {
        if let Some(buffer) = surface.buffer {
            surface.hwc.src_rect = compute_src_rect(candidate, &buffer, dst_rect);
        }
        self.pending.push((
            candidate.surface,
            LayerRequest {
                surface: candidate.surface,
                src_rect: surface.hwc.src_rect,
                dst_rect,
                z_order: surface.hwc.global_z_order,
            },
        ));
    }
}

fn deny(
    surface: &mut SurfaceState,
    reasons: &mut HwcDisabledReasonCollection,
    id: u64,
    reason: HwcDisabledReason,
) {
    surface.hwc.disable();
    reasons.add(id, reason);
}
