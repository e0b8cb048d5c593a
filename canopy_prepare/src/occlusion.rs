// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion and visible-region computation.
//!
//! Surfaces are processed front-to-back; each surface's visible region is
//! its self rect minus everything opaque already accumulated, and surfaces
//! that participate in occlusion then add their own opaque region to the
//! accumulator.

use canopy_region::{RectI, Region};
use canopy_scene::{DisplayState, SurfaceState, VisibleLevel};

use crate::config::PrepareConfig;

/// The opaque region a surface contributes when it participates in
/// occlusion: its self rect minus known transparent sub-regions.
#[must_use]
pub fn compute_opaque_region(surface: &SurfaceState, alpha: f64, corner_radius: f64) -> Region {
    if alpha < 1.0 - 1e-4 {
        return Region::new();
    }
    let self_rect = surface.abs_rect;
    if self_rect.is_empty() {
        return Region::new();
    }
    let mut opaque = Region::from_rect(self_rect);

    if surface.container_transparent && surface.container_inset > 0 {
        let inset = surface.container_inset;
        let content = RectI::new(
            self_rect.left + inset,
            self_rect.top + inset,
            self_rect.right - inset,
            self_rect.bottom - inset,
        );
        opaque = Region::from_rect(content);
    }

    if corner_radius > 0.0 {
        #[expect(clippy::cast_possible_truncation, reason = "radii fit in i32")]
        let r = corner_radius.ceil().clamp(0.0, f64::from(i32::MAX)) as i32;
        // Rounded corners are transparent; carve a square per corner.
        let corners = [
            RectI::new(self_rect.left, self_rect.top, self_rect.left + r, self_rect.top + r),
            RectI::new(self_rect.right - r, self_rect.top, self_rect.right, self_rect.top + r),
            RectI::new(
                self_rect.left,
                self_rect.bottom - r,
                self_rect.left + r,
                self_rect.bottom,
            ),
            RectI::new(
                self_rect.right - r,
                self_rect.bottom - r,
                self_rect.right,
                self_rect.bottom,
            ),
        ];
        for corner in corners {
            opaque.sub_self(&Region::from_rect(corner));
        }
    }
    opaque
}

/// Computes a surface's visible regions from the occlusion accumulated by
/// surfaces in front of it, and derives its transparent region.
pub fn update_visible_region(
    surface: &mut SurfaceState,
    accumulated: &Region,
    behind_window: &Region,
    behind_window_enabled: bool,
) {
    let self_region = Region::from_rect(surface.abs_rect);
    surface.visible_region = self_region.sub(accumulated);
    surface.visible_region_behind_window = if behind_window_enabled {
        surface.visible_region.sub(behind_window)
    } else {
        surface.visible_region.clone()
    };
    surface.transparent_region = self_region.sub(&surface.opaque_region);
}

/// Whether a surface's opaque region joins the occlusion accumulator.
///
/// Animating windows are excluded (their geometry is in flight and pixels
/// behind them may show through mid-animation) unless they hold focus, and
/// debug-forced-visible surfaces never occlude.
#[must_use]
pub fn participates_in_occlusion(surface: &SurfaceState, ancestor_animating: bool) -> bool {
    surface.window_type.is_main()
        && !surface.debug_force_visible
        && !ancestor_animating
        && (!surface.animating || surface.is_focused)
}

/// Whether a fully occluded surface's subtree can be skipped outright.
///
/// Pending snapshots and running animations still need their subtree
/// prepared even when nothing is visible.
#[must_use]
pub fn is_subtree_occluded(surface: &SurfaceState) -> bool {
    surface.is_fully_occluded() && !surface.snapshot_pending && !surface.animating
}

/// Classifies how much of a surface survived occlusion, for the window
/// manager's QoS callback.
#[must_use]
pub fn classify_visible_level(surface: &SurfaceState, min_visible_ratio: f64) -> VisibleLevel {
    let self_area = surface.abs_rect.area();
    if self_area == 0 || surface.visible_region.is_empty() {
        return VisibleLevel::Invisible;
    }
    let visible_area = surface.visible_region.area();
    if visible_area >= self_area {
        return VisibleLevel::All;
    }
    #[expect(clippy::cast_precision_loss, reason = "areas are far below 2^52")]
    let ratio = visible_area as f64 / self_area as f64;
    if ratio <= min_visible_ratio {
        VisibleLevel::SemiMinimum
    } else {
        VisibleLevel::Semi
    }
}

/// The largest single rect of a region, for stencil bookkeeping.
#[must_use]
pub(crate) fn largest_rect(region: &Region) -> RectI {
    region
        .iter_rects()
        .max_by_key(RectI::area)
        .unwrap_or(RectI::ZERO)
}

/// Records one top surface for stencil pixel occlusion culling.
///
/// The top few main/leash surfaces get a stencil reference value and their
/// largest opaque rect recorded on the display. When a transparent filter
/// region overlaps opaque area already collected, collection is switched
/// off for the rest of the pass: a stale stencil test against blurred
/// content would reject pixels that actually need redrawing. Surfaces
/// already recorded keep their values.
pub fn collect_top_occlusion_surface(
    display: &mut DisplayState,
    surface: &mut SurfaceState,
    transparent_filter: &Region,
    config: &PrepareConfig,
) {
    if !config.stencil_occlusion_enabled || !display.stencil_collection_active() {
        return;
    }
    if display.top_opaque_rects.len() >= config.stencil_top_surface_count {
        return;
    }
    if !transparent_filter.is_empty() {
        let collected = display
            .top_opaque_rects
            .iter()
            .fold(Region::new(), |mut acc, rect| {
                acc.or_rect(rect);
                acc
            });
        if !transparent_filter.and(&collected).is_empty() {
            display.disable_stencil_collection();
            return;
        }
    }
    let opaque = largest_rect(&surface.opaque_region);
    if opaque.is_empty() {
        return;
    }
    display.occlusion_surface_order += 1;
    surface.stencil_value = display.occlusion_surface_order;
    display.top_opaque_rects.push(opaque);
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_scene::SurfaceWindowType;

    fn main_surface(rect: RectI) -> SurfaceState {
        SurfaceState {
            window_type: SurfaceWindowType::Main,
            abs_rect: rect,
            ..Default::default()
        }
    }

    #[test]
    fn opaque_surface_contributes_self_rect() {
        let s = main_surface(RectI::new(0, 0, 100, 200));
        let opaque = compute_opaque_region(&s, 1.0, 0.0);
        assert_eq!(opaque.rects(), [RectI::new(0, 0, 100, 200)]);
    }

    #[test]
    fn translucent_surface_contributes_nothing() {
        let s = main_surface(RectI::new(0, 0, 100, 200));
        assert!(compute_opaque_region(&s, 0.8, 0.0).is_empty());
    }

    #[test]
    fn rounded_corners_are_transparent() {
        let s = main_surface(RectI::new(0, 0, 100, 100));
        let opaque = compute_opaque_region(&s, 1.0, 10.0);
        assert!(opaque.area() == 100 * 100 - 4 * 100);
        assert!(!opaque.contains_rect(&RectI::new(0, 0, 5, 5)));
        assert!(opaque.contains_rect(&RectI::new(20, 20, 80, 80)));
    }

    #[test]
    fn transparent_container_shrinks_to_content() {
        let mut s = main_surface(RectI::new(0, 0, 100, 100));
        s.container_transparent = true;
        s.container_inset = 10;
        let opaque = compute_opaque_region(&s, 1.0, 0.0);
        assert_eq!(opaque.rects(), [RectI::new(10, 10, 90, 90)]);
    }

    #[test]
    fn visible_region_is_self_minus_front() {
        let mut behind = main_surface(RectI::new(0, 0, 200, 200));
        let front_opaque = Region::from_rect(RectI::new(0, 0, 100, 200));
        update_visible_region(&mut behind, &front_opaque, &Region::new(), true);
        assert_eq!(behind.visible_region.rects(), [RectI::new(100, 0, 200, 200)]);
        assert_eq!(behind.visible_region.area(), 100 * 200);
    }

    #[test]
    fn visible_region_never_exceeds_self_rect() {
        let mut s = main_surface(RectI::new(50, 50, 150, 150));
        update_visible_region(&mut s, &Region::new(), &Region::new(), true);
        assert!(
            Region::from_rect(s.abs_rect)
                .contains_rect(&s.visible_region.bounds())
        );
    }

    #[test]
    fn fully_covered_surface_is_occludable() {
        let mut s = main_surface(RectI::new(0, 0, 200, 200));
        let front = Region::from_rect(RectI::new(0, 0, 200, 200));
        update_visible_region(&mut s, &front, &Region::new(), true);
        assert!(s.is_fully_occluded());
        assert!(is_subtree_occluded(&s));

        s.snapshot_pending = true;
        assert!(!is_subtree_occluded(&s));
    }

    #[test]
    fn animating_unfocused_window_does_not_occlude() {
        let mut s = main_surface(RectI::new(0, 0, 10, 10));
        assert!(participates_in_occlusion(&s, false));
        s.animating = true;
        assert!(!participates_in_occlusion(&s, false));
        s.is_focused = true;
        assert!(participates_in_occlusion(&s, false));
        assert!(!participates_in_occlusion(&s, true));
    }

    #[test]
    fn visible_level_thresholds() {
        let mut s = main_surface(RectI::new(0, 0, 100, 100));
        update_visible_region(&mut s, &Region::new(), &Region::new(), true);
        assert_eq!(classify_visible_level(&s, 0.25), VisibleLevel::All);

        update_visible_region(
            &mut s,
            &Region::from_rect(RectI::new(0, 0, 100, 50)),
            &Region::new(),
            true,
        );
        assert_eq!(classify_visible_level(&s, 0.25), VisibleLevel::Semi);

        update_visible_region(
            &mut s,
            &Region::from_rect(RectI::new(0, 0, 100, 90)),
            &Region::new(),
            true,
        );
        assert_eq!(classify_visible_level(&s, 0.25), VisibleLevel::SemiMinimum);

        update_visible_region(
            &mut s,
            &Region::from_rect(RectI::new(0, 0, 100, 100)),
            &Region::new(),
            true,
        );
        assert_eq!(classify_visible_level(&s, 0.25), VisibleLevel::Invisible);
    }

    #[test]
    fn stencil_collection_stops_at_transparent_blur_overlap() {
        let config = PrepareConfig {
            stencil_occlusion_enabled: true,
            stencil_top_surface_count: 3,
            ..Default::default()
        };
        let mut display = DisplayState::default();
        display.begin_frame();

        let mut front = main_surface(RectI::new(0, 0, 100, 100));
        front.opaque_region = Region::from_rect(front.abs_rect);
        collect_top_occlusion_surface(&mut display, &mut front, &Region::new(), &config);
        assert_eq!(front.stencil_value, 1);
        assert_eq!(display.top_opaque_rects.len(), 1);

        // A transparent blur over already-collected opaque area ends
        // collection; recorded surfaces keep their values.
        let mut blurred = main_surface(RectI::new(50, 50, 150, 150));
        blurred.opaque_region = Region::from_rect(blurred.abs_rect);
        let blur_region = Region::from_rect(RectI::new(50, 50, 150, 150));
        collect_top_occlusion_surface(&mut display, &mut blurred, &blur_region, &config);
        assert!(!display.stencil_collection_active());
        assert_eq!(blurred.stencil_value, 0);
        assert_eq!(display.top_opaque_rects.len(), 1);
        assert_eq!(front.stencil_value, 1);

        // Later surfaces are ignored for the rest of the pass.
        let mut back = main_surface(RectI::new(200, 200, 300, 300));
        back.opaque_region = Region::from_rect(back.abs_rect);
        collect_top_occlusion_surface(&mut display, &mut back, &Region::new(), &config);
        assert_eq!(back.stencil_value, 0);
    }

    #[test]
    fn stencil_collection_caps_at_configured_count() {
        let config = PrepareConfig {
            stencil_occlusion_enabled: true,
            stencil_top_surface_count: 1,
            ..Default::default()
        };
        let mut display = DisplayState::default();
        display.begin_frame();

        let mut a = main_surface(RectI::new(0, 0, 10, 10));
        a.opaque_region = Region::from_rect(a.abs_rect);
        let mut b = main_surface(RectI::new(20, 20, 30, 30));
        b.opaque_region = Region::from_rect(b.abs_rect);

        collect_top_occlusion_surface(&mut display, &mut a, &Region::new(), &config);
        collect_top_occlusion_surface(&mut display, &mut b, &Region::new(), &config);
        assert_eq!(display.top_opaque_rects.len(), 1);
        assert_eq!(b.stencil_value, 0);
    }
}
