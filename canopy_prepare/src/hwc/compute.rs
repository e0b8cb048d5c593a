// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Source and destination rect computation for confirmed overlay layers.

use kurbo::Rect;

use canopy_region::RectI;
use canopy_scene::BufferInfo;

use super::HwcCandidate;
use crate::geometry::{invert_affine, round_out};

/// The display-space rect an overlay covers: the candidate's absolute rect
/// clipped to the screen, the accumulated clip, and the owning app
/// window's own destination.
#[must_use]
pub fn compute_dst_rect(
    candidate: &HwcCandidate,
    screen_rect: RectI,
    app_dst: Option<RectI>,
) -> RectI {
    let mut dst = candidate.abs_rect.intersect(&screen_rect);
    if let Some(clip) = candidate.clip_rect {
        dst = dst.intersect(&clip);
    }
    if let Some(app) = app_dst {
        dst = dst.intersect(&app);
    }
    dst
}

/// The buffer-space rect the overlay samples for a given destination.
///
/// Maps the destination back through the inverse of the candidate's
/// absolute matrix into local bounds space, then scales local units to
/// buffer pixels. When the buffer transform swaps axes the sampled rect is
/// transposed inside the buffer. Returns the whole buffer when the matrix
/// cannot be inverted (the overlay then shows the full buffer, safe but
/// unscaled).
#[must_use]
#[expect(
    clippy::cast_possible_truncation,
    reason = "buffer coordinates fit in i32"
)]
pub fn compute_src_rect(candidate: &HwcCandidate, buffer: &BufferInfo, dst_rect: RectI) -> RectI {
    let buffer_w = f64::from(buffer.width);
    let buffer_h = f64::from(buffer.height);
    let full = RectI::new(0, 0, buffer_w as i32, buffer_h as i32);
    let Some(inverse) = invert_affine(&candidate.abs_matrix) else {
        return full;
    };
    let bounds = candidate.local_bounds;
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 || dst_rect.is_empty() {
        return full;
    }

    let dst = Rect::new(
        f64::from(dst_rect.left),
        f64::from(dst_rect.top),
        f64::from(dst_rect.right),
        f64::from(dst_rect.bottom),
    );
    // The local bounds span the buffer content; a swapped transform means
    // the content is stored rotated inside the buffer.
    let local = inverse.transform_rect_bbox(dst);
    let (content_w, content_h) = if buffer.transform_swap {
        (buffer_h, buffer_w)
    } else {
        (buffer_w, buffer_h)
    };
    let scale_x = content_w / bounds.width();
    let scale_y = content_h / bounds.height();
    let sampled = Rect::new(
        (local.x0 - bounds.x0) * scale_x,
        (local.y0 - bounds.y0) * scale_y,
        (local.x1 - bounds.x0) * scale_x,
        (local.y1 - bounds.y0) * scale_y,
    );
    let sampled = if buffer.transform_swap {
        Rect::new(sampled.y0, sampled.x0, sampled.y1, sampled.x1)
    } else {
        sampled
    };
    round_out(sampled).intersect(&full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Affine;

    fn candidate(abs_rect: RectI, matrix: Affine) -> HwcCandidate {
        HwcCandidate {
            surface: 1,
            abs_matrix: matrix,
            abs_rect,
            local_bounds: Rect::new(
                0.0,
                0.0,
                f64::from(abs_rect.width()),
                f64::from(abs_rect.height()),
            ),
            accumulated_alpha: 1.0,
            corner_radius: 0.0,
            corner_rect: None,
            z_order_for_filter: 0,
            app_surface: None,
            clip_rect: None,
            background_transparent: false,
            background_solid: false,
        }
    }

    #[test]
    fn dst_rect_clips_to_screen_and_app() {
        let c = candidate(RectI::new(-50, -50, 500, 500), Affine::IDENTITY);
        let dst = compute_dst_rect(&c, RectI::new(0, 0, 400, 400), Some(RectI::new(0, 0, 300, 300)));
        assert_eq!(dst, RectI::new(0, 0, 300, 300));
    }

    #[test]
    fn dst_rect_applies_accumulated_clip() {
        let mut c = candidate(RectI::new(0, 0, 200, 200), Affine::IDENTITY);
        c.clip_rect = Some(RectI::new(50, 50, 150, 150));
        let dst = compute_dst_rect(&c, RectI::new(0, 0, 1000, 1000), None);
        assert_eq!(dst, RectI::new(50, 50, 150, 150));
    }

    #[test]
    fn full_visible_identity_samples_whole_buffer() {
        let c = candidate(RectI::new(0, 0, 100, 100), Affine::IDENTITY);
        let buffer = BufferInfo {
            width: 100,
            height: 100,
            transform_swap: false,
        };
        let src = compute_src_rect(&c, &buffer, RectI::new(0, 0, 100, 100));
        assert_eq!(src, RectI::new(0, 0, 100, 100));
    }

    #[test]
    fn clipped_dst_samples_matching_subrect() {
        let c = candidate(RectI::new(0, 0, 100, 100), Affine::IDENTITY);
        let buffer = BufferInfo {
            width: 100,
            height: 100,
            transform_swap: false,
        };
        let src = compute_src_rect(&c, &buffer, RectI::new(0, 0, 50, 100));
        assert_eq!(src, RectI::new(0, 0, 50, 100));
    }

    #[test]
    fn singular_matrix_falls_back_to_full_buffer() {
        let c = candidate(RectI::new(0, 0, 100, 100), Affine::scale(0.0));
        let buffer = BufferInfo {
            width: 64,
            height: 32,
            transform_swap: false,
        };
        let src = compute_src_rect(&c, &buffer, RectI::new(0, 0, 10, 10));
        assert_eq!(src, RectI::new(0, 0, 64, 32));
    }
}
