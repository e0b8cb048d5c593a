// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A set of disjoint rectangles with boolean region algebra.

use alloc::vec::Vec;
use smallvec::SmallVec;

use crate::rect::RectI;

/// Horizontal spans are `(left, right)` pairs, half-open like [`RectI`].
type Spans = SmallVec<[(i32, i32); 4]>;

/// One horizontal band: every rectangle in it shares `top` and `bottom`.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Band {
    top: i32,
    bottom: i32,
    spans: Spans,
}

/// A set of points in the plane, stored as disjoint rectangles.
///
/// Internally the region is normalized into horizontal bands: rectangles in
/// the same band share their vertical extent and are sorted and disjoint
/// horizontally, and two vertically adjacent bands never carry an identical
/// span list. Normalization makes equality and [`area`](Self::area)
/// independent of construction order.
///
/// The boolean operations return new values; the `*_self` variants mutate in
/// place. The area of a region never decreases under [`or`](Self::or) and
/// never increases under [`sub`](Self::sub) or [`and`](Self::and).
///
/// # Example
///
/// ```
/// use canopy_region::{RectI, Region};
///
/// let screen = Region::from_rect(RectI::new(0, 0, 200, 200));
/// let opaque = Region::from_rect(RectI::new(0, 0, 100, 200));
/// let visible = screen.sub(&opaque);
/// assert_eq!(visible.rects(), [RectI::new(100, 0, 200, 200)]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    bands: SmallVec<[Band; 4]>,
}

impl Region {
    /// The empty region.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A region covering exactly `rect`; empty rects yield the empty region.
    #[must_use]
    pub fn from_rect(rect: RectI) -> Self {
        if rect.is_empty() {
            return Self::new();
        }
        let mut spans = Spans::new();
        spans.push((rect.left, rect.right));
        let mut bands = SmallVec::new();
        bands.push(Band {
            top: rect.top,
            bottom: rect.bottom,
            spans,
        });
        Self { bands }
    }

    /// Returns true when the region contains no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Total covered area in pixels.
    #[must_use]
    pub fn area(&self) -> u64 {
        self.bands
            .iter()
            .map(|band| {
                let h = u64::from((band.bottom - band.top).unsigned_abs());
                let w: u64 = band
                    .spans
                    .iter()
                    .map(|&(l, r)| u64::from((r - l).unsigned_abs()))
                    .sum();
                h * w
            })
            .sum()
    }

    /// Bounding rectangle of the region; [`RectI::ZERO`] when empty.
    #[must_use]
    pub fn bounds(&self) -> RectI {
        let mut out = RectI::ZERO;
        for rect in self.iter_rects() {
            out = out.union(&rect);
        }
        out
    }

    /// The disjoint rectangles making up the region, top-to-bottom then
    /// left-to-right.
    #[must_use]
    pub fn rects(&self) -> Vec<RectI> {
        self.iter_rects().collect()
    }

    /// Iterates the disjoint rectangles without allocating.
    pub fn iter_rects(&self) -> impl Iterator<Item = RectI> + '_ {
        self.bands.iter().flat_map(|band| {
            band.spans
                .iter()
                .map(move |&(l, r)| RectI::new(l, band.top, r, band.bottom))
        })
    }

    /// Returns true when any part of `rect` lies inside the region.
    #[must_use]
    pub fn intersects_rect(&self, rect: &RectI) -> bool {
        if rect.is_empty() {
            return false;
        }
        self.iter_rects().any(|r| r.intersects(rect))
    }

    /// Returns true when `rect` lies entirely inside the region.
    #[must_use]
    pub fn contains_rect(&self, rect: &RectI) -> bool {
        if rect.is_empty() {
            return true;
        }
        self.and(&Self::from_rect(*rect)).area() == rect.area()
    }

    /// Union of `self` and `other`.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        boolean(self, other, SpanOp::Union)
    }

    /// Points of `self` not in `other`.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        boolean(self, other, SpanOp::Difference)
    }

    /// Points in both `self` and `other`.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        boolean(self, other, SpanOp::Intersection)
    }

    /// In-place union.
    pub fn or_self(&mut self, other: &Self) {
        *self = self.or(other);
    }

    /// In-place subtraction.
    pub fn sub_self(&mut self, other: &Self) {
        *self = self.sub(other);
    }

    /// In-place intersection.
    pub fn and_self(&mut self, other: &Self) {
        *self = self.and(other);
    }

    /// Union with a single rectangle, in place.
    pub fn or_rect(&mut self, rect: &RectI) {
        if !rect.is_empty() {
            self.or_self(&Self::from_rect(*rect));
        }
    }

    /// Translates every rectangle by the given offset.
    #[must_use]
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        let mut bands = SmallVec::new();
        for band in &self.bands {
            bands.push(Band {
                top: band.top + dy,
                bottom: band.bottom + dy,
                spans: band.spans.iter().map(|&(l, r)| (l + dx, r + dx)).collect(),
            });
        }
        Self { bands }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SpanOp {
    Union,
    Intersection,
    Difference,
}

/// Band-sweep boolean of two normalized regions.
///
/// Walks the merged set of y breakpoints from both operands; for each band
/// between consecutive breakpoints the active span lists are combined with
/// `op`, then vertically adjacent bands with identical spans are coalesced.
fn boolean(a: &Region, b: &Region, op: SpanOp) -> Region {
    if a.is_empty() {
        return match op {
            SpanOp::Union => b.clone(),
            SpanOp::Intersection | SpanOp::Difference => Region::new(),
        };
    }
    if b.is_empty() {
        return match op {
            SpanOp::Union | SpanOp::Difference => a.clone(),
            SpanOp::Intersection => Region::new(),
        };
    }

    let mut ys: Vec<i32> = Vec::with_capacity((a.bands.len() + b.bands.len()) * 2);
    for band in a.bands.iter().chain(&b.bands) {
        ys.push(band.top);
        ys.push(band.bottom);
    }
    ys.sort_unstable();
    ys.dedup();

    let mut out = Region::new();
    for pair in ys.windows(2) {
        let (top, bottom) = (pair[0], pair[1]);
        let sa = spans_at(a, top);
        let sb = spans_at(b, top);
        let combined = match op {
            SpanOp::Union => union_spans(sa, sb),
            SpanOp::Intersection => intersect_spans(sa, sb),
            SpanOp::Difference => subtract_spans(sa, sb),
        };
        if combined.is_empty() {
            continue;
        }
        // Coalesce with the previous band when the span lists match exactly.
        if let Some(last) = out.bands.last_mut()
            && last.bottom == top
            && last.spans == combined
        {
            last.bottom = bottom;
            continue;
        }
        out.bands.push(Band {
            top,
            bottom,
            spans: combined,
        });
    }
    out
}

/// Spans of the band containing row `y`, or empty when no band covers it.
fn spans_at(region: &Region, y: i32) -> &[(i32, i32)] {
    for band in &region.bands {
        if band.top <= y && y < band.bottom {
            return &band.spans;
        }
        if band.top > y {
            break;
        }
    }
    &[]
}

fn union_spans(a: &[(i32, i32)], b: &[(i32, i32)]) -> Spans {
    let mut merged: Spans = a.iter().chain(b).copied().collect();
    merged.sort_unstable();
    let mut out = Spans::new();
    for (l, r) in merged {
        if let Some(&mut (_, ref mut prev_r)) = out.last_mut()
            && l <= *prev_r
        {
            *prev_r = (*prev_r).max(r);
            continue;
        }
        out.push((l, r));
    }
    out
}

fn intersect_spans(a: &[(i32, i32)], b: &[(i32, i32)]) -> Spans {
    let mut out = Spans::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (al, ar) = a[i];
        let (bl, br) = b[j];
        let l = al.max(bl);
        let r = ar.min(br);
        if l < r {
            out.push((l, r));
        }
        if ar <= br {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

fn subtract_spans(a: &[(i32, i32)], b: &[(i32, i32)]) -> Spans {
    let mut out = Spans::new();
    let mut j = 0;
    for &(al, ar) in a {
        let mut cursor = al;
        while j < b.len() && b[j].1 <= cursor {
            j += 1;
        }
        let mut k = j;
        while k < b.len() && b[k].0 < ar {
            let (bl, br) = b[k];
            if bl > cursor {
                out.push((cursor, bl.min(ar)));
            }
            cursor = cursor.max(br);
            if cursor >= ar {
                break;
            }
            k += 1;
        }
        if cursor < ar {
            out.push((cursor, ar));
        }
    }
    out
}
