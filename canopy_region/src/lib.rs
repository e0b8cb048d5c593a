// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Region: integer rectangles and set-of-rectangles region algebra.
//!
//! This crate is the geometric substrate for visibility and dirty-region
//! computation in the Canopy prepare pass:
//!
//! - [`RectI`]: an axis-aligned rectangle with `i32` edges and half-open
//!   intersection semantics (rectangles sharing only a boundary edge do not
//!   intersect).
//! - [`Region`]: an immutable-value set of disjoint rectangles supporting
//!   union ([`Region::or`]), subtraction ([`Region::sub`]), intersection
//!   ([`Region::and`]), and area queries.
//!
//! Regions are normalized into horizontal bands of row-sorted rectangles, so
//! equality and area are well-defined regardless of how a region was built.
//!
//! Arithmetic ops return new values; `*_self` variants mutate in place.
//! Under `or` the area of a region is monotonically non-decreasing, and
//! under `sub` it is non-increasing.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod rect;
mod region;

pub use rect::RectI;
pub use region::Region;
