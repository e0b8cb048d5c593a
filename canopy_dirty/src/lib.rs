// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Dirty: per-surface and per-screen dirty region accumulation.
//!
//! Each surface-class node and each screen owns a [`DirtyRegionManager`]: a
//! mutable accumulator of the rectangles that changed this frame and must be
//! redrawn. Merging is union-only between [`DirtyRegionManager::clear`]
//! calls, so the accumulated region never shrinks within a frame. The
//! manager also keeps a short history of previous frames' dirty rects so a
//! swapchain buffer of age `n` can be repaired by merging the last `n`
//! frames.
//!
//! Merges carry a [`DirtyCause`] so debug overlays can show why a rect was
//! invalidated; cause records never influence the dirty computation itself.
//!
//! [`FilterDirtyCollector`] rides along with each manager and queues
//! filter-bearing nodes whose dirty contribution can only be resolved after
//! the whole tree has been visited.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod cause;
mod filter;
mod manager;

pub use cause::DirtyCause;
pub use filter::{FilterDirtyCollector, FilterDirtyInfo};
pub use manager::DirtyRegionManager;
