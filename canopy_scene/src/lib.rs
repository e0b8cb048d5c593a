// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Scene: the retained scene graph the prepare pass walks.
//!
//! The graph is an arena of nodes addressed by generational [`NodeId`]
//! handles, with explicit parent indices instead of owning back-references.
//! Node kinds form a closed set ([`NodeKind`]); per-kind state lives in
//! optional payloads on the node ([`SurfaceState`], [`DisplayState`],
//! [`ScreenState`]) so the walker can `match` on kind and borrow exactly the
//! state it needs.
//!
//! Every node carries:
//!
//! - [`NodeProperties`]: bounds, local transform, alpha, clip flags,
//!   corner radius, background and filter attributes.
//! - [`FrameCache`]: the previous frame's absolute matrix, absolute rect,
//!   dirty rect, and clip rect, the diff base for incremental dirty
//!   computation.
//!
//! Surface nodes additionally own their [`DirtyRegionManager`], occlusion
//! regions, special-layer flags ([`SpecialLayerManager`]), and the
//! hardware-composition bookkeeping ([`HwcRecorder`],
//! [`HwcDisabledReasonCollection`]).
//!
//! This crate is `no_std` and uses `alloc`.
//!
//! [`DirtyRegionManager`]: canopy_dirty::DirtyRegionManager

#![no_std]

extern crate alloc;

mod graph;
mod hwc;
mod id;
mod node;
mod properties;
mod screen;
mod special;
mod surface;

pub use graph::SceneGraph;
pub use hwc::{HwcDisabledReason, HwcDisabledReasonCollection, HwcRecorder};
pub use id::NodeId;
pub use node::{FrameCache, Node, NodeKind};
pub use properties::{NodeProperties, ShadowParams};
pub use screen::{DisplayState, ScreenInfo, ScreenRotation, ScreenState};
pub use special::{SpecialLayerFlags, SpecialLayerManager};
pub use surface::{BufferInfo, SurfaceState, SurfaceWindowType, VisibleLevel};
