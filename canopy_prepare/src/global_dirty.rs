// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The post-walk global dirty pass.
//!
//! Runs after the recursive walk over the flattened main/leash surface
//! list, front to back. Cross-surface dirty effects depend on totals only
//! known once the whole tree has been visited: whether a surface's dirty
//! rect shows through a transparent surface above it, whether stacking or
//! position changed at the display level, and which deferred filters the
//! display-wide dirty finally reaches.

use tracing::{debug, error};

use canopy_dirty::{DirtyCause, DirtyRegionManager};
use canopy_region::{RectI, Region};
use canopy_scene::{NodeId, SceneGraph};

use crate::config::PrepareConfig;
use crate::filter::{check_merge_filter_dirty_with_pre_dirty, FilterTracker};

/// Result of the global pass for one display.
#[derive(Clone, Debug, Default)]
pub struct GlobalDirty {
    /// Everything that must repaint on the display this frame.
    pub region: Region,
    /// The display-level dirty rect after history resolution.
    pub display_rect: RectI,
}

/// Finalizes cross-surface dirty accounting for one display.
///
/// `surfaces` is the display's main/leash surface list in paint order
/// (back to front); the pass walks it front to back, assigning final
/// z-orders, promoting per-surface dirty through transparency, and
/// subtracting the opaque regions of surfaces in front from what lower
/// surfaces contribute.
pub fn update_surface_dirty_and_global_dirty(
    graph: &mut SceneGraph,
    surfaces: &[NodeId],
    display_dirty: &mut DirtyRegionManager,
    tracker: &mut FilterTracker,
    config: &PrepareConfig,
) -> GlobalDirty {
    let mut opaque_above = Region::new();
    let mut global = Region::new();
    let mut next_z = u32::try_from(surfaces.len()).unwrap_or(u32::MAX);

    for &id in surfaces.iter().rev() {
        // Front-to-back: z decreases toward the back of the paint order.
        next_z = next_z.saturating_sub(1);
        let Some(node) = graph.get_mut(id) else {
            error!(node = id.to_bits(), "surface vanished before the global pass");
            continue;
        };
        let shadow = node.properties.shadow;
        let Some(surface) = node.surface.as_mut() else {
            error!(node = id.to_bits(), "surface node without surface state");
            continue;
        };

        // Surface rect drift invalidates the whole surface; the manager's
        // history would repair against the wrong coordinate space.
        if surface.dirty.surface_rect() != surface.abs_rect {
            surface.dirty.set_surface_rect(surface.abs_rect);
            surface.dirty.reset_dirty_as_surface_size();
        }
        surface.dirty.clip_dirty_rect_within_surface();
        let surface_dirty = surface.dirty.current_frame_dirty();

        // Stacking change repaints the whole surface on the display.
        surface.hwc.global_z_order = next_z;
        if surface.last_frame_z_order != next_z {
            let rect = surface.last_frame_abs_rect.union(&surface.abs_rect);
            display_dirty.merge_dirty_rect_with_cause(&rect, DirtyCause::ZOrderChange);
            surface.last_frame_z_order = next_z;
        }

        // Position change at display level.
        if surface.last_frame_abs_rect != surface.abs_rect {
            let rect = surface.last_frame_abs_rect.union(&surface.abs_rect);
            display_dirty.merge_dirty_rect_with_cause(&rect, DirtyCause::PositionChange);
            surface.last_frame_abs_rect = surface.abs_rect;
        }

        // Dirty under a transparent part of the surface shows through and
        // must repaint on the display, not just inside the surface.
        if !surface.transparent_region.is_empty() && !surface_dirty.is_empty() {
            let through = surface
                .transparent_region
                .and(&Region::from_rect(surface_dirty));
            for rect in through.iter_rects() {
                display_dirty.merge_dirty_rect_with_cause(&rect, DirtyCause::Transparent);
            }
        }

        // A shadow repaints with its caster, past the surface bounds.
        if let Some(shadow) = shadow
            && !surface_dirty.is_empty()
        {
            #[expect(clippy::cast_possible_truncation, reason = "shadow radii fit in i32")]
            let reach = (shadow.radius.ceil() as i32)
                .max(shadow.offset_x.abs().ceil() as i32)
                .max(shadow.offset_y.abs().ceil() as i32);
            let rect = surface.abs_rect.outset(reach, reach);
            display_dirty.merge_dirty_rect_with_cause(&rect, DirtyCause::Shadow);
        }

        // What this surface contributes globally is its dirty minus the
        // opaque content of surfaces in front of it.
        let visible_dirty = Region::from_rect(surface_dirty).sub(&opaque_above);
        global.or_self(&visible_dirty);

        opaque_above.or_self(&surface.opaque_region);

        debug!(
            surface = surface.name.as_str(),
            dirty = ?surface_dirty,
            z = next_z,
            "surface dirty finalized"
        );
    }

    // Display-wide dirty is now final enough for the deferred filter merge.
    // Flipped filters repaint this frame, so their extents fold into the
    // display totals before history resolution, not just into the surface
    // managers.
    let display_rect_so_far = display_dirty.current_frame_dirty();
    for &id in surfaces {
        let Some(surface) = graph.get_mut(id).and_then(|n| n.surface.as_mut()) else {
            continue;
        };
        for record in check_merge_filter_dirty_with_pre_dirty(
            &mut surface.dirty,
            display_rect_so_far,
            tracker,
        ) {
            display_dirty.merge_dirty_rect_with_cause(&record.filter_rect, DirtyCause::Filter);
            global.or_rect(&record.filter_rect);
        }
        // Per-surface history advances every frame so buffer-age repair
        // works at surface level as well as display level.
        surface.dirty.update_dirty();
    }

    if config.dirty_align_enabled {
        display_dirty.set_aligned(true, config.dirty_align_size, config.dirty_align_size);
    }
    display_dirty.clip_dirty_rect_within_surface();
    display_dirty.update_dirty();

    let display_rect = display_dirty.dirty_region();
    global.or_rect(&display_rect);
    GlobalDirty {
        region: global,
        display_rect,
    }
}
