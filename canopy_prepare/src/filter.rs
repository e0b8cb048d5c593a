// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filter and blur cache dirty propagation.
//!
//! A blur samples pixels outside its own bounds, so a filter whose extent
//! intersects this frame's dirty region cannot reuse its cached output: the
//! cache is provably stale and the filter's extent itself must be
//! invalidated. Filters over transparent surfaces additionally feed the
//! hardware-composition cascade, because a stale blur over a hardware
//! overlay would composite wrong pixels.

use hashbrown::HashMap;

use canopy_dirty::{DirtyCause, DirtyRegionManager, FilterDirtyInfo};
use canopy_region::RectI;

/// What the draw stage should do with a filter node's cached output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FilterCacheAction {
    /// Cache is still valid; reuse it.
    #[default]
    Preserve,
    /// Cache is stale; recompute from scratch.
    ForceClear,
}

/// A filter region over a transparent surface, consumed by the hardware
/// eligibility cascade.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TransparentFilter {
    /// Packed id of the owning surface.
    pub surface: u64,
    /// Pre-order z value of the filter node.
    pub z_order_for_filter: u32,
    /// Absolute extent of the filter on the display.
    pub rect: RectI,
}

/// Per-pass filter bookkeeping for one display.
#[derive(Clone, Debug, Default)]
pub struct FilterTracker {
    /// Filters over transparent surfaces with no dirty content below them.
    /// They keep overlay surfaces below alive but still veto new overlap.
    pub clean_filters: Vec<TransparentFilter>,
    /// Filters over transparent surfaces whose content is stale; any
    /// overlay surface they cover must leave the hardware path.
    pub dirty_filters: Vec<TransparentFilter>,
    /// Cache decision per filter node.
    pub cache_actions: HashMap<u64, FilterCacheAction>,
    /// Purge every cache this pass regardless of dirty intersection, e.g.
    /// after a rotation or accessibility configuration change.
    pub purge_all: bool,
}

impl FilterTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets for a new display pass, keeping the purge request.
    pub fn begin_display(&mut self) {
        self.clean_filters.clear();
        self.dirty_filters.clear();
    }
}

/// Examines one filter-bearing node against the active dirty region.
///
/// When the filter's extent intersects the dirty accumulated so far, its
/// cache is force-cleared and its extent merged into the dirty region (the
/// stale blur repaints). Otherwise the cache is preserved unless a global
/// purge is pending. The record is also queued on the manager for the
/// deferred merge that runs once display-wide dirty totals are known.
pub fn collect_filter_info_and_update_dirty(
    node: u64,
    filter_rect: RectI,
    dirty_manager: &mut DirtyRegionManager,
    tracker: &mut FilterTracker,
    surface: Option<u64>,
    surface_transparent: bool,
    z_order_for_filter: u32,
) {
    if filter_rect.is_empty() {
        return;
    }
    let below_dirty = dirty_manager.current_frame_dirty().intersects(&filter_rect);

    let action = if below_dirty || tracker.purge_all {
        FilterCacheAction::ForceClear
    } else {
        FilterCacheAction::Preserve
    };
    tracker.cache_actions.insert(node, action);

    if below_dirty {
        dirty_manager.merge_dirty_rect_with_cause(&filter_rect, DirtyCause::Filter);
    }

    if surface_transparent && let Some(surface) = surface {
        let record = TransparentFilter {
            surface,
            z_order_for_filter,
            rect: filter_rect,
        };
        if below_dirty {
            tracker.dirty_filters.push(record);
        } else {
            tracker.clean_filters.push(record);
        }
    }

    dirty_manager.filter_collector_mut().push(FilterDirtyInfo {
        node,
        filter_rect,
        below_dirty,
        background_clean: surface_transparent && !below_dirty,
    });
}

/// Deferred filter merge, run during the global pass.
///
/// Filters that did not see dirty content below them during the walk may
/// still be invalidated by display-wide dirty that accumulated afterwards;
/// those merge their extent into the surface's manager now. Returns the
/// records whose cache decision flipped to force-clear so the caller can
/// fold their extents into the display totals for this frame.
pub fn check_merge_filter_dirty_with_pre_dirty(
    dirty_manager: &mut DirtyRegionManager,
    display_dirty: RectI,
    tracker: &mut FilterTracker,
) -> Vec<FilterDirtyInfo> {
    let mut flipped = Vec::new();
    for record in dirty_manager.filter_collector_mut().take() {
        if record.below_dirty {
            continue;
        }
        if display_dirty.intersects(&record.filter_rect) {
            dirty_manager.merge_dirty_rect_after_history(&record.filter_rect);
            tracker
                .cache_actions
                .insert(record.node, FilterCacheAction::ForceClear);
            flipped.push(record);
        }
    }
    flipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> DirtyRegionManager {
        let mut m = DirtyRegionManager::new();
        m.set_surface_rect(RectI::new(0, 0, 1000, 1000));
        m
    }

    #[test]
    fn intersecting_filter_force_clears_and_merges() {
        let mut dm = manager();
        let mut tracker = FilterTracker::new();
        dm.merge_dirty_rect(&RectI::new(0, 0, 50, 50));

        collect_filter_info_and_update_dirty(
            1,
            RectI::new(40, 40, 120, 120),
            &mut dm,
            &mut tracker,
            None,
            false,
            0,
        );
        assert_eq!(
            tracker.cache_actions.get(&1),
            Some(&FilterCacheAction::ForceClear)
        );
        assert!(dm.current_frame_dirty().contains(&RectI::new(40, 40, 120, 120)));
    }

    #[test]
    fn clean_filter_preserves_cache() {
        let mut dm = manager();
        let mut tracker = FilterTracker::new();
        dm.merge_dirty_rect(&RectI::new(0, 0, 10, 10));

        collect_filter_info_and_update_dirty(
            2,
            RectI::new(500, 500, 600, 600),
            &mut dm,
            &mut tracker,
            None,
            false,
            0,
        );
        assert_eq!(
            tracker.cache_actions.get(&2),
            Some(&FilterCacheAction::Preserve)
        );
        assert_eq!(dm.current_frame_dirty(), RectI::new(0, 0, 10, 10));
    }

    #[test]
    fn purge_all_overrides_preserve() {
        let mut dm = manager();
        let mut tracker = FilterTracker::new();
        tracker.purge_all = true;

        collect_filter_info_and_update_dirty(
            3,
            RectI::new(500, 500, 600, 600),
            &mut dm,
            &mut tracker,
            None,
            false,
            0,
        );
        assert_eq!(
            tracker.cache_actions.get(&3),
            Some(&FilterCacheAction::ForceClear)
        );
        // The extent itself is not dirty; only the cache is purged.
        assert!(!dm.is_current_frame_dirty());
    }

    #[test]
    fn transparent_surface_filters_are_classified() {
        let mut dm = manager();
        let mut tracker = FilterTracker::new();
        dm.merge_dirty_rect(&RectI::new(0, 0, 50, 50));

        collect_filter_info_and_update_dirty(
            4,
            RectI::new(0, 0, 60, 60),
            &mut dm,
            &mut tracker,
            Some(100),
            true,
            7,
        );
        collect_filter_info_and_update_dirty(
            5,
            RectI::new(800, 800, 900, 900),
            &mut dm,
            &mut tracker,
            Some(100),
            true,
            8,
        );
        assert_eq!(tracker.dirty_filters.len(), 1);
        assert_eq!(tracker.dirty_filters[0].z_order_for_filter, 7);
        assert_eq!(tracker.clean_filters.len(), 1);
        assert_eq!(tracker.clean_filters[0].rect, RectI::new(800, 800, 900, 900));
    }

    #[test]
    fn deferred_merge_flips_clean_filters() {
        let mut dm = manager();
        let mut tracker = FilterTracker::new();

        collect_filter_info_and_update_dirty(
            6,
            RectI::new(100, 100, 200, 200),
            &mut dm,
            &mut tracker,
            None,
            false,
            0,
        );
        assert!(dm.set_buffer_age(1));
        dm.update_dirty();

        let flipped = check_merge_filter_dirty_with_pre_dirty(
            &mut dm,
            RectI::new(150, 150, 400, 400),
            &mut tracker,
        );
        assert_eq!(flipped.len(), 1);
        assert_eq!(flipped[0].node, 6);
        assert_eq!(flipped[0].filter_rect, RectI::new(100, 100, 200, 200));
        assert!(dm.dirty_region().contains(&RectI::new(100, 100, 200, 200)));
        assert!(dm.filter_collector().is_empty());
    }

    #[test]
    fn deferred_merge_ignores_disjoint_filters() {
        let mut dm = manager();
        let mut tracker = FilterTracker::new();
        collect_filter_info_and_update_dirty(
            7,
            RectI::new(100, 100, 200, 200),
            &mut dm,
            &mut tracker,
            None,
            false,
            0,
        );
        let flipped = check_merge_filter_dirty_with_pre_dirty(
            &mut dm,
            RectI::new(500, 500, 600, 600),
            &mut tracker,
        );
        assert!(flipped.is_empty());
        assert_eq!(
            tracker.cache_actions.get(&7),
            Some(&FilterCacheAction::Preserve)
        );
    }
}
