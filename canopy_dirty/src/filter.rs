// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deferred filter dirty records.

use alloc::vec::Vec;

use canopy_region::RectI;

/// One filter-bearing node whose dirty contribution is resolved after the
/// tree walk.
///
/// `node` is the opaque packed id of the filter node in the scene graph; the
/// collector does not interpret it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FilterDirtyInfo {
    /// Packed id of the filter-bearing node.
    pub node: u64,
    /// The filter's absolute extent on its display.
    pub filter_rect: RectI,
    /// Whether dirty content below the filter was already observed when the
    /// record was made. Such filters must invalidate their cache regardless
    /// of what the global pass finds.
    pub below_dirty: bool,
    /// Whether the filter sits on a transparent background with no dirty
    /// content of its own; clean filters let hardware-composed surfaces
    /// below them stay on the overlay path.
    pub background_clean: bool,
}

/// Queue of [`FilterDirtyInfo`] records attached to one dirty manager.
///
/// Filled while the tree is walked, drained by the global dirty pass once
/// display-wide dirty totals are known.
#[derive(Clone, Debug, Default)]
pub struct FilterDirtyCollector {
    records: Vec<FilterDirtyInfo>,
}

impl FilterDirtyCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a record. Records with an empty filter rect are dropped.
    pub fn push(&mut self, info: FilterDirtyInfo) {
        if !info.filter_rect.is_empty() {
            self.records.push(info);
        }
    }

    /// The queued records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[FilterDirtyInfo] {
        &self.records
    }

    /// Returns true when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Removes and returns all queued records.
    pub fn take(&mut self) -> Vec<FilterDirtyInfo> {
        core::mem::take(&mut self.records)
    }

    /// Drops all queued records.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Marks every queued record as having dirty content below it.
    ///
    /// Used when a whole-surface invalidation arrives after records were
    /// queued, e.g. a zoom or rotation change.
    pub fn mark_all_below_dirty(&mut self) {
        for record in &mut self.records {
            record.below_dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(node: u64, rect: RectI) -> FilterDirtyInfo {
        FilterDirtyInfo {
            node,
            filter_rect: rect,
            below_dirty: false,
            background_clean: false,
        }
    }

    #[test]
    fn empty_rect_records_are_dropped() {
        let mut c = FilterDirtyCollector::new();
        c.push(info(1, RectI::ZERO));
        assert!(c.is_empty());
        c.push(info(2, RectI::new(0, 0, 10, 10)));
        assert_eq!(c.records().len(), 1);
    }

    #[test]
    fn take_drains_the_queue() {
        let mut c = FilterDirtyCollector::new();
        c.push(info(1, RectI::new(0, 0, 10, 10)));
        c.push(info(2, RectI::new(20, 20, 30, 30)));
        let taken = c.take();
        assert_eq!(taken.len(), 2);
        assert!(c.is_empty());
    }

    #[test]
    fn mark_all_below_dirty_flips_every_record() {
        let mut c = FilterDirtyCollector::new();
        c.push(info(1, RectI::new(0, 0, 10, 10)));
        c.push(FilterDirtyInfo {
            below_dirty: true,
            ..info(2, RectI::new(5, 5, 15, 15))
        });
        c.mark_all_below_dirty();
        assert!(c.records().iter().all(|r| r.below_dirty));
    }
}
