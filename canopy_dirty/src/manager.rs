// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-surface dirty rectangle accumulator.

use alloc::vec::Vec;

use canopy_region::RectI;

use crate::cause::DirtyCause;
use crate::filter::FilterDirtyCollector;

/// How many previous frames' dirty rects are retained for buffer-age repair.
const HISTORY_CAPACITY: usize = 4;

/// Default grid for aligned dirty expansion.
const DEFAULT_ALIGNMENT: i32 = 32;

/// Accumulates the current frame's dirty rectangle for one surface or screen.
///
/// Between [`clear`](Self::clear) and the next frame boundary all merges are
/// union-only: the accumulated rect never shrinks except through the
/// explicit clipping operations ([`intersect_dirty_rect`],
/// [`clip_dirty_rect_within_surface`]).
///
/// After the tree walk, [`update_dirty`](Self::update_dirty) pushes the
/// frame's rect into a small history ring and resolves the region a
/// swapchain buffer of the configured age must repair.
///
/// [`intersect_dirty_rect`]: Self::intersect_dirty_rect
/// [`clip_dirty_rect_within_surface`]: Self::clip_dirty_rect_within_surface
#[derive(Clone, Debug, Default)]
pub struct DirtyRegionManager {
    surface_rect: RectI,
    current_frame: RectI,
    /// Dirty region after history merge; what the renderer actually repairs.
    merged: RectI,
    history: [RectI; HISTORY_CAPACITY],
    history_head: usize,
    history_len: usize,
    buffer_age: usize,
    aligned: bool,
    align_x: i32,
    align_y: i32,
    track_causes: bool,
    cause_records: Vec<(DirtyCause, RectI)>,
    filters: FilterDirtyCollector,
}

impl DirtyRegionManager {
    /// Creates a manager with an empty surface rect and history.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_age: 1,
            align_x: DEFAULT_ALIGNMENT,
            align_y: DEFAULT_ALIGNMENT,
            ..Self::default()
        }
    }

    /// The rectangle all dirty state is clipped against.
    #[must_use]
    pub fn surface_rect(&self) -> RectI {
        self.surface_rect
    }

    /// Sets the owning surface's rectangle in its own coordinate space.
    pub fn set_surface_rect(&mut self, rect: RectI) {
        self.surface_rect = rect;
    }

    /// Resets the current frame's accumulator and cause records.
    ///
    /// History survives so buffer-age repair keeps working across frames.
    pub fn clear(&mut self) {
        self.current_frame = RectI::ZERO;
        self.merged = RectI::ZERO;
        self.cause_records.clear();
        self.filters.clear();
    }

    /// Unions `rect` into the current frame's dirty rect.
    ///
    /// Merging an empty rect is a no-op.
    pub fn merge_dirty_rect(&mut self, rect: &RectI) {
        if rect.is_empty() {
            return;
        }
        self.current_frame = self.current_frame.union(rect);
    }

    /// Unions `rect` and records `cause` for debug visualization.
    pub fn merge_dirty_rect_with_cause(&mut self, rect: &RectI, cause: DirtyCause) {
        if rect.is_empty() {
            return;
        }
        self.merge_dirty_rect(rect);
        if self.track_causes {
            self.cause_records.push((cause, *rect));
        }
    }

    /// Unions `rect` into both the current frame and the already-resolved
    /// history merge. Used by passes that run after
    /// [`update_dirty`](Self::update_dirty) has resolved the frame.
    pub fn merge_dirty_rect_after_history(&mut self, rect: &RectI) {
        if rect.is_empty() {
            return;
        }
        self.current_frame = self.current_frame.union(rect);
        self.merged = self.merged.union(rect);
    }

    /// Clips the current frame's dirty rect to `rect`.
    pub fn intersect_dirty_rect(&mut self, rect: &RectI) {
        self.current_frame = self.current_frame.intersect(rect);
    }

    /// Clips the current frame's dirty rect to the surface rect.
    pub fn clip_dirty_rect_within_surface(&mut self) {
        self.current_frame = self.current_frame.intersect(&self.surface_rect);
    }

    /// Marks the whole surface dirty for this frame.
    pub fn reset_dirty_as_surface_size(&mut self) {
        self.current_frame = self.surface_rect;
    }

    /// The rect accumulated so far this frame.
    #[must_use]
    pub fn current_frame_dirty(&self) -> RectI {
        self.current_frame
    }

    /// Returns true when anything was merged this frame.
    #[must_use]
    pub fn is_current_frame_dirty(&self) -> bool {
        !self.current_frame.is_empty()
    }

    /// Sets the swapchain buffer age consumed by the next
    /// [`update_dirty`](Self::update_dirty).
    ///
    /// Returns false when the age cannot be served from history; the caller
    /// should then treat the whole surface as dirty, which
    /// [`update_dirty`](Self::update_dirty) also does on its own.
    pub fn set_buffer_age(&mut self, age: usize) -> bool {
        self.buffer_age = age;
        age != 0 && age <= HISTORY_CAPACITY
    }

    /// Enables aligned expansion of the frame dirty rect on the given grid.
    pub fn set_aligned(&mut self, enabled: bool, align_x: i32, align_y: i32) {
        self.aligned = enabled;
        if align_x > 0 && align_y > 0 {
            self.align_x = align_x;
            self.align_y = align_y;
        }
    }

    /// Enables or disables per-merge cause recording.
    pub fn set_cause_tracking(&mut self, enabled: bool) {
        self.track_causes = enabled;
        if !enabled {
            self.cause_records.clear();
        }
    }

    /// Cause records accumulated this frame, in merge order.
    #[must_use]
    pub fn cause_records(&self) -> &[(DirtyCause, RectI)] {
        &self.cause_records
    }

    /// The filter records queued against this manager for the deferred pass.
    #[must_use]
    pub fn filter_collector(&self) -> &FilterDirtyCollector {
        &self.filters
    }

    /// Mutable access to the filter record queue.
    pub fn filter_collector_mut(&mut self) -> &mut FilterDirtyCollector {
        &mut self.filters
    }

    /// Finalizes the frame: aligns the accumulated rect if enabled, pushes
    /// it into history, and resolves the region the current buffer must
    /// repair given the configured buffer age.
    ///
    /// An age of zero or beyond the history depth resolves to the full
    /// surface rect.
    pub fn update_dirty(&mut self) {
        if self.aligned {
            self.current_frame = self
                .current_frame
                .align_outward(self.align_x, self.align_y)
                .intersect(&self.surface_rect);
        }
        self.push_history(self.current_frame);
        self.merged = if self.buffer_age == 0 || self.buffer_age > self.history_len {
            self.surface_rect
        } else {
            let mut acc = RectI::ZERO;
            for age in 0..self.buffer_age {
                acc = acc.union(&self.history_at(age));
            }
            acc
        };
    }

    /// The region resolved by the last [`update_dirty`](Self::update_dirty).
    #[must_use]
    pub fn dirty_region(&self) -> RectI {
        self.merged
    }

    /// The dirty rect recorded `age` frames ago (0 = this frame); empty when
    /// the history does not reach that far back.
    #[must_use]
    pub fn history_at(&self, age: usize) -> RectI {
        if age >= self.history_len {
            return RectI::ZERO;
        }
        let idx = (self.history_head + HISTORY_CAPACITY - 1 - age) % HISTORY_CAPACITY;
        self.history[idx]
    }

    fn push_history(&mut self, rect: RectI) {
        self.history[self.history_head] = rect;
        self.history_head = (self.history_head + 1) % HISTORY_CAPACITY;
        self.history_len = (self.history_len + 1).min(HISTORY_CAPACITY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(width: i32, height: i32) -> DirtyRegionManager {
        let mut m = DirtyRegionManager::new();
        m.set_surface_rect(RectI::new(0, 0, width, height));
        m
    }

    #[test]
    fn merge_is_union_only() {
        let mut m = manager(1000, 1000);
        m.merge_dirty_rect(&RectI::new(0, 0, 100, 100));
        let after_first = m.current_frame_dirty();
        m.merge_dirty_rect(&RectI::new(50, 50, 60, 60));
        assert!(m.current_frame_dirty().contains(&after_first));
        m.merge_dirty_rect(&RectI::new(200, 200, 300, 300));
        assert_eq!(m.current_frame_dirty(), RectI::new(0, 0, 300, 300));
    }

    #[test]
    fn merge_empty_is_noop() {
        let mut m = manager(1000, 1000);
        m.merge_dirty_rect(&RectI::new(10, 10, 50, 50));
        let before = m.current_frame_dirty();
        m.merge_dirty_rect(&RectI::ZERO);
        m.merge_dirty_rect(&RectI::new(70, 70, 70, 90));
        assert_eq!(m.current_frame_dirty(), before);
    }

    #[test]
    fn clip_within_surface() {
        let mut m = manager(100, 100);
        m.merge_dirty_rect(&RectI::new(-50, -50, 150, 150));
        m.clip_dirty_rect_within_surface();
        assert_eq!(m.current_frame_dirty(), RectI::new(0, 0, 100, 100));
    }

    #[test]
    fn clear_resets_frame_but_keeps_history() {
        let mut m = manager(100, 100);
        m.merge_dirty_rect(&RectI::new(0, 0, 10, 10));
        assert!(m.set_buffer_age(1));
        m.update_dirty();
        m.clear();
        assert!(!m.is_current_frame_dirty());
        assert_eq!(m.history_at(0), RectI::new(0, 0, 10, 10));
    }

    #[test]
    fn buffer_age_merges_recent_history() {
        let mut m = manager(1000, 1000);
        assert!(m.set_buffer_age(2));

        m.merge_dirty_rect(&RectI::new(0, 0, 10, 10));
        m.update_dirty();
        m.clear();

        m.merge_dirty_rect(&RectI::new(100, 100, 200, 200));
        m.update_dirty();
        // Age 2 repairs this frame plus the previous one.
        assert_eq!(m.dirty_region(), RectI::new(0, 0, 200, 200));
    }

    #[test]
    fn invalid_buffer_age_resolves_full_surface() {
        let mut m = manager(640, 480);
        assert!(!m.set_buffer_age(0));
        m.merge_dirty_rect(&RectI::new(5, 5, 6, 6));
        m.update_dirty();
        assert_eq!(m.dirty_region(), RectI::new(0, 0, 640, 480));

        assert!(!m.set_buffer_age(HISTORY_CAPACITY + 1));
    }

    #[test]
    fn aligned_expansion_stays_within_surface() {
        let mut m = manager(100, 100);
        m.set_aligned(true, 32, 32);
        assert!(m.set_buffer_age(1));
        m.merge_dirty_rect(&RectI::new(33, 33, 40, 40));
        m.update_dirty();
        assert_eq!(m.dirty_region(), RectI::new(32, 32, 64, 64));

        m.clear();
        m.merge_dirty_rect(&RectI::new(90, 90, 99, 99));
        m.update_dirty();
        // Aligned rect would overhang the surface; it is clipped back.
        assert_eq!(m.dirty_region(), RectI::new(64, 64, 100, 100));
    }

    #[test]
    fn cause_records_only_when_enabled() {
        let mut m = manager(100, 100);
        m.merge_dirty_rect_with_cause(&RectI::new(0, 0, 10, 10), DirtyCause::Geometry);
        assert!(m.cause_records().is_empty());

        m.set_cause_tracking(true);
        m.merge_dirty_rect_with_cause(&RectI::new(0, 0, 10, 10), DirtyCause::Filter);
        assert_eq!(
            m.cause_records(),
            [(DirtyCause::Filter, RectI::new(0, 0, 10, 10))]
        );
    }

    #[test]
    fn merge_after_history_updates_resolved_region() {
        let mut m = manager(1000, 1000);
        assert!(m.set_buffer_age(1));
        m.merge_dirty_rect(&RectI::new(0, 0, 10, 10));
        m.update_dirty();
        m.merge_dirty_rect_after_history(&RectI::new(500, 500, 600, 600));
        assert!(m.dirty_region().contains(&RectI::new(500, 500, 600, 600)));
    }
}
