// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-frame pipeline state owned by the orchestrator.

use hashbrown::{HashMap, HashSet};

use canopy_scene::{NodeId, VisibleLevel};

/// State that outlives a single prepare pass.
///
/// Owned by the frame orchestrator and passed into every
/// [`PrepareVisitor`](crate::PrepareVisitor) by mutable reference, so
/// frame-over-frame edge detection (power, curtain, luminance, rotation,
/// visibility) is explicit and testable rather than hidden in globals.
#[derive(Clone, Debug, Default)]
pub struct PipelineFrameState {
    /// Visibility levels reported to the window manager last frame, keyed
    /// by packed surface id.
    last_visible: HashMap<u64, VisibleLevel>,
    /// Whether any display was mid-rotation last frame.
    pub last_frame_rotating: bool,
    /// Surfaces excluded from specific virtual screens, keyed by screen id.
    pub black_lists: HashMap<u64, HashSet<u64>>,
    /// Surfaces exclusively included on specific virtual screens.
    pub white_lists: HashMap<u64, HashSet<u64>>,
    /// Accessibility configuration generation observed last frame; a bump
    /// purges filter caches.
    pub accessibility_generation: u64,
    screen_power: HashMap<u64, bool>,
    screen_curtain: HashMap<u64, bool>,
    screen_luminance: HashMap<u64, u32>,
    /// Cross-display nodes whose visited flag must be cleared next cycle.
    pub(crate) visited_cross_nodes: Vec<NodeId>,
}

impl PipelineFrameState {
    /// Creates an empty state; the first frame sees every edge as changed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records this frame's power state for a screen and returns whether it
    /// changed since the last observation.
    pub fn power_edge(&mut self, screen: u64, power_on: bool) -> bool {
        self.screen_power.insert(screen, power_on) != Some(power_on)
    }

    /// Records this frame's privacy-curtain state and returns whether it
    /// changed.
    pub fn curtain_edge(&mut self, screen: u64, curtain_on: bool) -> bool {
        self.screen_curtain.insert(screen, curtain_on) != Some(curtain_on)
    }

    /// Records this frame's luminance level and returns whether it changed.
    pub fn luminance_edge(&mut self, screen: u64, luminance: u32) -> bool {
        self.screen_luminance.insert(screen, luminance) != Some(luminance)
    }

    /// Observes this frame's accessibility generation; returns true when it
    /// moved.
    pub fn accessibility_edge(&mut self, generation: u64) -> bool {
        let changed = self.accessibility_generation != generation;
        self.accessibility_generation = generation;
        changed
    }

    /// Returns true when `surface` is black-listed on `screen`.
    #[must_use]
    pub fn is_black_listed(&self, screen: u64, surface: u64) -> bool {
        self.black_lists
            .get(&screen)
            .is_some_and(|set| set.contains(&surface))
    }

    /// Returns true when `screen` has a white list that excludes `surface`.
    #[must_use]
    pub fn is_excluded_by_white_list(&self, screen: u64, surface: u64) -> bool {
        self.white_lists
            .get(&screen)
            .is_some_and(|set| !set.is_empty() && !set.contains(&surface))
    }

    /// Diffs this frame's visibility levels against the last reported set.
    ///
    /// Returns only the surfaces whose level changed (including surfaces
    /// that disappeared, reported as [`VisibleLevel::Invisible`]) and
    /// stores the new set as the next diff base.
    pub fn visible_diff(&mut self, current: &[(u64, VisibleLevel)]) -> Vec<(u64, VisibleLevel)> {
        let mut changes = Vec::new();
        for &(id, level) in current {
            if self.last_visible.get(&id).copied().unwrap_or_default() != level {
                changes.push((id, level));
            }
        }
        for (&id, _) in &self.last_visible {
            if !current.iter().any(|&(cur, _)| cur == id) {
                changes.push((id, VisibleLevel::Invisible));
            }
        }
        self.last_visible = current
            .iter()
            .filter(|&&(_, level)| level != VisibleLevel::Invisible)
            .copied()
            .collect();
        changes
    }
}
