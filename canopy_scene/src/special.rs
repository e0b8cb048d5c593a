// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Special-layer classification flags.

bitflags::bitflags! {
    /// Special-layer classification bits for a surface.
    ///
    /// The low bits mark the surface's own classification; the `HAS_*` bits
    /// aggregate the classifications present anywhere in a subtree or on a
    /// logical display.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SpecialLayerFlags: u16 {
        /// Content must not appear in screenshots or mirrored displays.
        const SECURITY = 1 << 0;
        /// DRM-protected content bound to a hardware path.
        const PROTECTED = 1 << 1;
        /// Excluded from capture of the owning display.
        const SKIP = 1 << 2;
        /// Excluded from ui-first snapshot capture only.
        const SNAPSHOT_SKIP = 1 << 3;

        /// Subtree contains a [`SECURITY`](Self::SECURITY) layer.
        const HAS_SECURITY = 1 << 8;
        /// Subtree contains a [`PROTECTED`](Self::PROTECTED) layer.
        const HAS_PROTECTED = 1 << 9;
        /// Subtree contains a [`SKIP`](Self::SKIP) layer.
        const HAS_SKIP = 1 << 10;
        /// Subtree contains a [`SNAPSHOT_SKIP`](Self::SNAPSHOT_SKIP) layer.
        const HAS_SNAPSHOT_SKIP = 1 << 11;
    }
}

impl SpecialLayerFlags {
    /// The own-classification bits.
    pub(crate) const OWN_MASK: Self = Self::SECURITY
        .union(Self::PROTECTED)
        .union(Self::SKIP)
        .union(Self::SNAPSHOT_SKIP);
}

/// Tracks special-layer classification for one surface or display.
///
/// A surface's own bits are set by the embedder and persist across frames;
/// the `HAS_*` aggregates are cleared at the start of every prepare pass
/// and rebuilt while surfaces are visited, each surface's own bits merging
/// upward into its logical display's aggregate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SpecialLayerManager {
    flags: SpecialLayerFlags,
}

impl SpecialLayerManager {
    /// An empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all bits, own classification included.
    pub fn reset(&mut self) {
        self.flags = SpecialLayerFlags::empty();
    }

    /// Clears the `HAS_*` aggregate bits for a new prepare pass; the own
    /// classification bits persist until the embedder changes them.
    pub fn clear_aggregates(&mut self) {
        self.flags &= SpecialLayerFlags::OWN_MASK;
    }

    /// Sets or clears an own-classification bit.
    pub fn set(&mut self, flag: SpecialLayerFlags, value: bool) {
        self.flags.set(flag & SpecialLayerFlags::OWN_MASK, value);
    }

    /// Returns true when the given bit (own or aggregate) is set.
    #[must_use]
    pub fn has(&self, flag: SpecialLayerFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Returns true when any own-classification bit is set.
    #[must_use]
    pub fn is_special(&self) -> bool {
        self.flags.intersects(SpecialLayerFlags::OWN_MASK)
    }

    /// Returns true when any aggregate bit is set.
    #[must_use]
    pub fn has_special_descendant(&self) -> bool {
        self.flags.intersects(
            SpecialLayerFlags::HAS_SECURITY
                | SpecialLayerFlags::HAS_PROTECTED
                | SpecialLayerFlags::HAS_SKIP
                | SpecialLayerFlags::HAS_SNAPSHOT_SKIP,
        )
    }

    /// Merges another manager's bits upward: its own bits and aggregate
    /// bits both land in this manager's aggregate.
    pub fn merge_from(&mut self, child: &Self) {
        let own = child.flags & SpecialLayerFlags::OWN_MASK;
        // Own bits shift into the aggregate range; aggregate bits carry over.
        self.flags |= SpecialLayerFlags::from_bits_truncate(own.bits() << 8);
        self.flags |= child.flags
            & (SpecialLayerFlags::HAS_SECURITY
                | SpecialLayerFlags::HAS_PROTECTED
                | SpecialLayerFlags::HAS_SKIP
                | SpecialLayerFlags::HAS_SNAPSHOT_SKIP);
    }

    /// Raw flag access for diagnostics.
    #[must_use]
    pub fn flags(&self) -> SpecialLayerFlags {
        self.flags
    }
}
