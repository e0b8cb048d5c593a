// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational node handles.

/// Identifier for a node in the scene graph.
///
/// A small, copyable handle of slot index plus generation counter. The
/// handle stays stable across frames but becomes invalid when the
/// underlying slot is reused:
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any `NodeId` pointing at it is stale.
/// - On reuse of a freed slot, the generation increments, so a stale handle
///   never aliases a different live node.
///
/// Use [`SceneGraph::is_alive`](crate::SceneGraph::is_alive) to check
/// liveness. [`to_bits`](Self::to_bits) packs the handle into a `u64` for
/// structures that store opaque ids, e.g. dirty-cause and
/// hardware-composition diagnostics.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    /// Packs the handle into a `u64` (slot in the low half, generation in
    /// the high half).
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        ((self.1 as u64) << 32) | self.0 as u64
    }

    /// Reconstructs a handle from [`to_bits`](Self::to_bits) output.
    ///
    /// The result may be stale; check it with
    /// [`SceneGraph::is_alive`](crate::SceneGraph::is_alive) before use.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "intentional unpacking of the two halves"
    )]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits as u32, (bits >> 32) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_roundtrip() {
        let id = NodeId::new(0xDEAD, 7);
        assert_eq!(NodeId::from_bits(id.to_bits()), id);
    }

    #[test]
    fn distinct_generations_pack_differently() {
        let a = NodeId::new(3, 1);
        let b = NodeId::new(3, 2);
        assert_ne!(a.to_bits(), b.to_bits());
    }
}
