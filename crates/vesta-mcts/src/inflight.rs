//! Virtual-loss accounting: per-selector pending-visit counters and the
//! upward release walk used when a descent abandons its reservations.

use crate::store::{NodeIndex, NodeStore};

// ---------------------------------------------------------------------------
// SelectorId
// ---------------------------------------------------------------------------

/// Identity of one concurrent descent stream. At most two batchlets may be in
/// flight at once; each owns one id exclusively for the duration of its call,
/// which partitions the `NInFlight` counters so the two cannot corrupt each
/// other's accounting.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SelectorId(u8);

impl SelectorId {
    pub const ZERO: SelectorId = SelectorId(0);
    pub const ONE: SelectorId = SelectorId(1);

    /// Index into per-node counter arrays. Kept as an array index rather than
    /// branching on the id so a wider selector set stays a one-line change.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// Upward release
// ---------------------------------------------------------------------------

/// Undo `k` reservations on every node from `from` up to the root, inclusive.
///
/// A descent reserves incrementally on the way down; when it aborts mid-way
/// (transposition abandon) it calls this with the parent of the abort point,
/// leaving the net in-flight change along the abandoned path at zero.
pub fn backup_decrement_in_flight(
    store: &NodeStore,
    from: Option<NodeIndex>,
    selector: SelectorId,
    k: u32,
) {
    let mut cur = from;
    while let Some(idx) = cur {
        let rec = store.node(idx);
        rec.release_in_flight(selector, k);
        cur = rec.parent();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
