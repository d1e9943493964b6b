//! Contracts consumed from the surrounding search. The selector calls these
//! and trusts their output; none of them are implemented by the core beyond
//! a reference transposition-roots map used by the embedding search and the
//! tests.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::inflight::SelectorId;
use crate::node::NodeHandle;
use crate::store::NodeIndex;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SelectError {
    #[error("invalid config: {msg}")]
    InvalidConfig { msg: &'static str },

    /// The reuse-other-tree evaluator probed a tree built by a different
    /// network definition. Raised once, at the first mismatching probe.
    #[error("reuse evaluator network mismatch: ours={ours}, theirs={theirs}")]
    IncompatibleReuse { ours: String, theirs: String },
}

// ---------------------------------------------------------------------------
// Annotator
// ---------------------------------------------------------------------------

/// Populates derived position metadata (position fingerprint, terminal
/// status, whatever else the embedding search derives) on first visit.
/// Must be idempotent.
pub trait Annotator: Send + Sync {
    fn annotate(&self, node: NodeHandle<'_>);
}

/// Annotator for trees whose metadata is filled in by the caller up front.
pub struct NullAnnotator;

impl Annotator for NullAnnotator {
    fn annotate(&self, _node: NodeHandle<'_>) {}
}

// ---------------------------------------------------------------------------
// PolicyScorer
// ---------------------------------------------------------------------------

/// Inputs the scorer sees for one distribution pass over a node's children.
pub struct ScoreRequest<'a> {
    pub node: NodeHandle<'a>,
    pub selector: SelectorId,
    pub depth: u16,
    pub v_loss_boost: f32,
    pub cpuct_multiplier: f32,
}

/// The pluggable PUCT formula. The selector only relies on the ordering of
/// the returned scores, never on their scale.
///
/// `pending_visits` is the number of visits the distributor has already
/// tallied on this child within the current pass; the scorer folds it into
/// the virtual-loss penalty so consecutive picks diverge.
pub trait PolicyScorer: Send + Sync {
    fn child_score(&self, req: &ScoreRequest<'_>, child: usize, pending_visits: u32) -> f32;
}

// ---------------------------------------------------------------------------
// Transposition roots
// ---------------------------------------------------------------------------

/// Read-only view of the `ZobristHash -> node index` map maintained by the
/// surrounding search. The maintainer keeps each entry pointing at the
/// cluster member with maximum `N` (the master).
pub trait TranspositionRoots: Send + Sync {
    fn lookup(&self, zobrist: u64) -> Option<NodeIndex>;
}

/// Map that never reports a transposition. Default for searches that run
/// with transpositions disabled.
pub struct NoTranspositions;

impl TranspositionRoots for NoTranspositions {
    fn lookup(&self, _zobrist: u64) -> Option<NodeIndex> {
        None
    }
}

/// Reference implementation backed by an `FxHashMap`. Writes happen on the
/// surrounding search's apply path; the selector only reads.
pub struct TranspositionTable {
    map: RwLock<FxHashMap<u64, NodeIndex>>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn insert(&self, zobrist: u64, idx: NodeIndex) {
        self.map.write().insert(zobrist, idx);
    }

    pub fn remove(&self, zobrist: u64) {
        self.map.write().remove(&zobrist);
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    pub fn clear(&self) {
        self.map.write().clear();
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TranspositionRoots for TranspositionTable {
    fn lookup(&self, zobrist: u64) -> Option<NodeIndex> {
        self.map.read().get(&zobrist).copied()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
