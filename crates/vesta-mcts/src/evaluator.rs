//! Leaf evaluators that can satisfy an emitted leaf without a fresh network
//! call. Variants share the capability set `{try_evaluate, reset}` as a
//! tagged sum; statistics are per instance, aggregation is the caller's job.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::{SelectError, TranspositionRoots};
use crate::node::NodeHandle;
use crate::store::NodeStore;

// ---------------------------------------------------------------------------
// NetworkDef
// ---------------------------------------------------------------------------

/// Identity of the network a tree was built with. Trees evaluated by
/// different networks must never share cached outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkDef {
    pub id: u64,
    pub name: String,
}

/// Compatibility predicate over two network definitions.
pub fn compatible(ours: &NetworkDef, theirs: &NetworkDef) -> bool {
    ours.id == theirs.id
}

// ---------------------------------------------------------------------------
// CachedEval
// ---------------------------------------------------------------------------

/// A previously computed evaluation borrowed for a new leaf.
#[derive(Clone, Copy, Debug)]
pub struct CachedEval {
    pub win_p: f32,
    pub loss_p: f32,
    pub m_position: f32,
}

// ---------------------------------------------------------------------------
// LeafEvaluator — tagged sum
// ---------------------------------------------------------------------------

pub enum LeafEvaluator {
    /// Every leaf goes to the external network evaluator.
    Deferred,
    /// Probe another search tree for an identical position first.
    ReuseOtherTree(ReuseOtherTree),
}

impl LeafEvaluator {
    /// Attempt to satisfy `node` from cached state. `Ok(None)` means the
    /// leaf still needs a network evaluation.
    pub fn try_evaluate(&self, node: NodeHandle<'_>) -> Result<Option<CachedEval>, SelectError> {
        match self {
            LeafEvaluator::Deferred => Ok(None),
            LeafEvaluator::ReuseOtherTree(reuse) => reuse.try_evaluate(node),
        }
    }

    /// Clear per-search state. Callers wanting totals read the counters
    /// before resetting.
    pub fn reset(&self) {
        if let LeafEvaluator::ReuseOtherTree(reuse) = self {
            reuse.reset();
        }
    }

    pub fn hits(&self) -> u64 {
        match self {
            LeafEvaluator::Deferred => 0,
            LeafEvaluator::ReuseOtherTree(reuse) => reuse.hits(),
        }
    }

    pub fn misses(&self) -> u64 {
        match self {
            LeafEvaluator::Deferred => 0,
            LeafEvaluator::ReuseOtherTree(reuse) => reuse.misses(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReuseOtherTree
// ---------------------------------------------------------------------------

/// Borrows evaluations from a second tree (typically the opponent's) when it
/// already holds an evaluated node for the same position fingerprint.
pub struct ReuseOtherTree {
    other_store: Arc<NodeStore>,
    other_roots: Arc<dyn TranspositionRoots>,
    ours: NetworkDef,
    theirs: NetworkDef,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ReuseOtherTree {
    pub fn new(
        other_store: Arc<NodeStore>,
        other_roots: Arc<dyn TranspositionRoots>,
        ours: NetworkDef,
        theirs: NetworkDef,
    ) -> Self {
        Self {
            other_store,
            other_roots,
            ours,
            theirs,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn try_evaluate(&self, node: NodeHandle<'_>) -> Result<Option<CachedEval>, SelectError> {
        if !compatible(&self.ours, &self.theirs) {
            return Err(SelectError::IncompatibleReuse {
                ours: self.ours.name.clone(),
                theirs: self.theirs.name.clone(),
            });
        }

        let Some(other_idx) = self.other_roots.lookup(node.zobrist()) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let other = self.other_store.node(other_idx);
        if other.n() == 0 {
            // Present but never evaluated; nothing to borrow.
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(CachedEval {
            win_p: other.win_p(),
            loss_p: other.loss_p(),
            m_position: other.m_position(),
        }))
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
