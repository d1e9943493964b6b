//! Parallel leaf selector: descends the shared tree from a root and collects
//! a batchlet of freshly reserved leaves for external evaluation. Sub-descents
//! with a large enough budget are handed to the worker pool; the caller
//! blocks at the batchlet boundary until every dispatched subtree drains.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{Annotator, PolicyScorer, ScoreRequest, SelectError, TranspositionRoots};
use crate::config::{SelectConfig, TranspositionMode};
use crate::distributor::{distribute_visits, visit_window};
use crate::evaluator::LeafEvaluator;
use crate::inflight::{backup_decrement_in_flight, SelectorId};
use crate::node::NodeHandle;
use crate::pool::{Countdown, WorkerPool};
use crate::store::{NodeIndex, NodeStore, PendingAction, Terminal};

// ---------------------------------------------------------------------------
// SelectStats
// ---------------------------------------------------------------------------

/// Counters for the most recent batchlet. Reset at the start of every call.
#[derive(Default)]
struct SelectStats {
    emitted: AtomicU64,
    collisions: AtomicU64,
    transposition_abandons: AtomicU64,
    master_swaps: AtomicU64,
    dispatched: AtomicU64,
}

impl SelectStats {
    fn reset(&self) {
        self.emitted.store(0, Ordering::Relaxed);
        self.collisions.store(0, Ordering::Relaxed);
        self.transposition_abandons.store(0, Ordering::Relaxed);
        self.master_swaps.store(0, Ordering::Relaxed);
        self.dispatched.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SelectStatsSnapshot {
        SelectStatsSnapshot {
            emitted: self.emitted.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
            transposition_abandons: self.transposition_abandons.load(Ordering::Relaxed),
            master_swaps: self.master_swaps.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectStatsSnapshot {
    /// Leaves appended to the batchlet.
    pub emitted: u64,
    /// Visits that landed on a leaf already claimed within this batchlet.
    pub collisions: u64,
    pub transposition_abandons: u64,
    pub master_swaps: u64,
    /// Sub-descents handed to the worker pool.
    pub dispatched: u64,
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The external contracts one selector instance runs against.
pub struct Collaborators {
    pub scorer: Arc<dyn PolicyScorer>,
    pub annotator: Arc<dyn Annotator>,
    pub transpositions: Arc<dyn TranspositionRoots>,
    pub pool: Arc<dyn WorkerPool>,
    pub evaluator: LeafEvaluator,
}

// ---------------------------------------------------------------------------
// LeafSelector
// ---------------------------------------------------------------------------

pub struct LeafSelector {
    shared: Arc<Shared>,
}

struct Shared {
    store: Arc<NodeStore>,
    config: SelectConfig,
    selector: SelectorId,
    scorer: Arc<dyn PolicyScorer>,
    annotator: Arc<dyn Annotator>,
    transpositions: Arc<dyn TranspositionRoots>,
    pool: Arc<dyn WorkerPool>,
    evaluator: LeafEvaluator,
    leaves: Mutex<Vec<NodeIndex>>,
    /// Every leaf commitment `(node, k)` of the current batchlet, emitted or
    /// silent. Replayed up the parent chains to unwind the whole call if it
    /// ends in an error.
    reservations: Mutex<Vec<(NodeIndex, u32)>>,
    pending: Countdown,
    error: Mutex<Option<SelectError>>,
    stats: SelectStats,
}

impl LeafSelector {
    /// The caller must hold `selector` exclusively for this instance's
    /// lifetime: the id partitions the in-flight counters.
    pub fn new(
        store: Arc<NodeStore>,
        config: SelectConfig,
        selector: SelectorId,
        collaborators: Collaborators,
    ) -> Result<Self, SelectError> {
        let config = config.validated()?;
        Ok(Self {
            shared: Arc::new(Shared {
                store,
                config,
                selector,
                scorer: collaborators.scorer,
                annotator: collaborators.annotator,
                transpositions: collaborators.transpositions,
                pool: collaborators.pool,
                evaluator: collaborators.evaluator,
                leaves: Mutex::new(Vec::new()),
                reservations: Mutex::new(Vec::new()),
                pending: Countdown::new(),
                error: Mutex::new(None),
                stats: SelectStats::default(),
            }),
        })
    }

    /// Collect leaves until `target_visits` reservations have been placed
    /// below `root`. Every returned leaf is freshly unvisited, terminal, or
    /// transposition-linked; transposition-abandon paths may leave the
    /// batchlet short of the target.
    pub fn select_new_leaf_batchlet(
        &self,
        root: NodeIndex,
        target_visits: u32,
        v_loss_dynamic_boost: f32,
    ) -> Result<Vec<NodeIndex>, SelectError> {
        let shared = &self.shared;
        shared.stats.reset();
        shared.reservations.lock().clear();
        {
            let mut leaves = shared.leaves.lock();
            leaves.clear();
            let hint = shared.config.leaf_capacity_hint(target_visits);
            if leaves.capacity() < hint {
                leaves.reserve(hint);
            }
        }

        if target_visits > 0 {
            gather(shared, root, target_visits, v_loss_dynamic_boost);
        }

        if shared.pool.supports_wait_done() {
            shared.pool.wait_done();
        } else {
            shared.pending.wait_done();
        }

        if let Some(err) = shared.error.lock().take() {
            // The caller never sees these leaves, so nothing would ever apply
            // or release them: unwind every reservation this call placed
            // before discarding the batchlet. Every ancestor's increment is
            // the sum of the leaf commitments routed through it, so replaying
            // the leaf log up the parent chains nets the whole call to zero.
            let log = std::mem::take(&mut *shared.reservations.lock());
            for (leaf, k) in log {
                backup_decrement_in_flight(&shared.store, Some(leaf), shared.selector, k);
            }
            shared.leaves.lock().clear();
            return Err(err);
        }
        shared.reservations.lock().clear();
        Ok(std::mem::take(&mut *shared.leaves.lock()))
    }

    /// Drop any accumulated leaves without emitting them.
    pub fn reset(&self) {
        self.shared.leaves.lock().clear();
        self.shared.reservations.lock().clear();
        self.shared.evaluator.reset();
    }

    pub fn shutdown(&self) {
        self.shared.pool.shutdown();
    }

    pub fn stats(&self) -> SelectStatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn reuse_hits(&self) -> u64 {
        self.shared.evaluator.hits()
    }

    pub fn reuse_misses(&self) -> u64 {
        self.shared.evaluator.misses()
    }
}

// ---------------------------------------------------------------------------
// gather — recursive descent
// ---------------------------------------------------------------------------

fn gather(shared: &Arc<Shared>, node_idx: NodeIndex, k: u32, v_loss_boost: f32) {
    debug_assert!(k > 0);
    let store = &*shared.store;
    let mode = shared.config.transposition_mode;
    let mut node_idx = node_idx;

    if mode != TranspositionMode::None {
        materialize_deferred(shared, node_idx);
    }

    {
        let rec = store.node(node_idx);
        let deferred = rec.transposition_extracted() == 1;
        if rec.n() == 0 || rec.terminal() != Terminal::Unknown || deferred {
            visit_leaf(shared, node_idx, k);
            return;
        }
    }

    if mode == TranspositionMode::SharedSubtree {
        match arbitrate_shared_subtree(shared, node_idx, k) {
            Arbitration::Continue => {}
            Arbitration::ContinueAt(master) => node_idx = master,
            Arbitration::EmitLeaf => {
                visit_leaf(shared, node_idx, k);
                return;
            }
            Arbitration::Abandoned => return,
        }
    }

    let handle = NodeHandle::new(store, node_idx);
    handle.ensure_annotated(&*shared.annotator);

    let rec = store.node(node_idx);
    if rec.num_policy_moves() == 0 {
        // Evaluated but no policy installed yet; nothing to descend into.
        visit_leaf(shared, node_idx, k);
        return;
    }

    let window = visit_window(handle, k);
    let req = ScoreRequest {
        node: handle,
        selector: shared.selector,
        depth: rec.depth(),
        v_loss_boost,
        cpuct_multiplier: shared.config.cpuct_multiplier,
    };
    let alloc = distribute_visits(&req, window, k, &*shared.scorer);

    // Descent committed: reserve here before fanning out so every ancestor
    // covers the reservations attributable to its subtree.
    rec.reserve_in_flight(shared.selector, k);

    for (i, &count) in alloc.counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        rec.note_child_visited(i);
        let child = match handle.child_at(i) {
            Some(existing) => existing.index(),
            None => handle.create_child(i).index(),
        };

        if shared.config.select_parallel_enabled
            && count >= shared.config.select_parallel_threshold
        {
            dispatch(shared, child, count, v_loss_boost);
        } else {
            gather(shared, child, count, v_loss_boost);
        }
    }
}

fn dispatch(shared: &Arc<Shared>, child: NodeIndex, count: u32, v_loss_boost: f32) {
    shared.stats.dispatched.fetch_add(1, Ordering::Relaxed);
    shared.pending.add(count as u64);
    let task_shared = Arc::clone(shared);
    shared.pool.queue(Box::new(move || {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            gather(&task_shared, child, count, v_loss_boost);
        }));
        if outcome.is_err() {
            log::warn!(
                "leaf-selection worker panicked on subtree {:?}; batchlet returns short",
                child
            );
            // The dispatching ancestors were reserved before fan-out; a
            // faulted subtree nets to zero like an abandon.
            let store = &*task_shared.store;
            backup_decrement_in_flight(
                store,
                store.node(child).parent(),
                task_shared.selector,
                count,
            );
        }
        task_shared.pending.signal(count as u64);
    }));
}

// ---------------------------------------------------------------------------
// visit_leaf
// ---------------------------------------------------------------------------

/// Reserve `k` visits on a leaf. The value observed before the reserve
/// decides emission: zero means this batchlet is the first claimant.
fn visit_leaf(shared: &Arc<Shared>, node_idx: NodeIndex, k: u32) {
    let store = &*shared.store;
    let rec = store.node(node_idx);

    let prior = rec.reserve_in_flight(shared.selector, k);
    shared.reservations.lock().push((node_idx, k));
    if prior != 0 {
        // Already claimed by an earlier sibling descent; the reservation
        // stands but the node is not re-emitted.
        shared.stats.collisions.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let handle = NodeHandle::new(store, node_idx);
    handle.ensure_annotated(&*shared.annotator);

    if shared.config.transposition_mode != TranspositionMode::None
        && rec.n() == 0
        && rec.terminal() == Terminal::Unknown
        && rec.transposition_extracted() == 0
    {
        if let Some(root) = shared.transpositions.lookup(rec.zobrist()) {
            if root != node_idx {
                rec.link_transposition(root);
            }
        }
    }

    match shared.evaluator.try_evaluate(handle) {
        Ok(Some(cached)) => rec.set_eval(cached.win_p, cached.loss_p, cached.m_position),
        Ok(None) => {}
        Err(err) => {
            // Leave the node uncommitted; its logged reservation is unwound
            // with the rest of the batchlet on the error return.
            let mut slot = shared.error.lock();
            if slot.is_none() {
                *slot = Some(err);
            }
            return;
        }
    }

    rec.set_pending_action(PendingAction::Apply);
    shared.leaves.lock().push(node_idx);
    shared.stats.emitted.fetch_add(1, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// Transposition handling
// ---------------------------------------------------------------------------

/// Second visit of a deferred node: copy the unexpanded child slots from its
/// transposition root. Pure structural copy, no evaluation.
fn materialize_deferred(shared: &Arc<Shared>, node_idx: NodeIndex) {
    let store = &*shared.store;
    let rec = store.node(node_idx);
    if rec.transposition_extracted() != 1 || rec.n() == 0 {
        return;
    }
    let Some(root_idx) = rec.transposition_root() else {
        return;
    };
    let src = store.children_of(root_idx);
    if src.is_empty() {
        // Root itself not expanded yet; stay deferred, emit as leaf again.
        return;
    }

    let _guard = rec.expand_lock().lock();
    if rec.transposition_extracted() != 1 {
        return;
    }
    debug_assert!(rec.children_start().is_none(), "deferred node already has children");

    let base = store.alloc_children(src.len() as u16);
    for (i, slot) in src.iter().enumerate() {
        store.child_slot(base, i).set_policy(slot.mv(), slot.prior());
    }
    rec.set_children(base, src.len() as u16);
    rec.mark_transposition_extracted();
}

enum Arbitration {
    Continue,
    /// Master swap done; descend through the (former) master instead.
    ContinueAt(NodeIndex),
    /// Borrowed value installed; this node is a leaf for this descent.
    EmitLeaf,
    /// Reservations above released; this branch contributes nothing.
    Abandoned,
}

/// SharedSubtree arbitration against the cluster master for this position.
fn arbitrate_shared_subtree(shared: &Arc<Shared>, node_idx: NodeIndex, k: u32) -> Arbitration {
    let store = &*shared.store;
    let rec = store.node(node_idx);
    if !rec.is_annotated() {
        return Arbitration::Continue;
    }
    let Some(master_idx) = shared.transpositions.lookup(rec.zobrist()) else {
        return Arbitration::Continue;
    };
    if master_idx == node_idx {
        return Arbitration::Continue;
    }

    let master = store.node(master_idx);
    let (m_n, n_n) = (master.n(), rec.n());

    if m_n < n_n {
        return Arbitration::Continue;
    }
    if m_n > n_n {
        let borrowed = (master.w() - rec.w()) / (m_n - n_n) as f64;
        rec.set_override_v(borrowed as f32);
        return Arbitration::EmitLeaf;
    }

    // Equal N. A busy master means its statistics are about to move; back
    // out rather than race it.
    if master.in_flight_total() > 0 {
        shared
            .stats
            .transposition_abandons
            .fetch_add(1, Ordering::Relaxed);
        backup_decrement_in_flight(store, rec.parent(), shared.selector, k);
        return Arbitration::Abandoned;
    }

    // Swapping needs a parent slot on both sides.
    if rec.parent().is_none() || master.parent().is_none() {
        return Arbitration::Continue;
    }

    master_swap(store, node_idx, master_idx);
    shared.stats.master_swaps.fetch_add(1, Ordering::Relaxed);
    Arbitration::ContinueAt(master_idx)
}

/// Exchange the tree positions of two transposition-equivalent nodes: each
/// old parent's child slot resolves to the other node afterwards.
fn master_swap(store: &NodeStore, a: NodeIndex, b: NodeIndex) {
    let a_rec = store.node(a);
    let b_rec = store.node(b);
    let a_parent = a_rec.parent();
    let b_parent = b_rec.parent();
    debug_assert!(a_parent.is_some() && b_parent.is_some());

    if a_parent == b_parent {
        // Siblings: exchange the two slot pointers directly; the sequential
        // relink pair would see the first rewrite and undo itself.
        let slots = store.children_of(a_parent.unwrap());
        let sa = slots.iter().find(|s| s.child() == Some(a));
        let sb = slots.iter().find(|s| s.child() == Some(b));
        if let (Some(sa), Some(sb)) = (sa, sb) {
            sa.relink(b);
            sb.relink(a);
        }
        return;
    }

    store.modify_parents_child_ref(a, b);
    store.modify_parents_child_ref(b, a);
    a_rec.set_parent(b_parent);
    b_rec.set_parent(a_parent);

    let (a_depth, b_depth) = (a_rec.depth(), b_rec.depth());
    a_rec.set_depth(b_depth);
    b_rec.set_depth(a_depth);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
