use std::sync::Arc;

use crate::backend::{Annotator, NoTranspositions, PolicyScorer, ScoreRequest};
use crate::config::{SelectConfig, TranspositionMode};
use crate::evaluator::LeafEvaluator;
use crate::inflight::SelectorId;
use crate::node::NodeHandle;
use crate::pool::InlinePool;
use crate::select::{Collaborators, LeafSelector};
use crate::store::NodeStore;

/// Reference PUCT shape: prior-weighted exploration over a value term, with
/// live and simulated virtual losses folded into the denominator.
pub(crate) struct PriorPuctScorer {
    pub cpuct: f32,
}

impl PolicyScorer for PriorPuctScorer {
    fn child_score(&self, req: &ScoreRequest<'_>, child: usize, pending_visits: u32) -> f32 {
        let node = req.node;
        let slot = node.child_slot(child);
        let (n, q, in_flight) = match slot.child() {
            Some(c) => {
                let rec = node.store().node(c);
                (rec.n(), rec.q() as f32, rec.in_flight_total())
            }
            None => (0, 0.0, 0),
        };
        let penalty = in_flight as f32 * req.v_loss_boost + pending_visits as f32;
        let exploration = req.cpuct_multiplier * self.cpuct * slot.prior()
            * (node.n() as f32).sqrt()
            / (1.0 + n as f32 + penalty);
        q + exploration
    }
}

/// Stamps every annotated node with one fixed fingerprint. Lets tests steer
/// fresh leaves into a prepared transposition cluster.
pub(crate) struct FixedZobristAnnotator(pub u64);

impl Annotator for FixedZobristAnnotator {
    fn annotate(&self, node: NodeHandle<'_>) {
        node.set_zobrist(self.0);
    }
}

/// Allocate a node with `n` applied visits and the given policy moves.
pub(crate) fn evaluated_node<'a>(
    store: &'a NodeStore,
    moves: &[(u16, f32)],
    n: u32,
    w: f64,
) -> NodeHandle<'a> {
    let node = NodeHandle::new(store, store.alloc_node());
    if n > 0 {
        node.apply_visits(n, w);
    }
    if !moves.is_empty() {
        node.install_policy(moves);
    }
    node
}

/// Expand slot `i` of `parent` into a visited child, keeping the parent's
/// visited high-water mark consistent.
pub(crate) fn visited_child<'a>(
    parent: NodeHandle<'a>,
    i: usize,
    n: u32,
    w: f64,
) -> NodeHandle<'a> {
    let child = parent.create_child(i);
    parent.record().note_child_visited(i);
    if n > 0 {
        child.apply_visits(n, w);
    }
    child
}

/// Config for deterministic single-threaded descents.
pub(crate) fn serial_config() -> SelectConfig {
    SelectConfig {
        transposition_mode: TranspositionMode::None,
        select_parallel_enabled: false,
        root_preload_depth: 0,
        ..Default::default()
    }
}

/// Selector over `store` with the reference scorer, inline pool, and no
/// transpositions.
pub(crate) fn serial_selector(store: Arc<NodeStore>, config: SelectConfig) -> LeafSelector {
    LeafSelector::new(
        store,
        config,
        SelectorId::ZERO,
        Collaborators {
            scorer: Arc::new(PriorPuctScorer { cpuct: 1.5 }),
            annotator: Arc::new(crate::backend::NullAnnotator),
            transpositions: Arc::new(NoTranspositions),
            pool: Arc::new(InlinePool),
            evaluator: LeafEvaluator::Deferred,
        },
    )
    .unwrap()
}
