//! Parallel MCTS leaf selection over a shared, index-addressed node store.
//!
//! The selector descends from a root under the PUCT rule, reserves visits
//! through per-selector virtual-loss counters, interleaves transposition
//! sharing, and returns a batchlet of freshly claimed leaves for external
//! evaluation. Move generation, network evaluation, and the apply phase that
//! rolls results back into `N`/`W` all live outside this crate and plug in
//! through the traits in [`backend`].

pub mod backend;
pub mod config;
pub mod distributor;
pub mod evaluator;
pub mod inflight;
pub mod node;
pub mod pool;
pub mod select;
pub mod store;

#[cfg(test)]
pub(crate) mod test_util;

pub use backend::{
    Annotator, NoTranspositions, NullAnnotator, PolicyScorer, ScoreRequest, SelectError,
    TranspositionRoots, TranspositionTable,
};
pub use config::{SelectConfig, TranspositionMode};
pub use distributor::{distribute_visits, visit_window, VisitAllocation};
pub use evaluator::{CachedEval, LeafEvaluator, NetworkDef, ReuseOtherTree};
pub use inflight::{backup_decrement_in_flight, SelectorId};
pub use node::NodeHandle;
pub use pool::{Countdown, InlinePool, RayonPool, Task, WorkerPool};
pub use select::{Collaborators, LeafSelector, SelectStatsSnapshot};
pub use store::{ChildSlot, NodeIndex, NodeRecord, NodeStore, PendingAction, Terminal};
