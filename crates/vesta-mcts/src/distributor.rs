//! PUCT visit distributor: splits a node's visit budget across its children
//! by simulating sequential PUCT picks against the pluggable scorer.

use crate::backend::{PolicyScorer, ScoreRequest};
use crate::node::NodeHandle;

// ---------------------------------------------------------------------------
// VisitAllocation
// ---------------------------------------------------------------------------

/// Output of one distribution pass: the final per-child scores alongside the
/// integer visit counts, `counts.iter().sum() == target`.
#[derive(Clone, Debug)]
pub struct VisitAllocation {
    pub scores: Vec<f32>,
    pub counts: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Widest child prefix worth scoring: at most `target` unvisited children
/// can be opened by this call, so nothing beyond
/// `NumChildrenVisited + target` can receive a visit.
pub fn visit_window(node: NodeHandle<'_>, target: u32) -> usize {
    let npm = node.num_policy_moves() as usize;
    npm.min(node.record().num_children_visited() as usize + target as usize)
}

// ---------------------------------------------------------------------------
// distribute_visits
// ---------------------------------------------------------------------------

/// Route `target` visits across children `[0, window)` of `req.node`.
///
/// Each pick takes the current argmax and tallies one visit on it; the tally
/// feeds back into the next score query as a simulated virtual loss. Ties
/// break toward the lower child index. Deterministic: depends only on the
/// node snapshot and the scorer.
pub fn distribute_visits(
    req: &ScoreRequest<'_>,
    window: usize,
    target: u32,
    scorer: &dyn PolicyScorer,
) -> VisitAllocation {
    debug_assert!(window >= 1, "distribute_visits needs a nonempty window");
    debug_assert!(target >= 1, "distribute_visits needs a nonzero target");

    let mut counts = vec![0u32; window];

    // First-visit shortcut: nothing to compare against.
    if window == 1 {
        counts[0] = target;
        return VisitAllocation {
            scores: vec![scorer.child_score(req, 0, 0)],
            counts,
        };
    }

    let mut scores: Vec<f32> = (0..window)
        .map(|i| scorer.child_score(req, i, 0))
        .collect();

    for _ in 0..target {
        let mut best = 0usize;
        let mut best_score = scores[0];
        for (i, &s) in scores.iter().enumerate().skip(1) {
            if s > best_score {
                best = i;
                best_score = s;
            }
        }
        counts[best] += 1;
        scores[best] = scorer.child_score(req, best, counts[best]);
    }

    VisitAllocation { scores, counts }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PolicyScorer;
    use crate::inflight::SelectorId;
    use crate::store::NodeStore;
    use crate::test_util::{self, PriorPuctScorer};

    /// Ignores node state entirely; scores from a fixed table minus the
    /// pending tally.
    struct TableScorer {
        base: Vec<f32>,
        feedback: f32,
    }

    impl PolicyScorer for TableScorer {
        fn child_score(&self, _req: &ScoreRequest<'_>, child: usize, pending: u32) -> f32 {
            self.base[child] - self.feedback * pending as f32
        }
    }

    fn request<'a>(node: NodeHandle<'a>) -> ScoreRequest<'a> {
        ScoreRequest {
            node,
            selector: SelectorId::ZERO,
            depth: 0,
            v_loss_boost: 1.0,
            cpuct_multiplier: 1.0,
        }
    }

    fn two_child_node(store: &NodeStore) -> NodeHandle<'_> {
        let root = NodeHandle::new(store, store.alloc_node());
        root.apply_visits(1, 0.0);
        root.install_policy(&[(1, 0.6), (2, 0.4)]);
        root
    }

    // ---- window ----

    #[test]
    fn window_caps_at_policy_moves() {
        let store = NodeStore::with_capacity(8, 16);
        let node = two_child_node(&store);
        assert_eq!(visit_window(node, 10), 2);
    }

    #[test]
    fn window_limited_by_visited_plus_target() {
        let store = NodeStore::with_capacity(8, 16);
        let node = NodeHandle::new(&store, store.alloc_node());
        node.apply_visits(1, 0.0);
        node.install_policy(&[(1, 0.3), (2, 0.3), (3, 0.2), (4, 0.1), (5, 0.1)]);
        node.record().note_child_visited(1); // children 0..2 visited

        assert_eq!(visit_window(node, 2), 4);
        assert_eq!(visit_window(node, 1), 3);
    }

    // ---- budget / shape ----

    #[test]
    fn counts_sum_to_target() {
        let store = NodeStore::with_capacity(8, 16);
        let node = two_child_node(&store);
        let scorer = TableScorer {
            base: vec![1.0, 0.9, 0.5],
            feedback: 0.2,
        };
        let alloc = distribute_visits(&request(node), 3, 17, &scorer);
        assert_eq!(alloc.counts.len(), 3);
        assert_eq!(alloc.counts.iter().sum::<u32>(), 17);
    }

    #[test]
    fn single_child_shortcut_takes_all() {
        let store = NodeStore::with_capacity(8, 16);
        let node = NodeHandle::new(&store, store.alloc_node());
        node.apply_visits(1, 0.0);
        node.install_policy(&[(1, 1.0)]);

        let scorer = TableScorer {
            base: vec![0.0],
            feedback: 0.0,
        };
        let alloc = distribute_visits(&request(node), 1, 9, &scorer);
        assert_eq!(alloc.counts, vec![9]);
    }

    // ---- tie-breaking ----

    #[test]
    fn ties_break_to_lower_index() {
        let store = NodeStore::with_capacity(8, 16);
        let node = two_child_node(&store);
        // Constant scores, no feedback: every pick lands on child 0.
        let scorer = TableScorer {
            base: vec![0.5, 0.5, 0.5],
            feedback: 0.0,
        };
        let alloc = distribute_visits(&request(node), 3, 6, &scorer);
        assert_eq!(alloc.counts, vec![6, 0, 0]);
    }

    #[test]
    fn feedback_spreads_visits_round_robin() {
        let store = NodeStore::with_capacity(8, 16);
        let node = two_child_node(&store);
        // Equal scores with a strict per-pick penalty behave round-robin.
        let scorer = TableScorer {
            base: vec![0.0, 0.0, 0.0],
            feedback: 1.0,
        };
        let alloc = distribute_visits(&request(node), 3, 5, &scorer);
        assert_eq!(alloc.counts, vec![2, 2, 1]);
    }

    // ---- determinism ----

    #[test]
    fn identical_inputs_identical_outputs() {
        let store = NodeStore::with_capacity(16, 32);
        let node = test_util::evaluated_node(&store, &[(1, 0.5), (2, 0.3), (3, 0.2)], 4, 0.6);

        let scorer = PriorPuctScorer { cpuct: 1.5 };
        let a = distribute_visits(&request(node), 3, 11, &scorer);
        let b = distribute_visits(&request(node), 3, 11, &scorer);
        assert_eq!(a.counts, b.counts);
        assert_eq!(a.scores, b.scores);
    }

    // ---- PUCT shape against the reference scorer ----

    #[test]
    fn prior_weighted_split() {
        // Two children, priors {0.6, 0.4}, both visited once with W=0:
        // four picks split 3/1 toward the higher prior.
        let store = NodeStore::with_capacity(16, 32);
        let node = two_child_node(&store);
        for i in 0..2 {
            let child = node.create_child(i);
            child.apply_visits(1, 0.0);
            node.record().note_child_visited(i);
        }
        node.apply_visits(2, 0.0); // root N = 3

        let scorer = PriorPuctScorer { cpuct: 1.5 };
        let alloc = distribute_visits(&request(node), 2, 4, &scorer);
        assert_eq!(alloc.counts, vec![3, 1]);
    }

    #[test]
    fn unvisited_high_prior_child_opens_first() {
        let store = NodeStore::with_capacity(16, 32);
        let node = NodeHandle::new(&store, store.alloc_node());
        node.apply_visits(1, 0.0);
        node.install_policy(&[(1, 0.7), (2, 0.2), (3, 0.1)]);

        let scorer = PriorPuctScorer { cpuct: 1.5 };
        let alloc = distribute_visits(&request(node), 3, 1, &scorer);
        assert_eq!(alloc.counts, vec![1, 0, 0]);
    }
}
