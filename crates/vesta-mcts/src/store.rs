use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::inflight::SelectorId;

/// Internal "no node" sentinel for atomic index fields.
const NIL: u32 = u32::MAX;

// ---------------------------------------------------------------------------
// NodeIndex — typed arena index
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeIndex(u32);

impl NodeIndex {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    fn as_usize(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// Terminal / PendingAction tags
// ---------------------------------------------------------------------------

/// Game-theoretic status of a node, from the perspective of the side to move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Terminal {
    Unknown = 0,
    Win = 1,
    Loss = 2,
    Draw = 3,
}

impl Terminal {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Terminal::Win,
            2 => Terminal::Loss,
            3 => Terminal::Draw,
            _ => Terminal::Unknown,
        }
    }
}

/// What the external evaluation pipeline should do with an emitted leaf.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum PendingAction {
    None = 0,
    /// Leaf is queued for evaluation; its result is rolled in by the apply phase.
    Apply = 1,
}

impl PendingAction {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => PendingAction::Apply,
            _ => PendingAction::None,
        }
    }
}

// ---------------------------------------------------------------------------
// ChildSlot — one policy move of a parent, expanded or not
// ---------------------------------------------------------------------------

/// One entry in a parent's child array. Unexpanded slots carry only the
/// policy move and its prior; expansion publishes the child record's index.
///
/// `mv`/`prior` are written before the owning node publishes its child range,
/// so Relaxed is enough there; the child index itself is the publication
/// point for the new record and uses Release/Acquire.
pub struct ChildSlot {
    mv: AtomicU16,
    prior: AtomicU32,
    child: AtomicU32,
}

impl ChildSlot {
    fn new() -> Self {
        Self {
            mv: AtomicU16::new(0),
            prior: AtomicU32::new(0),
            child: AtomicU32::new(NIL),
        }
    }

    fn reset(&self) {
        self.mv.store(0, Ordering::Relaxed);
        self.prior.store(0, Ordering::Relaxed);
        self.child.store(NIL, Ordering::Relaxed);
    }

    pub fn set_policy(&self, mv: u16, prior: f32) {
        self.mv.store(mv, Ordering::Relaxed);
        self.prior.store(prior.to_bits(), Ordering::Relaxed);
    }

    pub fn mv(&self) -> u16 {
        self.mv.load(Ordering::Relaxed)
    }

    pub fn prior(&self) -> f32 {
        f32::from_bits(self.prior.load(Ordering::Relaxed))
    }

    pub fn child(&self) -> Option<NodeIndex> {
        match self.child.load(Ordering::Acquire) {
            NIL => None,
            idx => Some(NodeIndex(idx)),
        }
    }

    pub(crate) fn publish_child(&self, idx: NodeIndex) {
        self.child.store(idx.0, Ordering::Release);
    }

    pub(crate) fn relink(&self, idx: NodeIndex) {
        self.child.store(idx.0, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// NodeRecord — fixed-size node state, shared across selector threads
// ---------------------------------------------------------------------------

/// One search-tree node. All fields are atomics so records can be read and
/// updated concurrently; the embedded mutex serializes child expansion only.
///
/// `N`/`W` are written by the external apply phase and only read during
/// selection. `NInFlight` is the per-selector virtual-loss counter pair.
pub struct NodeRecord {
    n: AtomicU32,
    w: AtomicU64,
    n_in_flight: [AtomicU32; 2],

    terminal: AtomicU8,
    pending_action: AtomicU8,
    annotated: AtomicBool,

    parent: AtomicU32,
    depth: AtomicU16,

    children_start: AtomicU32,
    num_policy_moves: AtomicU16,
    num_children_visited: AtomicU16,
    num_children_expanded: AtomicU16,

    zobrist: AtomicU64,
    transposition_extracted: AtomicU8,
    transposition_root: AtomicU32,
    override_v: AtomicU64,

    win_p: AtomicU32,
    loss_p: AtomicU32,
    m_position: AtomicU32,

    expand_lock: Mutex<()>,
}

/// `override_v` encoding: 0 = unset, otherwise `(1 << 32) | f32 bits`.
const OVERRIDE_TAG: u64 = 1 << 32;

impl NodeRecord {
    fn new() -> Self {
        Self {
            n: AtomicU32::new(0),
            w: AtomicU64::new(0),
            n_in_flight: [AtomicU32::new(0), AtomicU32::new(0)],
            terminal: AtomicU8::new(Terminal::Unknown as u8),
            pending_action: AtomicU8::new(PendingAction::None as u8),
            annotated: AtomicBool::new(false),
            parent: AtomicU32::new(NIL),
            depth: AtomicU16::new(0),
            children_start: AtomicU32::new(NIL),
            num_policy_moves: AtomicU16::new(0),
            num_children_visited: AtomicU16::new(0),
            num_children_expanded: AtomicU16::new(0),
            zobrist: AtomicU64::new(0),
            transposition_extracted: AtomicU8::new(0),
            transposition_root: AtomicU32::new(NIL),
            override_v: AtomicU64::new(0),
            win_p: AtomicU32::new(0),
            loss_p: AtomicU32::new(0),
            m_position: AtomicU32::new(0),
            expand_lock: Mutex::new(()),
        }
    }

    /// Reinitialize a recycled record. Runs before the record's index is
    /// published anywhere, so plain Relaxed stores suffice.
    fn reset(&self) {
        self.n.store(0, Ordering::Relaxed);
        self.w.store(0, Ordering::Relaxed);
        self.n_in_flight[0].store(0, Ordering::Relaxed);
        self.n_in_flight[1].store(0, Ordering::Relaxed);
        self.terminal.store(Terminal::Unknown as u8, Ordering::Relaxed);
        self.pending_action.store(PendingAction::None as u8, Ordering::Relaxed);
        self.annotated.store(false, Ordering::Relaxed);
        self.parent.store(NIL, Ordering::Relaxed);
        self.depth.store(0, Ordering::Relaxed);
        self.children_start.store(NIL, Ordering::Relaxed);
        self.num_policy_moves.store(0, Ordering::Relaxed);
        self.num_children_visited.store(0, Ordering::Relaxed);
        self.num_children_expanded.store(0, Ordering::Relaxed);
        self.zobrist.store(0, Ordering::Relaxed);
        self.transposition_extracted.store(0, Ordering::Relaxed);
        self.transposition_root.store(NIL, Ordering::Relaxed);
        self.override_v.store(0, Ordering::Relaxed);
        self.win_p.store(0, Ordering::Relaxed);
        self.loss_p.store(0, Ordering::Relaxed);
        self.m_position.store(0, Ordering::Relaxed);
    }

    // --- Visit statistics (written by the apply phase) ---

    pub fn n(&self) -> u32 {
        self.n.load(Ordering::Relaxed)
    }

    pub fn w(&self) -> f64 {
        f64::from_bits(self.w.load(Ordering::Relaxed))
    }

    /// Mean value estimate; 0 while unvisited.
    pub fn q(&self) -> f64 {
        let n = self.n();
        if n == 0 {
            0.0
        } else {
            self.w() / n as f64
        }
    }

    /// Roll `count` completed evaluations into `N`/`W`. Apply-phase entry point.
    pub fn apply_visits(&self, count: u32, w_delta: f64) {
        self.n.fetch_add(count, Ordering::Relaxed);
        let mut cur = self.w.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(cur) + w_delta).to_bits();
            match self
                .w
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(seen) => cur = seen,
            }
        }
    }

    // --- Cached network outputs ---

    pub fn win_p(&self) -> f32 {
        f32::from_bits(self.win_p.load(Ordering::Relaxed))
    }

    pub fn loss_p(&self) -> f32 {
        f32::from_bits(self.loss_p.load(Ordering::Relaxed))
    }

    pub fn m_position(&self) -> f32 {
        f32::from_bits(self.m_position.load(Ordering::Relaxed))
    }

    /// Value estimate derived from the cached policy head outputs.
    pub fn v(&self) -> f32 {
        self.win_p() - self.loss_p()
    }

    pub fn set_eval(&self, win_p: f32, loss_p: f32, m_position: f32) {
        self.win_p.store(win_p.to_bits(), Ordering::Relaxed);
        self.loss_p.store(loss_p.to_bits(), Ordering::Relaxed);
        self.m_position.store(m_position.to_bits(), Ordering::Relaxed);
    }

    // --- Tags ---

    pub fn terminal(&self) -> Terminal {
        Terminal::from_u8(self.terminal.load(Ordering::Relaxed))
    }

    pub fn set_terminal(&self, t: Terminal) {
        self.terminal.store(t as u8, Ordering::Relaxed);
    }

    pub fn pending_action(&self) -> PendingAction {
        PendingAction::from_u8(self.pending_action.load(Ordering::Relaxed))
    }

    pub fn set_pending_action(&self, a: PendingAction) {
        self.pending_action.store(a as u8, Ordering::Relaxed);
    }

    pub fn is_annotated(&self) -> bool {
        self.annotated.load(Ordering::Acquire)
    }

    pub fn mark_annotated(&self) {
        self.annotated.store(true, Ordering::Release);
    }

    // --- Structure ---

    pub fn parent(&self) -> Option<NodeIndex> {
        match self.parent.load(Ordering::Relaxed) {
            NIL => None,
            idx => Some(NodeIndex(idx)),
        }
    }

    pub fn set_parent(&self, parent: Option<NodeIndex>) {
        let raw = parent.map_or(NIL, |p| p.0);
        self.parent.store(raw, Ordering::Relaxed);
    }

    pub fn depth(&self) -> u16 {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn set_depth(&self, depth: u16) {
        self.depth.store(depth, Ordering::Relaxed);
    }

    pub fn children_start(&self) -> Option<u32> {
        match self.children_start.load(Ordering::Acquire) {
            NIL => None,
            base => Some(base),
        }
    }

    pub fn num_policy_moves(&self) -> u16 {
        self.num_policy_moves.load(Ordering::Acquire)
    }

    /// Publish this node's child array. Slots must already be populated.
    pub fn set_children(&self, base: u32, count: u16) {
        self.num_policy_moves.store(count, Ordering::Relaxed);
        self.children_start.store(base, Ordering::Release);
    }

    pub fn num_children_visited(&self) -> u16 {
        self.num_children_visited.load(Ordering::Relaxed)
    }

    /// High-water mark over child indices the selector has routed visits to.
    pub fn note_child_visited(&self, child_index: usize) {
        self.num_children_visited
            .fetch_max(child_index as u16 + 1, Ordering::Relaxed);
    }

    pub fn num_children_expanded(&self) -> u16 {
        self.num_children_expanded.load(Ordering::Relaxed)
    }

    pub(crate) fn note_child_expanded(&self) {
        self.num_children_expanded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn expand_lock(&self) -> &Mutex<()> {
        &self.expand_lock
    }

    // --- Virtual-loss counters ---

    pub fn in_flight(&self, selector: SelectorId) -> u32 {
        self.n_in_flight[selector.index()].load(Ordering::Relaxed)
    }

    pub fn in_flight_total(&self) -> u32 {
        self.n_in_flight[0].load(Ordering::Relaxed) + self.n_in_flight[1].load(Ordering::Relaxed)
    }

    /// Add `k` pending visits for `selector`; returns the value before the add.
    /// The prior value is what decides leaf emission.
    pub fn reserve_in_flight(&self, selector: SelectorId, k: u32) -> u32 {
        self.n_in_flight[selector.index()].fetch_add(k, Ordering::AcqRel)
    }

    /// Undo `k` pending visits for `selector`.
    pub fn release_in_flight(&self, selector: SelectorId, k: u32) {
        let prev = self.n_in_flight[selector.index()].fetch_sub(k, Ordering::AcqRel);
        debug_assert!(
            prev >= k,
            "release_in_flight underflow: had {prev}, releasing {k}"
        );
    }

    // --- Transposition linkage ---

    pub fn zobrist(&self) -> u64 {
        self.zobrist.load(Ordering::Relaxed)
    }

    pub fn set_zobrist(&self, hash: u64) {
        self.zobrist.store(hash, Ordering::Relaxed);
    }

    /// 0 = normal, 1 = deferred (linked, children pending), 2 = materialized.
    pub fn transposition_extracted(&self) -> u8 {
        self.transposition_extracted.load(Ordering::Acquire)
    }

    /// Link a freshly visited node to an equivalent position elsewhere in the
    /// tree. Child materialization is deferred to the next descent.
    pub fn link_transposition(&self, root: NodeIndex) {
        self.transposition_root.store(root.0, Ordering::Relaxed);
        self.transposition_extracted.store(1, Ordering::Release);
    }

    pub(crate) fn mark_transposition_extracted(&self) {
        self.transposition_extracted.store(2, Ordering::Release);
    }

    pub fn transposition_root(&self) -> Option<NodeIndex> {
        match self.transposition_root.load(Ordering::Relaxed) {
            NIL => None,
            idx => Some(NodeIndex(idx)),
        }
    }

    pub fn override_v(&self) -> Option<f32> {
        match self.override_v.load(Ordering::Relaxed) {
            0 => None,
            tagged => Some(f32::from_bits(tagged as u32)),
        }
    }

    pub fn set_override_v(&self, v: f32) {
        self.override_v
            .store(OVERRIDE_TAG | v.to_bits() as u64, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// NodeStore — fixed-capacity arena for records and child slots
// ---------------------------------------------------------------------------

/// Arena owning every node record and child slot of one search tree.
///
/// Capacity is fixed at construction so records never move while selector
/// threads hold references; allocation is an atomic bump. The arena is
/// cleared between searches, never piecewise freed.
pub struct NodeStore {
    nodes: Box<[NodeRecord]>,
    children: Box<[ChildSlot]>,
    n_nodes: AtomicU32,
    n_children: AtomicU32,
}

impl NodeStore {
    pub fn with_capacity(max_nodes: u32, max_child_slots: u32) -> Self {
        let nodes: Vec<NodeRecord> = (0..max_nodes).map(|_| NodeRecord::new()).collect();
        let children: Vec<ChildSlot> = (0..max_child_slots).map(|_| ChildSlot::new()).collect();
        Self {
            nodes: nodes.into_boxed_slice(),
            children: children.into_boxed_slice(),
            n_nodes: AtomicU32::new(0),
            n_children: AtomicU32::new(0),
        }
    }

    /// Allocate one fresh record. Panics if the store is undersized for the
    /// search — a fatal sizing error, not a recoverable condition.
    pub fn alloc_node(&self) -> NodeIndex {
        let idx = self.n_nodes.fetch_add(1, Ordering::Relaxed);
        assert!(
            (idx as usize) < self.nodes.len(),
            "node store exhausted ({} records)",
            self.nodes.len()
        );
        self.nodes[idx as usize].reset();
        NodeIndex(idx)
    }

    /// Contiguously allocate `n_slots` child slots, returning the base index.
    pub fn alloc_children(&self, n_slots: u16) -> u32 {
        let base = self.n_children.fetch_add(n_slots as u32, Ordering::Relaxed);
        assert!(
            (base as usize + n_slots as usize) <= self.children.len(),
            "child-slot store exhausted ({} slots)",
            self.children.len()
        );
        for i in 0..n_slots as usize {
            self.children[base as usize + i].reset();
        }
        base
    }

    pub fn node(&self, idx: NodeIndex) -> &NodeRecord {
        &self.nodes[idx.as_usize()]
    }

    pub fn child_slot(&self, base: u32, i: usize) -> &ChildSlot {
        &self.children[base as usize + i]
    }

    /// The child array of `idx`; empty if the node has none yet.
    pub fn children_of(&self, idx: NodeIndex) -> &[ChildSlot] {
        let rec = self.node(idx);
        match rec.children_start() {
            None => &[],
            Some(base) => {
                let n = rec.num_policy_moves() as usize;
                &self.children[base as usize..base as usize + n]
            }
        }
    }

    /// Relink the slot in `from`'s parent that references `from` so it points
    /// at `to` instead. Used by the transposition master swap.
    pub fn modify_parents_child_ref(&self, from: NodeIndex, to: NodeIndex) {
        let Some(parent) = self.node(from).parent() else {
            debug_assert!(false, "modify_parents_child_ref on a root node");
            return;
        };
        for slot in self.children_of(parent) {
            if slot.child() == Some(from) {
                slot.relink(to);
                return;
            }
        }
        debug_assert!(false, "no child slot of {parent:?} references {from:?}");
    }

    /// Drop every node between searches. Records are reinitialized lazily on
    /// their next allocation.
    pub fn clear(&self) {
        self.n_nodes.store(0, Ordering::Relaxed);
        self.n_children.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.n_nodes.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> NodeStore {
        NodeStore::with_capacity(64, 256)
    }

    // ---- allocation ----

    #[test]
    fn alloc_is_sequential() {
        let s = store();
        let a = s.alloc_node();
        let b = s.alloc_node();
        assert_eq!(a.as_u32(), 0);
        assert_eq!(b.as_u32(), 1);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn alloc_resets_recycled_records() {
        let s = store();
        let a = s.alloc_node();
        s.node(a).apply_visits(3, 1.5);
        s.node(a).set_terminal(Terminal::Draw);

        s.clear();
        assert!(s.is_empty());

        let b = s.alloc_node();
        assert_eq!(b.as_u32(), 0);
        assert_eq!(s.node(b).n(), 0);
        assert_eq!(s.node(b).terminal(), Terminal::Unknown);
    }

    #[test]
    #[should_panic(expected = "node store exhausted")]
    fn alloc_past_capacity_panics() {
        let s = NodeStore::with_capacity(2, 8);
        s.alloc_node();
        s.alloc_node();
        s.alloc_node();
    }

    #[test]
    fn alloc_children_contiguous() {
        let s = store();
        let a = s.alloc_children(3);
        let b = s.alloc_children(2);
        assert_eq!(a, 0);
        assert_eq!(b, 3);
    }

    // ---- visit stats ----

    #[test]
    fn apply_visits_accumulates() {
        let s = store();
        let idx = s.alloc_node();
        let rec = s.node(idx);

        rec.apply_visits(1, 0.5);
        rec.apply_visits(2, -0.25);

        assert_eq!(rec.n(), 3);
        assert!((rec.w() - 0.25).abs() < 1e-9);
        assert!((rec.q() - 0.25 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn q_zero_when_unvisited() {
        let s = store();
        let idx = s.alloc_node();
        assert_eq!(s.node(idx).q(), 0.0);
    }

    #[test]
    fn eval_cache_round_trip() {
        let s = store();
        let rec = s.node(s.alloc_node());
        rec.set_eval(0.7, 0.2, 41.0);
        assert!((rec.win_p() - 0.7).abs() < 1e-6);
        assert!((rec.loss_p() - 0.2).abs() < 1e-6);
        assert!((rec.m_position() - 41.0).abs() < 1e-6);
        assert!((rec.v() - 0.5).abs() < 1e-6);
    }

    // ---- in-flight counters ----

    #[test]
    fn reserve_returns_prior_value() {
        let s = store();
        let rec = s.node(s.alloc_node());

        assert_eq!(rec.reserve_in_flight(SelectorId::ZERO, 3), 0);
        assert_eq!(rec.reserve_in_flight(SelectorId::ZERO, 2), 3);
        assert_eq!(rec.in_flight(SelectorId::ZERO), 5);
        // Other selector untouched.
        assert_eq!(rec.in_flight(SelectorId::ONE), 0);
    }

    #[test]
    fn release_undoes_reserve() {
        let s = store();
        let rec = s.node(s.alloc_node());

        rec.reserve_in_flight(SelectorId::ONE, 4);
        rec.release_in_flight(SelectorId::ONE, 4);
        assert_eq!(rec.in_flight(SelectorId::ONE), 0);
    }

    #[test]
    #[should_panic(expected = "release_in_flight underflow")]
    fn release_underflow_asserts() {
        let s = store();
        let rec = s.node(s.alloc_node());
        rec.release_in_flight(SelectorId::ZERO, 1);
    }

    #[test]
    fn in_flight_total_sums_both_selectors() {
        let s = store();
        let rec = s.node(s.alloc_node());
        rec.reserve_in_flight(SelectorId::ZERO, 2);
        rec.reserve_in_flight(SelectorId::ONE, 5);
        assert_eq!(rec.in_flight_total(), 7);
    }

    // ---- child descriptors ----

    #[test]
    fn children_empty_until_published() {
        let s = store();
        let idx = s.alloc_node();
        assert!(s.children_of(idx).is_empty());
        assert_eq!(s.node(idx).num_policy_moves(), 0);
    }

    #[test]
    fn set_children_publishes_slice() {
        let s = store();
        let idx = s.alloc_node();
        let base = s.alloc_children(3);
        for (i, prior) in [0.5f32, 0.3, 0.2].iter().enumerate() {
            s.child_slot(base, i).set_policy(i as u16 + 10, *prior);
        }
        s.node(idx).set_children(base, 3);

        let slots = s.children_of(idx);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].mv(), 10);
        assert!((slots[1].prior() - 0.3).abs() < 1e-6);
        assert!(slots[2].child().is_none());
    }

    #[test]
    fn note_child_visited_is_high_water() {
        let s = store();
        let rec = s.node(s.alloc_node());
        rec.note_child_visited(2);
        rec.note_child_visited(0);
        assert_eq!(rec.num_children_visited(), 3);
    }

    // ---- relink ----

    #[test]
    fn modify_parents_child_ref_swaps_target() {
        let s = store();
        let parent = s.alloc_node();
        let a = s.alloc_node();
        let b = s.alloc_node();

        let base = s.alloc_children(2);
        s.child_slot(base, 0).set_policy(1, 0.6);
        s.child_slot(base, 1).set_policy(2, 0.4);
        s.node(parent).set_children(base, 2);
        s.child_slot(base, 0).publish_child(a);
        s.node(a).set_parent(Some(parent));

        s.modify_parents_child_ref(a, b);
        assert_eq!(s.child_slot(base, 0).child(), Some(b));
        // Untouched sibling slot.
        assert!(s.child_slot(base, 1).child().is_none());
    }

    // ---- transposition fields ----

    #[test]
    fn transposition_link_life_cycle() {
        let s = store();
        let n = s.alloc_node();
        let root = s.alloc_node();
        let rec = s.node(n);

        assert_eq!(rec.transposition_extracted(), 0);
        rec.link_transposition(root);
        assert_eq!(rec.transposition_extracted(), 1);
        assert_eq!(rec.transposition_root(), Some(root));

        rec.mark_transposition_extracted();
        assert_eq!(rec.transposition_extracted(), 2);
    }

    #[test]
    fn override_v_encoding() {
        let s = store();
        let rec = s.node(s.alloc_node());

        assert_eq!(rec.override_v(), None);
        rec.set_override_v(0.0);
        assert_eq!(rec.override_v(), Some(0.0));
        rec.set_override_v(-0.375);
        assert_eq!(rec.override_v(), Some(-0.375));
    }

    // ---- tags ----

    #[test]
    fn terminal_round_trip() {
        let s = store();
        let rec = s.node(s.alloc_node());
        for t in [Terminal::Win, Terminal::Loss, Terminal::Draw, Terminal::Unknown] {
            rec.set_terminal(t);
            assert_eq!(rec.terminal(), t);
        }
    }

    #[test]
    fn pending_action_round_trip() {
        let s = store();
        let rec = s.node(s.alloc_node());
        assert_eq!(rec.pending_action(), PendingAction::None);
        rec.set_pending_action(PendingAction::Apply);
        assert_eq!(rec.pending_action(), PendingAction::Apply);
    }
}
