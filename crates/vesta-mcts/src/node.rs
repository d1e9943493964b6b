use crate::backend::Annotator;
use crate::store::{ChildSlot, NodeIndex, NodeRecord, NodeStore, PendingAction, Terminal};

// ---------------------------------------------------------------------------
// NodeHandle — copy-cheap navigator over the store
// ---------------------------------------------------------------------------

/// A `(store, index)` pair. Handles carry no ownership; the store owns every
/// record. Copy them freely.
#[derive(Clone, Copy)]
pub struct NodeHandle<'a> {
    store: &'a NodeStore,
    index: NodeIndex,
}

impl<'a> NodeHandle<'a> {
    pub fn new(store: &'a NodeStore, index: NodeIndex) -> Self {
        Self { store, index }
    }

    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn store(&self) -> &'a NodeStore {
        self.store
    }

    pub fn record(&self) -> &'a NodeRecord {
        self.store.node(self.index)
    }

    // --- Structural navigation ---

    pub fn parent(&self) -> Option<NodeHandle<'a>> {
        self.record()
            .parent()
            .map(|idx| NodeHandle::new(self.store, idx))
    }

    /// The expanded child behind slot `i`, if any.
    pub fn child_at(&self, i: usize) -> Option<NodeHandle<'a>> {
        self.child_slot(i)
            .child()
            .map(|idx| NodeHandle::new(self.store, idx))
    }

    pub fn child_slot(&self, i: usize) -> &'a ChildSlot {
        &self.children_slice()[i]
    }

    pub fn children_slice(&self) -> &'a [ChildSlot] {
        self.store.children_of(self.index)
    }

    pub fn is_root(&self) -> bool {
        self.record().parent().is_none()
    }

    // --- Accessors ---

    pub fn n(&self) -> u32 {
        self.record().n()
    }

    pub fn w(&self) -> f64 {
        self.record().w()
    }

    pub fn q(&self) -> f64 {
        self.record().q()
    }

    pub fn terminal(&self) -> Terminal {
        self.record().terminal()
    }

    pub fn zobrist(&self) -> u64 {
        self.record().zobrist()
    }

    pub fn depth(&self) -> u16 {
        self.record().depth()
    }

    pub fn num_policy_moves(&self) -> u16 {
        self.record().num_policy_moves()
    }

    pub fn pending_action(&self) -> PendingAction {
        self.record().pending_action()
    }

    pub fn is_annotated(&self) -> bool {
        self.record().is_annotated()
    }

    /// Run the external annotator if this node has no derived metadata yet.
    /// Annotation is idempotent, so a racing double-run is harmless.
    pub fn ensure_annotated(&self, annotator: &dyn Annotator) {
        if !self.is_annotated() {
            annotator.annotate(*self);
            self.record().mark_annotated();
        }
    }

    // --- Mutation surface for the external annotator / apply phases ---

    pub fn set_zobrist(&self, hash: u64) {
        self.record().set_zobrist(hash);
    }

    pub fn set_terminal(&self, t: Terminal) {
        self.record().set_terminal(t);
    }

    pub fn set_eval(&self, win_p: f32, loss_p: f32, m_position: f32) {
        self.record().set_eval(win_p, loss_p, m_position);
    }

    pub fn apply_visits(&self, count: u32, w_delta: f64) {
        self.record().apply_visits(count, w_delta);
    }

    /// Publish this node's policy moves as unexpanded child slots.
    pub fn install_policy(&self, moves: &[(u16, f32)]) {
        debug_assert!(
            self.record().children_start().is_none(),
            "install_policy on a node that already has children"
        );
        let base = self.store.alloc_children(moves.len() as u16);
        for (i, &(mv, prior)) in moves.iter().enumerate() {
            self.store.child_slot(base, i).set_policy(mv, prior);
        }
        self.record().set_children(base, moves.len() as u16);
    }

    // --- Expansion ---

    /// Materialize the unexpanded slot `i` into a real node record.
    ///
    /// Serialized on this parent: two descents racing on the same parent see
    /// exactly one allocation, and the loser adopts the winner's child. Two
    /// descents expanding different parents do not contend.
    pub fn create_child(&self, i: usize) -> NodeHandle<'a> {
        let rec = self.record();
        debug_assert!(rec.terminal() == Terminal::Unknown, "expanding a terminal node");
        debug_assert!(
            rec.transposition_extracted() != 1,
            "expanding a deferred transposition node"
        );

        let slot = self.child_slot(i);
        let _guard = rec.expand_lock().lock();
        if let Some(existing) = slot.child() {
            return NodeHandle::new(self.store, existing);
        }

        let child = self.store.alloc_node();
        let child_rec = self.store.node(child);
        child_rec.set_parent(Some(self.index));
        child_rec.set_depth(rec.depth() + 1);
        rec.note_child_expanded();
        slot.publish_child(child);

        debug_assert!(rec.num_children_expanded() <= rec.num_policy_moves());
        NodeHandle::new(self.store, child)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
