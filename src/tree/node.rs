use crate::atom::Atom;

/// A 1-based index into [`crate::tree::Tree`]'s arena. `NONE` (0) means
/// "no node" — the sentinel the spec's growth discipline is built around:
/// indices survive arena reallocation, raw references do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(0);

    pub(crate) fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        self.0 != 0
    }

    pub(crate) fn slot(self) -> usize {
        debug_assert!(self.is_some());
        (self.0 - 1) as usize
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::NONE
    }
}

/// One arena slot: an atom plus its links within the tree.
///
/// `parent` names the enclosing composite (or `NONE` for the synthetic
/// document root). `prev`/`next` form the sibling list; `down` is the
/// first child and `children` the child count — both only meaningful
/// when `atom.tag().is_composite()`.
#[derive(Debug, Clone)]
pub struct Node {
    pub atom: Atom,
    pub parent: NodeId,
    pub prev: NodeId,
    pub next: NodeId,
    pub down: NodeId,
    pub children: u32,
}

impl Node {
    pub(crate) fn new(atom: Atom, parent: NodeId) -> Self {
        Node {
            atom,
            parent,
            prev: NodeId::NONE,
            next: NodeId::NONE,
            down: NodeId::NONE,
            children: 0,
        }
    }
}
