use super::node::NodeId;

/// The tree's navigation state: where we are (`current`), what composite
/// we're inside (`parent`), and the anchors `rewind` returns to.
///
/// `current == NONE` means "positioned before the first child of `parent`"
/// — the state right after `enter()`, or right after `narrow()`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor {
    pub parent: NodeId,
    pub current: NodeId,
    pub base_parent: NodeId,
    pub base_current: NodeId,
}

impl Cursor {
    pub fn at_root(root: NodeId) -> Self {
        Cursor {
            parent: root,
            current: NodeId::NONE,
            base_parent: root,
            base_current: NodeId::NONE,
        }
    }

    pub fn rewind(&mut self) {
        self.parent = self.base_parent;
        self.current = self.base_current;
    }
}

/// A snapshot returned by `Tree::point` and consumed by `Tree::restore`.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot {
    pub(crate) parent: NodeId,
    pub(crate) current: NodeId,
}
