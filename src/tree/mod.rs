//! The flat arena of [`Atom`]s that the codec encodes from and decodes into.
//!
//! Every tree starts with one synthetic node, the document root, acting as
//! the implicit top-level composite: a decode call, or a sequence of
//! `put_*` calls made without first calling `enter()`, appends siblings
//! under the root exactly the way children are appended under any other
//! composite. This keeps `enter`/`exit`/`next`/`prev` uniform instead of
//! special-casing "no parent yet".

pub mod builder;
pub mod cursor;
pub mod intern;
pub mod node;

use crate::atom::{Atom, Slice, Tag};
use crate::error::{AmqpError, Result};
use cursor::{Cursor, Snapshot};
use intern::InternBuffer;
use node::{Node, NodeId};
use uuid::Uuid;

const DEFAULT_NODE_CAPACITY: usize = 64;
const DEFAULT_INTERN_CAPACITY: usize = 256;

/// The tree store: an arena of [`node::Node`]s, a side buffer for
/// variable-length payloads, and a navigation cursor.
pub struct Tree {
    arena: Vec<Node>,
    intern: InternBuffer,
    cursor: Cursor,
    narrow_stack: Vec<(NodeId, NodeId)>,
}

impl Tree {
    pub fn new() -> Self {
        Tree::with_capacity(DEFAULT_NODE_CAPACITY, DEFAULT_INTERN_CAPACITY)
    }

    pub fn with_capacity(nodes: usize, intern_bytes: usize) -> Self {
        let mut arena = Vec::with_capacity(nodes.max(1));
        arena.push(Node::new(Atom::List, NodeId::NONE));
        let root = NodeId::new(1);
        Tree {
            arena,
            intern: InternBuffer::with_capacity(intern_bytes),
            cursor: Cursor::at_root(root),
            narrow_stack: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::new(1)
    }

    /// Resets size, cursor and intern buffer without releasing capacity.
    pub fn clear(&mut self) {
        self.arena.truncate(1);
        self.arena[0] = Node::new(Atom::List, NodeId::NONE);
        self.intern.clear();
        self.cursor = Cursor::at_root(self.root());
        self.narrow_stack.clear();
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children_count(self.root()) == 0
    }

    // -- raw accessors -----------------------------------------------------

    pub fn atom(&self, id: NodeId) -> &Atom {
        &self.arena[id.slot()].atom
    }

    pub fn tag(&self, id: NodeId) -> Tag {
        self.atom(id).tag()
    }

    pub fn parent_of(&self, id: NodeId) -> NodeId {
        self.arena[id.slot()].parent
    }

    pub fn next_of(&self, id: NodeId) -> NodeId {
        self.arena[id.slot()].next
    }

    pub fn prev_of(&self, id: NodeId) -> NodeId {
        self.arena[id.slot()].prev
    }

    pub fn down_of(&self, id: NodeId) -> NodeId {
        self.arena[id.slot()].down
    }

    pub fn children_count(&self, id: NodeId) -> u32 {
        self.arena[id.slot()].children
    }

    pub fn bytes_of(&self, slice: Slice) -> Result<&[u8]> {
        self.intern.get(slice)
    }

    /// Overwrites a node's atom in place. Used by the decoder: an array's
    /// element type isn't known until after its (optional) descriptor and
    /// shared element code have been read, both of which are decoded as
    /// children of the array node itself, so the node is created with a
    /// placeholder element type and patched once the real one is known.
    pub(crate) fn set_atom(&mut self, id: NodeId, atom: Atom) {
        self.arena[id.slot()].atom = atom;
    }

    pub fn str_of(&self, slice: Slice) -> Result<&str> {
        core::str::from_utf8(self.bytes_of(slice)?)
            .map_err(|e| AmqpError::arg_err(format!("invalid utf-8: {e}")))
    }

    // -- cursor --------------------------------------------------------

    pub fn current(&self) -> NodeId {
        self.cursor.current
    }

    pub fn cursor_parent(&self) -> NodeId {
        self.cursor.parent
    }

    pub fn point(&self) -> Snapshot {
        Snapshot {
            parent: self.cursor.parent,
            current: self.cursor.current,
        }
    }

    /// Restores a snapshot. If the snapshot refers to arena slots that no
    /// longer exist (the tree was `clear`ed in the meantime) falls back to
    /// the document root rather than panicking.
    pub fn restore(&mut self, snapshot: Snapshot) {
        let parent_valid =
            snapshot.parent.is_none() || snapshot.parent.slot() < self.arena.len();
        let current_valid =
            snapshot.current.is_none() || snapshot.current.slot() < self.arena.len();
        self.cursor.parent = if parent_valid {
            snapshot.parent
        } else {
            self.root()
        };
        self.cursor.current = if current_valid {
            snapshot.current
        } else {
            NodeId::NONE
        };
    }

    pub fn rewind(&mut self) {
        self.cursor.rewind();
    }

    /// Confines navigation to the subtree rooted at the current position.
    pub fn narrow(&mut self) {
        self.narrow_stack
            .push((self.cursor.base_parent, self.cursor.base_current));
        self.cursor.base_parent = self.cursor.parent;
        self.cursor.base_current = self.cursor.current;
    }

    /// Undoes the most recent `narrow`.
    pub fn widen(&mut self) -> Result<()> {
        let (parent, current) = self
            .narrow_stack
            .pop()
            .ok_or_else(|| AmqpError::err("widen: no matching narrow"))?;
        self.cursor.base_parent = parent;
        self.cursor.base_current = current;
        Ok(())
    }

    pub fn enter(&mut self) -> Result<()> {
        let current = self.cursor.current;
        if current.is_none() {
            return Err(AmqpError::err("enter: no current node to enter"));
        }
        if !self.tag(current).is_composite() {
            return Err(AmqpError::err("enter: current node is not a composite"));
        }
        self.cursor.parent = current;
        self.cursor.current = NodeId::NONE;
        Ok(())
    }

    pub fn exit(&mut self) -> Result<()> {
        if self.cursor.parent == self.root() {
            return Err(AmqpError::err("exit: already at the document root"));
        }
        let composite = self.cursor.parent;
        self.cursor.current = composite;
        self.cursor.parent = self.parent_of(composite);
        Ok(())
    }

    /// Sibling navigation. From "before first child" moves to the first
    /// child; otherwise moves to the next sibling of `current`.
    pub fn next(&mut self) -> Result<()> {
        let next = if self.cursor.current.is_none() {
            self.down_of(self.cursor.parent)
        } else {
            self.next_of(self.cursor.current)
        };
        if next.is_none() {
            return Err(AmqpError::err("next: no more siblings"));
        }
        self.cursor.current = next;
        Ok(())
    }

    pub fn prev(&mut self) -> Result<()> {
        if self.cursor.current.is_none() {
            return Err(AmqpError::err("prev: already before the first child"));
        }
        self.cursor.current = self.prev_of(self.cursor.current);
        Ok(())
    }

    // -- mutation --------------------------------------------------------

    fn alloc(&mut self, atom: Atom, parent: NodeId) -> NodeId {
        self.arena.push(Node::new(atom, parent));
        let id = NodeId::new(self.arena.len());
        if self.arena.capacity() == self.arena.len() {
            log::debug!("tree arena grew to {} node(s)", self.arena.len());
        }
        id
    }

    /// Appends `atom` as the next sibling at the cursor's insertion point,
    /// enforcing the array element-type invariant if the parent is an
    /// array, then advances `current` to the new node.
    fn put(&mut self, atom: Atom) -> Result<NodeId> {
        let parent = self.cursor.parent;
        if let Atom::Array {
            element_type,
            described,
        } = *self.atom(parent)
        {
            let is_descriptor_slot = described && self.children_count(parent) == 0;
            if !is_descriptor_slot && atom.tag() != element_type {
                return Err(AmqpError::arg_err(format!(
                    "array element type mismatch: expected {element_type:?}, got {:?}",
                    atom.tag()
                )));
            }
        }

        let id = self.alloc(atom, parent);
        let after = self.cursor.current;
        if after.is_none() {
            debug_assert!(self.down_of(parent).is_none());
            self.arena[parent.slot()].down = id;
        } else {
            self.arena[after.slot()].next = id;
            self.arena[id.slot()].prev = after;
        }
        self.arena[parent.slot()].children += 1;
        self.cursor.current = id;
        Ok(id)
    }

    pub fn put_null(&mut self) -> Result<NodeId> {
        self.put(Atom::Null)
    }

    pub fn put_bool(&mut self, v: bool) -> Result<NodeId> {
        self.put(Atom::Bool(v))
    }

    pub fn put_ubyte(&mut self, v: u8) -> Result<NodeId> {
        self.put(Atom::UByte(v))
    }

    pub fn put_byte(&mut self, v: i8) -> Result<NodeId> {
        self.put(Atom::Byte(v))
    }

    pub fn put_ushort(&mut self, v: u16) -> Result<NodeId> {
        self.put(Atom::UShort(v))
    }

    pub fn put_short(&mut self, v: i16) -> Result<NodeId> {
        self.put(Atom::Short(v))
    }

    pub fn put_uint(&mut self, v: u32) -> Result<NodeId> {
        self.put(Atom::UInt(v))
    }

    pub fn put_int(&mut self, v: i32) -> Result<NodeId> {
        self.put(Atom::Int(v))
    }

    pub fn put_char(&mut self, v: char) -> Result<NodeId> {
        self.put(Atom::Char(v))
    }

    pub fn put_ulong(&mut self, v: u64) -> Result<NodeId> {
        self.put(Atom::ULong(v))
    }

    pub fn put_long(&mut self, v: i64) -> Result<NodeId> {
        self.put(Atom::Long(v))
    }

    pub fn put_timestamp(&mut self, v: i64) -> Result<NodeId> {
        self.put(Atom::Timestamp(v))
    }

    pub fn put_float(&mut self, v: f32) -> Result<NodeId> {
        self.put(Atom::Float(v))
    }

    pub fn put_double(&mut self, v: f64) -> Result<NodeId> {
        self.put(Atom::Double(v))
    }

    pub fn put_decimal32(&mut self, bits: [u8; 4]) -> Result<NodeId> {
        self.put(Atom::Decimal32(bits))
    }

    pub fn put_decimal64(&mut self, bits: [u8; 8]) -> Result<NodeId> {
        self.put(Atom::Decimal64(bits))
    }

    pub fn put_decimal128(&mut self, bits: [u8; 16]) -> Result<NodeId> {
        self.put(Atom::Decimal128(bits))
    }

    pub fn put_uuid(&mut self, v: Uuid) -> Result<NodeId> {
        self.put(Atom::Uuid(v))
    }

    pub fn put_binary(&mut self, bytes: &[u8]) -> Result<NodeId> {
        let slice = self.intern.intern(bytes);
        self.put(Atom::Binary(slice))
    }

    pub fn put_string(&mut self, text: &str) -> Result<NodeId> {
        let slice = self.intern.intern(text.as_bytes());
        self.put(Atom::String(slice))
    }

    pub fn put_symbol(&mut self, text: &str) -> Result<NodeId> {
        if !text.is_ascii() {
            return Err(AmqpError::arg_err(format!(
                "symbol {text:?} contains non-ASCII bytes"
            )));
        }
        let slice = self.intern.intern(text.as_bytes());
        self.put(Atom::Symbol(slice))
    }

    pub fn put_list(&mut self) -> Result<NodeId> {
        self.put(Atom::List)
    }

    pub fn put_map(&mut self) -> Result<NodeId> {
        self.put(Atom::Map)
    }

    pub fn put_described(&mut self) -> Result<NodeId> {
        self.put(Atom::Described)
    }

    /// Appends an array node with its element type preselected. Required
    /// before any child of the array is put.
    pub fn put_array(&mut self, described: bool, element_type: Tag) -> Result<NodeId> {
        self.put(Atom::Array {
            element_type,
            described,
        })
    }

    /// Deep-copies `src`'s top-level items (up to `limit`) into this tree
    /// at the current insertion point, preserving structure.
    pub fn appendn(&mut self, src: &Tree, limit: usize) -> Result<()> {
        let mut child = src.down_of(src.root());
        let mut copied = 0usize;
        while child.is_some() && copied < limit {
            self.copy_subtree(src, child)?;
            child = src.next_of(child);
            copied += 1;
        }
        Ok(())
    }

    pub fn append(&mut self, src: &Tree) -> Result<()> {
        self.appendn(src, usize::MAX)
    }

    fn copy_subtree(&mut self, src: &Tree, id: NodeId) -> Result<()> {
        let atom = match src.atom(id) {
            Atom::Binary(slice) => Atom::Binary(self.intern.intern(src.bytes_of(*slice)?)),
            Atom::String(slice) => Atom::String(self.intern.intern(src.bytes_of(*slice)?)),
            Atom::Symbol(slice) => Atom::Symbol(self.intern.intern(src.bytes_of(*slice)?)),
            other => *other,
        };
        self.put(atom)?;
        if atom.tag().is_composite() {
            self.enter()?;
            let mut child = src.down_of(id);
            while child.is_some() {
                self.copy_subtree(src, child)?;
                child = src.next_of(child);
            }
            self.exit()?;
        }
        Ok(())
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_primitives_at_top_level() {
        let mut t = Tree::new();
        t.put_uint(1).unwrap();
        t.put_bool(true).unwrap();
        assert_eq!(t.children_count(t.root()), 2);
        let first = t.down_of(t.root());
        assert_eq!(t.tag(first), Tag::UInt);
        let second = t.next_of(first);
        assert_eq!(t.tag(second), Tag::Bool);
    }

    #[test]
    fn enter_exit_round_trip() {
        let mut t = Tree::new();
        t.put_list().unwrap();
        t.enter().unwrap();
        t.put_uint(1).unwrap();
        t.put_uint(2).unwrap();
        t.exit().unwrap();
        t.put_uint(3).unwrap();

        let list = t.down_of(t.root());
        assert_eq!(t.tag(list), Tag::List);
        assert_eq!(t.children_count(list), 2);
        let after = t.next_of(list);
        assert_eq!(t.tag(after), Tag::UInt);
    }

    #[test]
    fn array_rejects_mismatched_element_type() {
        let mut t = Tree::new();
        t.put_array(false, Tag::UInt).unwrap();
        t.enter().unwrap();
        t.put_uint(1).unwrap();
        assert!(t.put_bool(true).is_err());
    }

    #[test]
    fn described_array_allows_any_descriptor_tag() {
        let mut t = Tree::new();
        t.put_array(true, Tag::UInt).unwrap();
        t.enter().unwrap();
        t.put_symbol("urn:x").unwrap();
        t.put_uint(1).unwrap();
        t.put_uint(2).unwrap();
        t.exit().unwrap();
        let array = t.down_of(t.root());
        assert_eq!(t.children_count(array), 3);
    }

    #[test]
    fn rewind_narrow_widen() {
        let mut t = Tree::new();
        t.put_list().unwrap();
        t.enter().unwrap();
        t.put_uint(1).unwrap();
        t.put_uint(2).unwrap();
        t.exit().unwrap();

        t.narrow();
        let list = t.down_of(t.root());
        t.rewind();
        assert_eq!(t.current(), NodeId::NONE);
        t.cursor.parent = list;
        t.enter().ok();
        t.next().unwrap();
        assert_eq!(t.tag(t.current()), Tag::UInt);
        t.widen().unwrap();
    }

    #[test]
    fn append_deep_copies_structure() {
        let mut src = Tree::new();
        src.put_list().unwrap();
        src.enter().unwrap();
        src.put_string("hi").unwrap();
        src.put_uint(7).unwrap();
        src.exit().unwrap();

        let mut dst = Tree::new();
        dst.append(&src).unwrap();

        let list = dst.down_of(dst.root());
        assert_eq!(dst.tag(list), Tag::List);
        let first = dst.down_of(list);
        assert_eq!(dst.tag(first), Tag::String);
        if let Atom::String(slice) = *dst.atom(first) {
            assert_eq!(dst.str_of(slice).unwrap(), "hi");
        } else {
            unreachable!();
        }
    }

    #[test]
    fn restore_falls_back_after_clear() {
        let mut t = Tree::new();
        t.put_uint(1).unwrap();
        let snap = t.point();
        t.clear();
        t.restore(snap);
        assert_eq!(t.cursor_parent(), t.root());
        assert_eq!(t.current(), NodeId::NONE);
    }
}
