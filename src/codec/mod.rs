//! Wires the [`Tree`] store to the binary wire format.
//!
//! [`Codec`] is the crate's main entry point: it owns a `Tree` plus a
//! reusable scratch cursor state, and exposes encode/decode alongside the
//! format-string (`fill`/`scan`) and text-printing operations layered on
//! top of it in [`crate::format`].

pub mod decoder;
pub mod encoder;

use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::format::{self, FillArg, ScanOutcome};
use crate::tree::node::NodeId;
use crate::tree::Tree;

const DEFAULT_NODE_CAPACITY: usize = 64;
const DEFAULT_INTERN_CAPACITY: usize = 256;

/// A reusable encode/decode session around one [`Tree`].
///
/// Reused across many values the way a connection reuses one read/write
/// buffer pair: `clear()` resets the tree without giving back its arena or
/// intern-buffer capacity.
pub struct Codec {
    tree: Tree,
}

impl Codec {
    pub fn new() -> Self {
        Codec::with_capacity(DEFAULT_NODE_CAPACITY, DEFAULT_INTERN_CAPACITY)
    }

    pub fn with_capacity(nodes: usize, intern_bytes: usize) -> Self {
        Codec {
            tree: Tree::with_capacity(nodes, intern_bytes),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Encodes the single value rooted at `id` (typically a top-level
    /// sibling obtained via the tree's cursor).
    pub fn encode_one(&self, id: NodeId) -> Result<Vec<u8>> {
        encoder::encode_one(&self.tree, id)
    }

    /// Encodes every top-level value currently in the tree, in order.
    pub fn encode_all(&self) -> Result<Vec<u8>> {
        encoder::encode_all(&self.tree)
    }

    /// Decodes one value from `bytes` into the tree, returning its id.
    pub fn decode_one(&mut self, bytes: &[u8]) -> Result<NodeId> {
        let mut cur = ByteCursor::new(bytes);
        decoder::decode_one(&mut self.tree, &mut cur)
    }

    /// Decodes `bytes` as a sequence of top-level values, stopping only
    /// when the input is exhausted.
    pub fn decode_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut cur = ByteCursor::new(bytes);
        decoder::decode_all(&mut self.tree, &mut cur)
    }

    /// Appends values into the tree from a format string, see
    /// [`crate::format::fill`].
    pub fn fill(&mut self, fmt: &str, args: &[FillArg]) -> Result<()> {
        format::fill(&mut self.tree, fmt, args)
    }

    /// Extracts values from the tree via a format string, see
    /// [`crate::format::scan`].
    pub fn scan(&mut self, fmt: &str) -> Result<ScanOutcome> {
        format::scan(&mut self.tree, fmt)
    }

    /// Renders every top-level value currently held as literal-style text.
    pub fn format_tree(&self) -> String {
        format::format_tree(&self.tree)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;

    #[test]
    fn codec_round_trips_through_clear() {
        let mut codec = Codec::new();
        codec.tree_mut().put_uint(7).unwrap();
        let id = codec.tree().down_of(codec.tree().root());
        let bytes = codec.encode_one(id).unwrap();

        codec.clear();
        assert!(codec.tree().is_empty());

        let decoded = codec.decode_one(&bytes).unwrap();
        assert_eq!(*codec.tree().atom(decoded), Atom::UInt(7));
    }
}
