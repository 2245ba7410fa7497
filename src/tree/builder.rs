//! A chainable wrapper around `Tree::put_*`, preferred over hand-written
//! format strings for programmatic construction (per the design note that
//! callers should get a strongly-typed builder rather than only varargs).

use super::Tree;
use crate::atom::Tag;
use crate::error::Result;
use uuid::Uuid;

/// Borrows a [`Tree`] and forwards each call to the matching `put_*`,
/// returning `Self` so calls chain. Errors short-circuit: once a `put_*`
/// fails, every later call on the same chain is skipped and the first
/// error is what `finish()` returns.
pub struct PutBuilder<'a> {
    tree: &'a mut Tree,
    error: Option<crate::error::AmqpError>,
}

impl<'a> PutBuilder<'a> {
    pub fn new(tree: &'a mut Tree) -> Self {
        PutBuilder { tree, error: None }
    }

    fn run(mut self, f: impl FnOnce(&mut Tree) -> Result<()>) -> Self {
        if self.error.is_none()
            && let Err(e) = f(self.tree)
        {
            self.error = Some(e);
        }
        self
    }

    pub fn null(self) -> Self {
        self.run(|t| t.put_null().map(|_| ()))
    }

    pub fn bool(self, v: bool) -> Self {
        self.run(move |t| t.put_bool(v).map(|_| ()))
    }

    pub fn ubyte(self, v: u8) -> Self {
        self.run(move |t| t.put_ubyte(v).map(|_| ()))
    }

    pub fn uint(self, v: u32) -> Self {
        self.run(move |t| t.put_uint(v).map(|_| ()))
    }

    pub fn int(self, v: i32) -> Self {
        self.run(move |t| t.put_int(v).map(|_| ()))
    }

    pub fn ulong(self, v: u64) -> Self {
        self.run(move |t| t.put_ulong(v).map(|_| ()))
    }

    pub fn long(self, v: i64) -> Self {
        self.run(move |t| t.put_long(v).map(|_| ()))
    }

    pub fn double(self, v: f64) -> Self {
        self.run(move |t| t.put_double(v).map(|_| ()))
    }

    pub fn uuid(self, v: Uuid) -> Self {
        self.run(move |t| t.put_uuid(v).map(|_| ()))
    }

    pub fn binary(self, bytes: &[u8]) -> Self {
        self.run(move |t| t.put_binary(bytes).map(|_| ()))
    }

    pub fn string(self, text: &str) -> Self {
        self.run(move |t| t.put_string(text).map(|_| ()))
    }

    pub fn symbol(self, text: &str) -> Self {
        self.run(move |t| t.put_symbol(text).map(|_| ()))
    }

    pub fn list(self) -> Self {
        self.run(|t| t.put_list().map(|_| ()))
    }

    pub fn map(self) -> Self {
        self.run(|t| t.put_map().map(|_| ()))
    }

    pub fn described(self) -> Self {
        self.run(|t| t.put_described().map(|_| ()))
    }

    pub fn array(self, described: bool, element_type: Tag) -> Self {
        self.run(move |t| t.put_array(described, element_type).map(|_| ()))
    }

    pub fn enter(self) -> Self {
        self.run(|t| t.enter())
    }

    pub fn exit(self) -> Self {
        self.run(|t| t.exit())
    }

    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Tree {
    /// Entry point for the fluent builder: `tree.build().list().enter()...`.
    pub fn build(&mut self) -> PutBuilder<'_> {
        PutBuilder::new(self)
    }
}
