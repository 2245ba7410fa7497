//! An AMQP 1.0 type-system codec: a tree-structured value model plus a
//! binary encoder/decoder and a format-string `fill`/`scan` surface for
//! building and reading it.
//!
//! [`Codec`] is the usual entry point; [`tree::Tree`] and the free
//! functions in [`codec`]/[`format`] are available directly for callers
//! that want finer control.

pub mod atom;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod format;
pub mod logger;
pub mod tree;
pub mod typecode;

pub use codec::Codec;
pub use error::{AmqpError, Result};
