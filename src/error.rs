use thiserror::Error;

/// Error taxonomy for the codec, per the wire-format/tree/format-DSL contracts.
///
/// The four members never overlap: `Underflow` and `Overflow` are byte-budget
/// failures (input exhausted / output exhausted), `ArgErr` is malformed input
/// that is structurally well-formed but semantically wrong (unknown typecode,
/// array element type mismatch), and `Err` is a format-DSL or scan-structure
/// violation that isn't expressible as the other three.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmqpError {
    #[error("underflow: need {needed} more byte(s) at offset {offset}, only {available} available")]
    Underflow {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("overflow: need {needed} more byte(s) at offset {offset}, capacity {capacity}")]
    Overflow {
        offset: usize,
        needed: usize,
        capacity: usize,
    },

    #[error("arg_err: {0}")]
    ArgErr(String),

    #[error("err: {0}")]
    Err(String),
}

impl AmqpError {
    pub fn arg_err(message: impl Into<String>) -> Self {
        AmqpError::ArgErr(message.into())
    }

    pub fn err(message: impl Into<String>) -> Self {
        AmqpError::Err(message.into())
    }
}

pub type Result<T> = core::result::Result<T, AmqpError>;
