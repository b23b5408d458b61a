use thiserror::Error;

use crate::heap::Handle;
use crate::record::RecordId;

/// Errors produced while building, encoding, or decoding an object graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarshalError {
    /// The value belongs to a category that can never be represented.
    #[error("unsupported type {type_name}: {reason}")]
    UnsupportedType { type_name: String, reason: String },

    /// A class, function, or member cannot be located by its stored tag.
    #[error("unresolvable type {tag}: {reason}")]
    UnresolvableType { tag: String, reason: String },

    /// The record stream is structurally invalid.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A reference targets a record id that was never allocated.
    #[error("dangling reference: record {0} is not defined")]
    DanglingReference(RecordId),

    /// A handle does not point into the heap it was used with.
    #[error("dangling handle: {0}")]
    DanglingHandle(Handle),

    /// Attempted to mutate an immutable composite.
    #[error("object {0} is immutable")]
    Frozen(Handle),

    /// The operation does not fit the object's shape.
    #[error("shape mismatch on {handle}: expected {expected}")]
    ShapeMismatch {
        handle: Handle,
        expected: &'static str,
    },

    /// A type tag failed validation.
    #[error("invalid type tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: String },
}

/// Result alias for marshalling operations.
pub type MarshalResult<T> = Result<T, MarshalError>;

impl MarshalError {
    /// Shorthand for [`MarshalError::UnresolvableType`].
    pub fn unresolvable(tag: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvableType {
            tag: tag.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`MarshalError::MalformedInput`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput(reason.into())
    }
}
