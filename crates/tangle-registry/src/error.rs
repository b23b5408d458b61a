//! Error types for registration and invocation.

use tangle_types::{MarshalError, TypeTag};
use thiserror::Error;

/// Errors that can occur while registering definitions or calling them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A definition with this tag already exists.
    #[error("tag already registered: {0}")]
    DuplicateTag(TypeTag),

    /// The value cannot be called.
    #[error("{0} is not callable")]
    NotCallable(String),

    /// A callable was invoked with the wrong number of arguments.
    #[error("{callee} expects {expected} argument(s), got {actual}")]
    Arity {
        callee: String,
        expected: usize,
        actual: usize,
    },

    /// A callable ran but could not produce a result.
    #[error("call to {callee} failed: {reason}")]
    CallFailed { callee: String, reason: String },

    /// Resolution or heap failure.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

/// Convenience type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Check an argument count, producing [`RegistryError::Arity`] on mismatch.
pub fn expect_args(callee: &str, args: &[tangle_types::Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(RegistryError::Arity {
            callee: callee.to_string(),
            expected,
            actual: args.len(),
        });
    }
    Ok(())
}
