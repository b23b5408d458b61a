//! Error types for the JSON adapter.

use tangle_types::MarshalError;
use thiserror::Error;

/// Errors that can occur while reading or writing JSON.
#[derive(Debug, Error)]
pub enum JsonError {
    /// The text is not valid JSON.
    #[error("json syntax: {0}")]
    Syntax(#[from] serde_json::Error),

    /// Reading or writing the underlying stream failed.
    #[error("json io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON numbers cannot hold NaN or infinities.
    #[error("float {0} has no JSON representation")]
    NonFiniteFloat(f64),

    /// Encoding, decoding, or layout failure.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

impl JsonError {
    /// Split serde_json's error into transport and syntax failures.
    pub(crate) fn from_serde(e: serde_json::Error) -> Self {
        if e.is_io() {
            Self::Io(e.into())
        } else {
            Self::Syntax(e)
        }
    }
}

/// Convenience type alias for JSON adapter operations.
pub type JsonResult<T> = std::result::Result<T, JsonError>;
