//! Error types for the SQLite adapter.

use tangle_types::MarshalError;
use thiserror::Error;

/// Errors that can occur while storing or loading rows.
#[derive(Debug, Error)]
pub enum SqlError {
    /// SQLite rejected a statement.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Encoding, decoding, or layout failure.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

/// Convenience type alias for SQLite adapter operations.
pub type SqlResult<T> = std::result::Result<T, SqlError>;
