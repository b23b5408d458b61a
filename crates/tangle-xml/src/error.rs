//! Error types for the XML adapter.

use tangle_types::MarshalError;
use thiserror::Error;

/// Errors that can occur while reading or writing XML.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The document is not well-formed XML.
    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An element carries a malformed attribute.
    #[error("xml attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Reading or writing the underlying stream failed.
    #[error("xml io: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding, decoding, or layout failure.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
}

/// Convenience type alias for XML adapter operations.
pub type XmlResult<T> = std::result::Result<T, XmlError>;
