use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid binary magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: Vec<u8> },

    #[error("binary serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Marshal(#[from] tangle_types::MarshalError),

    #[error("registry error: {0}")]
    Registry(#[from] tangle_registry::RegistryError),

    #[error("json error: {0}")]
    Json(#[from] tangle_json::JsonError),

    #[error("xml error: {0}")]
    Xml(#[from] tangle_xml::XmlError),

    #[error("sql error: {0}")]
    Sql(#[from] tangle_sql::SqlError),
}

impl From<rusqlite::Error> for SdkError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sql(e.into())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
