use thiserror::Error;

use super::types::CollectionKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Fetching options for '{catalog}' ({kind}) failed: {message}")]
    FetchFailed {
        catalog: String,
        kind: CollectionKind,
        message: String,
    },

    #[error("Invalid edit for '{key}': {message}")]
    InvalidEdit { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, GridError>;

impl GridError {
    pub fn invalid_edit(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEdit {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Serialization(err.to_string())
    }
}
