use serde::{Serialize, Serializer};
use thiserror::Error;

/// Custom error types for the RAG core
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for RagError {
    fn from(err: rusqlite::Error) -> Self {
        RagError::VectorStore(err.to_string())
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::ServiceUnavailable(err.to_string())
    }
}

/// Implement Serialize so errors can cross a serialized gateway boundary
impl Serialize for RagError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Convert RagError to String for callers that only carry messages
impl From<RagError> for String {
    fn from(err: RagError) -> Self {
        err.to_string()
    }
}

/// Result type alias for RAG core operations
pub type Result<T> = std::result::Result<T, RagError>;
