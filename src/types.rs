use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome marker used by every response envelope.
///
/// The surrounding gateway maps these envelopes onto its own protocol
/// unchanged, so the wire words are fixed to "success" / "error".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// A stored chunk of an ingested document.
///
/// Chunks are created during ingestion and never mutated; the vector store
/// owns their persistence exclusively. The embedding itself lives next to
/// the record inside the store and is not part of the public shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkRecord {
    pub id: Uuid,
    pub source_filename: String,
    /// Position of this chunk within its document, strictly increasing.
    pub sequence_index: u32,
    pub text: String,
    /// Unix timestamp (seconds) of ingestion.
    pub created_at: i64,
}

impl ChunkRecord {
    /// Create a record with a fresh id and the current timestamp.
    pub fn new(source_filename: &str, sequence_index: u32, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_filename: source_filename.to_string(),
            sequence_index,
            text,
            created_at: Utc::now().timestamp(),
        }
    }
}

/// A chunk returned from similarity search, paired with its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedChunk {
    pub chunk: ChunkRecord,
    /// Cosine similarity against the query vector, higher is more similar.
    pub score: f32,
}

/// A question posed against the ingested corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskRequest {
    pub query: String,
    /// Maximum number of chunks to retrieve. Falls back to the configured
    /// default (5) when absent.
    pub top_k: Option<usize>,
    /// Minimum similarity score for a chunk to count as relevant. Falls
    /// back to the configured default when absent.
    pub score_threshold: Option<f32>,
}

impl AskRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            score_threshold: None,
        }
    }
}

/// One supporting passage cited by an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSource {
    pub content: String,
    pub filename: String,
    pub score: f32,
}

/// Result of an ask operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub status: ResponseStatus,
    pub answer: Option<String>,
    pub message: Option<String>,
    pub sources: Vec<AnswerSource>,
    /// Wall-clock time spent answering, in milliseconds.
    pub took_ms: u64,
}

impl AskResponse {
    pub fn success(answer: String, sources: Vec<AnswerSource>, took_ms: u64) -> Self {
        Self {
            status: ResponseStatus::Success,
            answer: Some(answer),
            message: None,
            sources,
            took_ms,
        }
    }

    pub fn error(message: impl Into<String>, took_ms: u64) -> Self {
        Self {
            status: ResponseStatus::Error,
            answer: None,
            message: Some(message.into()),
            sources: Vec::new(),
            took_ms,
        }
    }
}

/// Result of an ingest operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub status: ResponseStatus,
    /// Number of chunks added to the store on success.
    pub count: Option<usize>,
    pub message: Option<String>,
}

impl IngestResponse {
    pub fn success(count: usize) -> Self {
        Self {
            status: ResponseStatus::Success,
            count: Some(count),
            message: Some(format!(
                "Document ingested successfully. Created {count} chunks."
            )),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            count: None,
            message: Some(message.into()),
        }
    }
}

/// Result of a clear operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub status: ResponseStatus,
    pub message: Option<String>,
}

impl ClearResponse {
    pub fn success(removed: usize) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: Some(format!(
                "Vector store cleared successfully. Removed {removed} records."
            )),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: Some(message.into()),
        }
    }
}

/// Reachability of the model server and the vector store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Result of a health probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
}
