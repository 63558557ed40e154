use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::rag::chunker::{ChunkerConfig, SplitStrategy};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434";
const DEFAULT_GENERATION_MODEL: &str = "deepseek-r1:8b";
const DEFAULT_EMBEDDING_MODEL: &str = "mxbai-embed-large";

/// Configuration for the RAG pipeline.
///
/// Values come from the environment with deployment defaults matching the
/// original service; anything unset or unparseable falls back to its
/// default. The consuming gateway can also build this struct directly.
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Base URL of the Ollama-compatible model server.
    pub ollama_endpoint: String,
    /// Model used for answer generation.
    pub generation_model: String,
    /// Model used for embeddings. Its output dimensionality is pinned per
    /// collection; switching models requires a clear and full re-ingestion.
    pub embedding_model: String,
    /// Path of the SQLite vector store.
    pub db_path: PathBuf,
    pub chunker: ChunkerConfig,
    /// Default number of chunks retrieved per question.
    pub top_k: usize,
    /// Default minimum similarity score for retrieved chunks.
    pub score_threshold: Option<f32>,
    /// Per-request timeout for model server calls.
    pub request_timeout: Duration,
    /// Total attempts (first try included) for a model server call.
    pub max_attempts: u32,
    /// Base delay between retries; grows linearly with the attempt number.
    pub retry_backoff: Duration,
    /// Marker pair delimiting reasoning traces in generated text. This is
    /// configuration because the convention changes with the model.
    pub think_markers: (String, String),
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            ollama_endpoint: DEFAULT_ENDPOINT.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            db_path: PathBuf::from("rag").join("embeddings.db"),
            chunker: ChunkerConfig::default(),
            top_k: 5,
            score_threshold: Some(0.2),
            request_timeout: Duration::from_secs(60),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
            think_markers: ("<think>".to_string(), "</think>".to_string()),
        }
    }
}

impl RagConfig {
    /// Build a configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ollama_endpoint: env_string("OLLAMA_ENDPOINT", defaults.ollama_endpoint),
            generation_model: env_string("RAG_GENERATION_MODEL", defaults.generation_model),
            embedding_model: env_string("RAG_EMBEDDING_MODEL", defaults.embedding_model),
            db_path: PathBuf::from(env_string(
                "RAG_DB_PATH",
                defaults.db_path.to_string_lossy().to_string(),
            )),
            chunker: ChunkerConfig {
                max_len: env_parse("RAG_CHUNK_MAX_LEN", defaults.chunker.max_len),
                overlap: env_parse("RAG_CHUNK_OVERLAP", defaults.chunker.overlap),
                strategy: env_strategy("RAG_SPLIT_STRATEGY", defaults.chunker.strategy),
            },
            top_k: env_parse("RAG_TOP_K", defaults.top_k),
            score_threshold: std::env::var("RAG_SCORE_THRESHOLD")
                .ok()
                .and_then(|value| value.parse::<f32>().ok())
                .or(defaults.score_threshold),
            request_timeout: Duration::from_secs(env_parse(
                "RAG_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            max_attempts: env_parse("RAG_MAX_ATTEMPTS", defaults.max_attempts),
            retry_backoff: Duration::from_millis(env_parse(
                "RAG_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )),
            think_markers: defaults.think_markers,
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_strategy(key: &str, default: SplitStrategy) -> SplitStrategy {
    match std::env::var(key).ok().as_deref() {
        Some("paragraph") => SplitStrategy::Paragraph,
        Some("sentence") => SplitStrategy::Sentence,
        _ => default,
    }
}
