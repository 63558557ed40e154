//! Retrieval-augmented question answering over ingested documents.
//!
//! Documents are split into overlapping chunks, embedded through an
//! Ollama-compatible model server and stored in a SQLite vector store;
//! questions retrieve the most similar chunks, a generation model answers
//! from that context only, and reasoning traces are stripped from its
//! output before it leaves the crate.
//!
//! The surrounding gateway talks to [`rag::RagService`] and nothing else.

pub mod config;
pub mod error;
pub mod rag;
pub mod types;

pub use config::RagConfig;
pub use error::{RagError, Result};
pub use rag::RagService;
pub use types::*;
