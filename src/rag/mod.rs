pub mod chunker;
pub mod embedder;
pub mod generator;
pub mod ollama;
pub mod retriever;
pub mod sanitizer;
pub mod service;
pub mod vector_store;

pub use chunker::{Chunker, ChunkerConfig, SplitStrategy};
pub use embedder::Embedder;
pub use generator::{GeneratedAnswer, Generator, INSUFFICIENT_CONTEXT_PHRASE};
pub use ollama::{ModelBackend, OllamaClient};
pub use retriever::Retriever;
pub use sanitizer::AnswerSanitizer;
pub use service::{RagService, NO_CONTEXT_ANSWER};
pub use vector_store::VectorStore;
