//! Orchestration of the two user-facing pipelines (ingest, ask) plus the
//! clear and health operations exposed to the surrounding gateway.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::rag::chunker::Chunker;
use crate::rag::embedder::Embedder;
use crate::rag::generator::Generator;
use crate::rag::ollama::{ModelBackend, OllamaClient};
use crate::rag::retriever::Retriever;
use crate::rag::sanitizer::AnswerSanitizer;
use crate::rag::vector_store::VectorStore;
use crate::types::{
    AnswerSource, AskRequest, AskResponse, ChunkRecord, ClearResponse, HealthResponse,
    HealthStatus, IngestResponse,
};

/// Canned answer returned when retrieval finds nothing relevant. The
/// generation model is not called in that case.
pub const NO_CONTEXT_ANSWER: &str =
    "No relevant information found in the document to answer your question.";

const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// Progress of one ingestion job, used for failure context in logs and
/// error messages. `Failed` is reachable from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IngestPhase {
    Received,
    Extracted,
    Chunked,
    Embedding { index: usize, total: usize },
    Stored,
    Completed,
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Extracted => write!(f, "extracted"),
            Self::Chunked => write!(f, "chunked"),
            Self::Embedding { index, total } => write!(f, "embedding {index}/{total}"),
            Self::Stored => write!(f, "stored"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

struct ServiceInner {
    config: RagConfig,
    backend: Arc<dyn ModelBackend>,
    chunker: Chunker,
    store: Arc<VectorStore>,
    embedder: Arc<Embedder>,
    retriever: Retriever,
    generator: Generator,
    sanitizer: AnswerSanitizer,
    /// Serializes ingestion against clearing; ask requests are read-only
    /// and never take this lock.
    write_lock: Mutex<()>,
}

/// The RAG pipeline behind the gateway's ingest/ask/clear/health surface.
///
/// All collaborators are explicit service objects constructed exactly once
/// here; cloning the service shares them.
#[derive(Clone)]
pub struct RagService {
    inner: Arc<ServiceInner>,
}

impl RagService {
    /// Build the service against a live Ollama-compatible model server.
    pub fn new(config: RagConfig) -> Result<Self> {
        let backend: Arc<dyn ModelBackend> = Arc::new(OllamaClient::new(
            Some(config.ollama_endpoint.clone()),
            config.request_timeout,
            config.max_attempts,
            config.retry_backoff,
        )?);
        Self::with_backend(config, backend)
    }

    /// Build the service over an arbitrary model backend.
    pub fn with_backend(config: RagConfig, backend: Arc<dyn ModelBackend>) -> Result<Self> {
        let chunker = Chunker::new(config.chunker)?;
        let store = Arc::new(VectorStore::open(&config.db_path)?);
        let embedder = Arc::new(Embedder::new(
            Arc::clone(&backend),
            config.embedding_model.clone(),
        ));
        let retriever = Retriever::new(Arc::clone(&embedder), Arc::clone(&store));
        let generator = Generator::new(Arc::clone(&backend), config.generation_model.clone());
        let sanitizer = AnswerSanitizer::new(
            config.think_markers.0.clone(),
            config.think_markers.1.clone(),
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                backend,
                chunker,
                store,
                embedder,
                retriever,
                generator,
                sanitizer,
                write_lock: Mutex::new(()),
            }),
        })
    }

    /// Ingest one document: extract text, chunk, embed and store.
    ///
    /// Fails fast on the first embedding or storage error; chunks written
    /// before the failure remain in the store. Callers that need a clean
    /// retry should `clear` first.
    pub async fn ingest(&self, filename: &str, bytes: &[u8]) -> IngestResponse {
        let started = Instant::now();
        log::info!("starting ingestion for {filename} ({} bytes)", bytes.len());

        let _guard = self.inner.write_lock.lock().await;

        let mut phase = IngestPhase::Received;
        match self.ingest_inner(filename, bytes, &mut phase).await {
            Ok(count) => {
                log::info!(
                    "ingestion of {filename} completed: {count} chunks in {} ms",
                    started.elapsed().as_millis()
                );
                IngestResponse::success(count)
            }
            Err(err) => {
                log::error!(
                    "ingestion of {filename} failed during {phase} after {} ms: {err}",
                    started.elapsed().as_millis()
                );
                IngestResponse::error(format!("Ingestion failed during {phase}: {err}"))
            }
        }
    }

    async fn ingest_inner(
        &self,
        filename: &str,
        bytes: &[u8],
        phase: &mut IngestPhase,
    ) -> Result<usize> {
        let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        if filename.rfind('.').is_none() || !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(RagError::Validation(format!(
                "unsupported document type: {filename}"
            )));
        }

        let text = std::str::from_utf8(bytes).map_err(|_| {
            RagError::Validation(format!("{filename} is not valid UTF-8 text"))
        })?;
        *phase = IngestPhase::Extracted;

        let chunk_texts = self.inner.chunker.split(text);
        *phase = IngestPhase::Chunked;
        log::info!("created {} chunks from {filename}", chunk_texts.len());

        let total = chunk_texts.len();
        // Chunks are embedded and stored one at a time to stay inside the
        // model server's rate limits; sequence indexes follow chunk order.
        for (index, chunk_text) in chunk_texts.into_iter().enumerate() {
            *phase = IngestPhase::Embedding {
                index: index + 1,
                total,
            };
            let vector = self.inner.embedder.embed(&chunk_text).await?;

            let record = ChunkRecord::new(filename, index as u32, chunk_text);
            self.inner.store.append(record, vector).await?;
        }
        *phase = IngestPhase::Stored;

        *phase = IngestPhase::Completed;
        Ok(total)
    }

    /// Answer a question from the ingested corpus.
    pub async fn ask(&self, request: AskRequest) -> AskResponse {
        let started = Instant::now();
        let query = request.query.trim();

        if query.is_empty() {
            log::warn!("rejected ask request with empty query");
            return AskResponse::error("Query must not be empty", elapsed_ms(started));
        }

        let top_k = request.top_k.unwrap_or(self.inner.config.top_k);
        let score_threshold = request
            .score_threshold
            .or(self.inner.config.score_threshold);

        log::info!("processing question (topK {top_k}, threshold {score_threshold:?})");

        let retrieved = match self
            .inner
            .retriever
            .retrieve(query, top_k, score_threshold)
            .await
        {
            Ok(retrieved) => retrieved,
            Err(err) => {
                log::error!(
                    "retrieval failed after {} ms: {err}",
                    started.elapsed().as_millis()
                );
                return AskResponse::error(err.to_string(), elapsed_ms(started));
            }
        };

        if retrieved.is_empty() {
            log::info!(
                "no chunks above threshold, returning canned answer ({} ms)",
                started.elapsed().as_millis()
            );
            return AskResponse::success(
                NO_CONTEXT_ANSWER.to_string(),
                Vec::new(),
                elapsed_ms(started),
            );
        }

        let generated = match self.inner.generator.answer(&retrieved, query).await {
            Ok(generated) => generated,
            Err(err) => {
                log::error!(
                    "generation failed after {} ms: {err}",
                    started.elapsed().as_millis()
                );
                return AskResponse::error(err.to_string(), elapsed_ms(started));
            }
        };

        let answer = self.inner.sanitizer.sanitize(&generated.text);
        let sources = retrieved
            .iter()
            .map(|item| AnswerSource {
                content: item.chunk.text.clone(),
                filename: item.chunk.source_filename.clone(),
                score: item.score,
            })
            .collect();

        log::info!(
            "question answered with {} ({} sources, {} ms)",
            generated.model,
            retrieved.len(),
            started.elapsed().as_millis()
        );

        AskResponse::success(answer, sources, elapsed_ms(started))
    }

    /// Remove every chunk in the collection.
    pub async fn clear(&self) -> ClearResponse {
        let started = Instant::now();
        let _guard = self.inner.write_lock.lock().await;

        match self.inner.store.clear_all().await {
            Ok(removed) => {
                log::info!(
                    "vector store cleared: {removed} records in {} ms",
                    started.elapsed().as_millis()
                );
                ClearResponse::success(removed)
            }
            Err(err) => {
                log::error!("clearing vector store failed: {err}");
                ClearResponse::error(err.to_string())
            }
        }
    }

    /// Reachability of the model server and the vector store.
    pub async fn health(&self) -> HealthResponse {
        let model_ok = self.inner.backend.healthy().await;
        let store_ok = match self.inner.store.count().await {
            Ok(_) => true,
            Err(err) => {
                log::warn!("vector store health check failed: {err}");
                false
            }
        };

        HealthResponse {
            status: if model_ok && store_ok {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
