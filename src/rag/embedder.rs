//! Embedding service with lazy, single-flighted initialization.
//!
//! The first successful call probes the embedding model and pins its vector
//! dimensionality for the lifetime of the collection. While uninitialized,
//! every call re-attempts the probe, but only one attempt is in flight at a
//! time; concurrent first callers await the same attempt.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::{RagError, Result};
use crate::rag::ollama::ModelBackend;

const PROBE_TEXT: &str = "ping";

#[derive(Debug, Clone)]
enum EmbedderState {
    Uninitialized,
    Ready { dimension: usize },
    /// The last probe failed. Not sticky: the next call probes again.
    Failed { reason: String },
}

pub struct Embedder {
    backend: Arc<dyn ModelBackend>,
    model: String,
    state: Mutex<EmbedderState>,
}

impl Embedder {
    pub fn new(backend: Arc<dyn ModelBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
            state: Mutex::new(EmbedderState::Uninitialized),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Pinned vector dimensionality, if initialization has succeeded.
    pub async fn dimension(&self) -> Option<usize> {
        match *self.state.lock().await {
            EmbedderState::Ready { dimension } => Some(dimension),
            _ => None,
        }
    }

    /// Embed one text, initializing the backend on first use.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let dimension = self.ensure_ready().await?;

        let input = [text.to_string()];
        let mut vectors = self.backend.embed(&self.model, &input).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| RagError::Internal("embedding service returned no vector".to_string()))?;

        if vector.len() != dimension {
            return Err(RagError::Internal(format!(
                "embedding dimension changed from {dimension} to {} for model {}",
                vector.len(),
                self.model
            )));
        }

        Ok(vector)
    }

    /// Initialize if needed and return the pinned dimension.
    ///
    /// The state mutex is held across the probe, which is what serializes
    /// concurrent initialization attempts.
    async fn ensure_ready(&self) -> Result<usize> {
        let mut state = self.state.lock().await;

        if let EmbedderState::Ready { dimension } = *state {
            return Ok(dimension);
        }

        match self.backend.embed(&self.model, &[PROBE_TEXT.to_string()]).await {
            Ok(vectors) => {
                let dimension = vectors.first().map(Vec::len).unwrap_or(0);
                if dimension == 0 {
                    let reason = "embedding probe returned an empty vector".to_string();
                    *state = EmbedderState::Failed {
                        reason: reason.clone(),
                    };
                    return Err(RagError::ServiceUnavailable(reason));
                }

                log::info!(
                    "embedding model {} initialized, dimension {dimension}",
                    self.model
                );
                *state = EmbedderState::Ready { dimension };
                Ok(dimension)
            }
            Err(err) => {
                log::error!("embedding model {} failed to initialize: {err}", self.model);
                *state = EmbedderState::Failed {
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    struct CountingBackend {
        embed_calls: AtomicUsize,
        fail_first: AtomicUsize,
    }

    impl CountingBackend {
        fn new(fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                embed_calls: AtomicUsize::new(0),
                fail_first: AtomicUsize::new(fail_first),
            })
        }
    }

    #[async_trait]
    impl ModelBackend for CountingBackend {
        async fn embed(&self, _model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(RagError::ServiceUnavailable("backend down".to_string()));
            }
            Ok(inputs.iter().map(|_| vec![0.5f32; 8]).collect())
        }

        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
            Ok(String::new())
        }

        async fn healthy(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn pins_dimension_on_first_success() {
        let backend = CountingBackend::new(0);
        let embedder = Embedder::new(backend, "test-model");

        assert_eq!(embedder.dimension().await, None);
        let vector = embedder.embed("hello").await.expect("embed");
        assert_eq!(vector.len(), 8);
        assert_eq!(embedder.dimension().await, Some(8));
    }

    #[tokio::test]
    async fn retries_initialization_after_failure() {
        let backend = CountingBackend::new(1);
        let embedder = Embedder::new(backend.clone(), "test-model");

        assert!(embedder.embed("hello").await.is_err());
        assert_eq!(embedder.dimension().await, None);

        // Next call probes again and succeeds.
        assert!(embedder.embed("hello").await.is_ok());
        assert_eq!(embedder.dimension().await, Some(8));
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_probe() {
        let backend = CountingBackend::new(0);
        let embedder = Arc::new(Embedder::new(backend.clone(), "test-model"));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let embedder = Arc::clone(&embedder);
                tokio::spawn(async move { embedder.embed("hello").await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.expect("join").is_ok());
        }

        // One probe plus one real embedding per call.
        assert_eq!(backend.embed_calls.load(Ordering::SeqCst), 9);
    }
}
