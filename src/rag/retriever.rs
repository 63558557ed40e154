//! Query-side retrieval: embed the question, rank stored chunks against it.

use std::sync::Arc;

use crate::error::Result;
use crate::rag::embedder::Embedder;
use crate::rag::vector_store::VectorStore;
use crate::types::RetrievedChunk;

pub struct Retriever {
    embedder: Arc<Embedder>,
    store: Arc<VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<Embedder>, store: Arc<VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Retrieve the chunks most similar to `query`.
    ///
    /// An empty result is a valid "no relevant context" signal, not a
    /// failure.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<RetrievedChunk>> {
        let query_vector = self.embedder.embed(query).await?;
        self.store
            .similarity_search(query_vector, top_k, score_threshold)
            .await
    }
}
