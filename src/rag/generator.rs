//! Grounded answer generation.

use std::sync::Arc;

use crate::error::Result;
use crate::rag::ollama::ModelBackend;
use crate::types::RetrievedChunk;

const CONTEXT_SEPARATOR: &str = "\n\n";

/// Phrase the model is instructed to use when the context cannot answer
/// the question.
pub const INSUFFICIENT_CONTEXT_PHRASE: &str =
    "I don't have enough information to answer that based on the document.";

/// Raw output of the generation model.
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub text: String,
    pub model: String,
}

pub struct Generator {
    backend: Arc<dyn ModelBackend>,
    model: String,
}

impl Generator {
    pub fn new(backend: Arc<dyn ModelBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    /// Build the grounded prompt from retrieved context and ask the model.
    pub async fn answer(
        &self,
        retrieved: &[RetrievedChunk],
        question: &str,
    ) -> Result<GeneratedAnswer> {
        let context = retrieved
            .iter()
            .map(|item| item.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let prompt = build_prompt(&context, question);

        log::info!(
            "generating answer with {} ({} context chunks, prompt {} chars)",
            self.model,
            retrieved.len(),
            prompt.chars().count()
        );

        let text = self.backend.generate(&self.model, &prompt).await?;

        Ok(GeneratedAnswer {
            text,
            model: self.model.clone(),
        })
    }
}

/// The grounding contract lives entirely in this prompt: answer only from
/// the supplied context, stay concise, fall back explicitly when the
/// context is insufficient.
fn build_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are a helpful assistant answering questions based on the uploaded documents.

Context information is below:
---------------------
{context}
---------------------

Given the context information and not prior knowledge, answer the question: {question}

If the answer cannot be determined from the context, say "{INSUFFICIENT_CONTEXT_PHRASE}"
Answer concisely and accurately in three sentences or less, in the same language as the question."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_context_question_and_fallback() {
        let prompt = build_prompt("Dogs are loyal companions.", "What kind of pet is a dog?");
        assert!(prompt.contains("Dogs are loyal companions."));
        assert!(prompt.contains("What kind of pet is a dog?"));
        assert!(prompt.contains(INSUFFICIENT_CONTEXT_PHRASE));
        assert!(prompt.contains("not prior knowledge"));
        assert!(prompt.contains("three sentences or less"));
    }
}
