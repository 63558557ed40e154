//! HTTP client for an Ollama-compatible model server.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434";

/// Seam over the external embedding/generation backend.
///
/// Production uses [`OllamaClient`]; tests substitute a deterministic
/// in-process implementation.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Embed each input text into a fixed-dimension vector.
    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate a completion for the prompt and return its raw text.
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;

    /// Whether the backend currently answers requests.
    async fn healthy(&self) -> bool;
}

pub struct OllamaClient {
    endpoint: String,
    http: Client,
    max_attempts: u32,
    backoff: Duration,
}

impl OllamaClient {
    /// Create a client. `endpoint` falls back to the `OLLAMA_ENDPOINT`
    /// environment variable, then the local default.
    pub fn new(
        endpoint: Option<String>,
        timeout: Duration,
        max_attempts: u32,
        backoff: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint
            .or_else(|| std::env::var("OLLAMA_ENDPOINT").ok())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| RagError::Internal(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            endpoint,
            http,
            max_attempts: max_attempts.max(1),
            backoff,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST a JSON body with bounded retries.
    ///
    /// Transport errors (timeouts included) and 5xx responses are treated
    /// as transient and retried with linearly growing backoff; anything
    /// else fails immediately. The exhausted budget surfaces as
    /// `ServiceUnavailable`.
    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.endpoint, path);
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.http.post(&url).json(body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<R>().await.map_err(|err| {
                            RagError::ServiceUnavailable(format!(
                                "invalid response from model server on {path}: {err}"
                            ))
                        });
                    }

                    let body_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unknown error".to_string());

                    if !status.is_server_error() {
                        return Err(RagError::ServiceUnavailable(format!(
                            "model server returned {status} on {path}: {body_text}"
                        )));
                    }

                    last_error = format!("{status}: {body_text}");
                    log::warn!(
                        "model server returned {status} on {path} (attempt {attempt}/{})",
                        self.max_attempts
                    );
                }
                Err(err) => {
                    last_error = err.to_string();
                    log::warn!(
                        "model server request to {path} failed (attempt {attempt}/{}): {err}",
                        self.max_attempts
                    );
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }

        Err(RagError::ServiceUnavailable(format!(
            "model server unreachable after {} attempts on {path}: {last_error}",
            self.max_attempts
        )))
    }
}

#[async_trait]
impl ModelBackend for OllamaClient {
    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let payload: EmbedResponse = self
            .post_json("/api/embed", &EmbedRequest { model, input: inputs })
            .await?;

        if payload.embeddings.len() != inputs.len() {
            return Err(RagError::Internal(format!(
                "embedding service returned {} vectors for {} inputs",
                payload.embeddings.len(),
                inputs.len()
            )));
        }

        Ok(payload.embeddings)
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let payload: GenerateResponse = self
            .post_json(
                "/api/generate",
                &GenerateRequest {
                    model,
                    prompt,
                    stream: false,
                },
            )
            .await?;

        Ok(payload.response.trim().to_string())
    }

    async fn healthy(&self) -> bool {
        let url = format!("{}/api/version", self.endpoint);
        match self.http.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                log::warn!("model server health check failed: {err}");
                false
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
