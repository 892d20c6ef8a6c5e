//! The external embedding provider HTTP client (spec §4.4, §5).
//!
//! Embeddings are never computed in-process: this client only packages
//! already-clamped text into a request, posts it to a configured endpoint,
//! and classifies failures into the two buckets ingest/harvest need to
//! distinguish (`EmbeddingInputTooLong` vs `ProviderUnavailable`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Connection details for an external embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingProviderConfig {
    /// Full URL of the embeddings endpoint.
    pub endpoint: String,
    /// Bearer token, if the endpoint requires authentication.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model identifier passed through in the request body.
    pub model: String,
    /// Per-call timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of retries on transient (429/5xx/connection) failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_timeout_secs() -> u64 {
    crate::constants::DEFAULT_EMBED_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    2
}

/// Phrases a provider's 400 response body is checked for, to distinguish
/// an over-length input from any other client error. Exposed as data
/// rather than a single hardcoded string, since providers word this
/// differently.
const TOO_LONG_PHRASES: &[&str] = &[
    "too long",
    "maximum context length",
    "max context length",
    "please reduce the length of the messages",
    "exceeds the maximum",
    "input is too large",
    "too many tokens",
];

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponseItem {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingResponseItem>,
}

/// An embedding provider reachable over the network.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of already-clamped texts, returning one vector per
    /// input in the same order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// The model identifier this provider is configured for.
    fn model_name(&self) -> &str;
}

/// A [`EmbeddingProvider`] backed by a single HTTP endpoint.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    config: EmbeddingProviderConfig,
}

impl HttpEmbeddingProvider {
    /// Build a provider from its configuration, constructing the
    /// underlying HTTP client once.
    pub fn new(config: EmbeddingProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::ProviderUnavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    async fn post_once(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, Outcome> {
        let request = EmbeddingRequest {
            input: texts,
            model: &self.config.model,
        };

        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                Outcome::Transient(e.to_string())
            } else {
                Outcome::Fatal(Error::ProviderUnavailable(e.to_string()))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            let parsed: EmbeddingResponse = response
                .json()
                .await
                .map_err(|e| Outcome::Fatal(Error::ProviderUnavailable(e.to_string())))?;
            return Ok(reorder(parsed));
        }

        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 400 && is_input_too_long(&body) {
            return Err(Outcome::Fatal(Error::EmbeddingInputTooLong));
        }

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(Outcome::Transient(format!("{status}: {body}")));
        }

        Err(Outcome::Fatal(Error::ProviderUnavailable(format!(
            "{status}: {body}"
        ))))
    }
}

enum Outcome {
    Transient(String),
    Fatal(Error),
}

fn reorder(mut response: EmbeddingResponse) -> Vec<Vec<f32>> {
    response.data.sort_by_key(|item| item.index);
    response.data.into_iter().map(|item| item.embedding).collect()
}

fn is_input_too_long(body: &str) -> bool {
    let lowered = body.to_lowercase();
    if TOO_LONG_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return true;
    }
    // "requested N tokens" style phrasing (token count varies).
    lowered.contains("requested") && lowered.contains("tokens")
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut last_transient: Option<String> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay_ms = 100u64 * 2u64.pow(attempt - 1);
                tracing::debug!(attempt, delay_ms, "retrying embedding request");
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }

            match self.post_once(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(Outcome::Fatal(err)) => return Err(err),
                Err(Outcome::Transient(reason)) => {
                    tracing::warn!(reason, "embedding provider call failed, may retry");
                    last_transient = Some(reason);
                }
            }
        }

        Err(Error::ProviderUnavailable(last_transient.unwrap_or_else(
            || "embedding provider exhausted retries".to_string(),
        )))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_too_long_phrasing_case_insensitively() {
        assert!(is_input_too_long("Error: Input TOO LONG for model"));
        assert!(is_input_too_long("this exceeds the maximum context length"));
        assert!(!is_input_too_long("invalid api key"));
    }

    #[test]
    fn response_items_are_reordered_by_index() {
        let response = EmbeddingResponse {
            data: vec![
                EmbeddingResponseItem {
                    embedding: vec![2.0],
                    index: 1,
                },
                EmbeddingResponseItem {
                    embedding: vec![1.0],
                    index: 0,
                },
            ],
        };
        let ordered = reorder(response);
        assert_eq!(ordered, vec![vec![1.0], vec![2.0]]);
    }
}
