//! Embedding client abstraction and HTTP-backed providers.
//!
//! Provider failures are split into three classes the embed stage treats
//! differently: rejected credentials abort the whole run (no unit can make
//! progress without a key), while rate limits and generic provider failures
//! only skip the current unit, leaving it pending for a later re-run.

mod ollama;
mod openai;

pub use ollama::OllamaEmbeddingClient;
pub use openai::OpenAiEmbeddingClient;

use crate::config::{Config, EmbeddingProvider};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Provider rejected the configured credentials; fatal to the run.
    #[error("Embedding provider rejected credentials: {0}")]
    Auth(String),
    /// Provider throttled the request; the unit stays pending.
    #[error("Embedding provider rate limit hit: {0}")]
    RateLimited(String),
    /// Provider failed or was unreachable; the unit stays pending.
    #[error("Embedding request failed: {0}")]
    Provider(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for a single article's text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Build the embedding client selected by configuration.
///
/// Constructed once at process start and passed to the embed stage as an
/// explicit handle, so tests can substitute fakes.
pub fn build_embedding_client(
    config: &Config,
) -> Result<Box<dyn EmbeddingClient>, EmbeddingError> {
    match config.embedding_provider {
        EmbeddingProvider::OpenAI => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| EmbeddingError::Auth("OPENAI_API_KEY is not set".to_string()))?;
            Ok(Box::new(OpenAiEmbeddingClient::new(
                config.openai_base_url.clone(),
                api_key,
                config.embedding_model.clone(),
            )))
        }
        EmbeddingProvider::Ollama => Ok(Box::new(OllamaEmbeddingClient::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
        ))),
    }
}
