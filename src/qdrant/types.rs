//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Prepared point ready for upsert: stable identity, vector, and payload.
#[derive(Debug, Clone, Serialize)]
pub struct PointUpsert {
    /// Stable point identifier derived from the article's natural key.
    pub id: String,
    /// Embedding vector of the collection's configured dimension.
    pub vector: Vec<f32>,
    /// All article fields except the embedding, used for filtering.
    pub payload: Map<String, Value>,
}
