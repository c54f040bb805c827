//! OpenAI-compatible embeddings endpoint client.

use super::{EmbeddingClient, EmbeddingError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Embedding client for the hosted OpenAI embeddings API (and compatible endpoints).
pub struct OpenAiEmbeddingClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Construct a client for the given endpoint, key, and model.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let http = Client::builder()
            .user_agent("newsvec/embeddings")
            .build()
            .expect("Failed to construct reqwest::Client for embeddings");
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Self {
            http,
            endpoint,
            api_key,
            model,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let payload = json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingError::Provider(format!(
                    "failed to reach {}: {error}",
                    self.endpoint
                ))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Auth(format!("{status}: {body}")));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RateLimited(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(format!("{status}: {body}")));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|error| {
            EmbeddingError::InvalidResponse(format!("failed to decode response: {error}"))
        })?;

        body.data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embeddings returned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> OpenAiEmbeddingClient {
        OpenAiEmbeddingClient::new(
            server.base_url(),
            "sk-test".into(),
            "text-embedding-3-small".into(),
        )
    }

    #[tokio::test]
    async fn successful_response_yields_first_vector() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .header("authorization", "Bearer sk-test");
                then.status(200).json_body(serde_json::json!({
                    "data": [{ "index": 0, "embedding": [0.25, -0.5] }],
                    "model": "text-embedding-3-small",
                }));
            })
            .await;

        let vector = client_for(&server).embed("hello").await.expect("vector");

        mock.assert();
        assert_eq!(vector, vec![0.25, -0.5]);
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(401).body("invalid api key");
            })
            .await;

        let error = client_for(&server).embed("hello").await.unwrap_err();
        assert!(matches!(error, EmbeddingError::Auth(_)));
    }

    #[tokio::test]
    async fn throttling_maps_to_rate_limited() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(429).body("slow down");
            })
            .await;

        let error = client_for(&server).embed("hello").await.unwrap_err();
        assert!(matches!(error, EmbeddingError::RateLimited(_)));
    }

    #[tokio::test]
    async fn server_error_maps_to_provider_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(500).body("boom");
            })
            .await;

        let error = client_for(&server).embed("hello").await.unwrap_err();
        assert!(matches!(error, EmbeddingError::Provider(_)));
    }
}
