//! HTTP client wrapper for interacting with Qdrant.

use crate::config::get_config;
use crate::qdrant::types::{PointUpsert, QdrantError};
use reqwest::{Client, Method, StatusCode};
use serde_json::json;

/// Payload fields indexed for filtering, with their Qdrant schema types.
const PAYLOAD_INDEX_FIELDS: [(&str, &str); 5] = [
    ("source_persona", "keyword"),
    ("content_type", "keyword"),
    ("category", "keyword"),
    ("tags", "keyword"),
    ("published", "datetime"),
];

/// Lightweight HTTP client for the Qdrant operations the pipeline needs.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, QdrantError> {
        let config = get_config();
        Self::with_base_url(&config.qdrant_url, config.qdrant_api_key.clone())
    }

    /// Construct a client against an explicit endpoint.
    pub fn with_base_url(url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("newsvec/0.3").build()?;

        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = %api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Create a collection only when it is missing from Qdrant.
    ///
    /// An existing collection is trusted as-is; its schema and indexes are
    /// not verified field by field.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            tracing::debug!(collection = collection_name, "Collection already present");
            return Ok(());
        }

        tracing::info!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await
    }

    /// Create or update a collection with the specified vector size and cosine distance.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection ensured/created");
        })
        .await
    }

    /// Ensure payload indexes exist for the standard filterable fields.
    pub async fn ensure_payload_indexes(&self, collection_name: &str) -> Result<(), QdrantError> {
        for (field, schema) in PAYLOAD_INDEX_FIELDS {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{collection_name}/index"))
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() {
                tracing::debug!(
                    collection = collection_name,
                    field,
                    schema,
                    "Payload index ensured"
                );
            } else if response.status() == StatusCode::CONFLICT {
                tracing::debug!(
                    collection = collection_name,
                    field,
                    schema,
                    "Payload index already exists"
                );
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::warn!(collection = collection_name, field, schema, error = %error, "Failed to ensure payload index");
            }
        }

        Ok(())
    }

    /// Upsert a batch of points, replacing any existing points with the same ids.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        points: Vec<PointUpsert>,
    ) -> Result<usize, QdrantError> {
        if points.is_empty() {
            return Ok(0);
        }

        let point_count = points.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                points = point_count,
                "Points upserted"
            );
        })
        .await?;

        Ok(point_count)
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::PUT, MockServer};
    use serde_json::Map;

    fn service_for(server: &MockServer) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("newsvec-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: None,
        }
    }

    #[tokio::test]
    async fn bootstrap_is_a_noop_when_collection_exists() {
        let server = MockServer::start_async().await;
        let exists = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/news_vectors");
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": {} }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/news_vectors");
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": true }));
            })
            .await;

        let service = service_for(&server);
        service
            .create_collection_if_not_exists("news_vectors", 1536)
            .await
            .expect("bootstrap");

        exists.assert();
        assert_eq!(create.hits(), 0);
    }

    #[tokio::test]
    async fn bootstrap_creates_missing_collection_with_cosine_distance() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/news_vectors");
                then.status(404)
                    .json_body(json!({ "status": "error", "result": null }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/news_vectors")
                    .json_body_partial(
                        json!({
                            "vectors": { "size": 1536, "distance": "Cosine" }
                        })
                        .to_string(),
                    );
                then.status(200)
                    .json_body(json!({ "status": "ok", "result": true }));
            })
            .await;

        let service = service_for(&server);
        service
            .create_collection_if_not_exists("news_vectors", 1536)
            .await
            .expect("bootstrap");

        create.assert();
    }

    #[tokio::test]
    async fn upsert_sends_points_and_reports_count() {
        let server = MockServer::start_async().await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/news_vectors/points");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "result": { "operation_id": 1, "status": "completed" }
                }));
            })
            .await;

        let service = service_for(&server);
        let mut payload = Map::new();
        payload.insert("title".into(), json!("A"));
        let count = service
            .upsert_points(
                "news_vectors",
                vec![PointUpsert {
                    id: "3b4c6a2c-0000-5000-8000-000000000000".into(),
                    vector: vec![0.1, 0.2],
                    payload,
                }],
            )
            .await
            .expect("upsert");

        upsert.assert();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn empty_upsert_makes_no_request() {
        let server = MockServer::start_async().await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/news_vectors/points");
                then.status(200).json_body(json!({ "status": "ok" }));
            })
            .await;

        let service = service_for(&server);
        let count = service
            .upsert_points("news_vectors", Vec::new())
            .await
            .expect("upsert");

        assert_eq!(count, 0);
        assert_eq!(upsert.hits(), 0);
    }
}
