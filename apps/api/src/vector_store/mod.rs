//! Qdrant REST client — the single point of entry for vector-index calls.
//!
//! Three operations: acknowledged single-point upsert, top-K similarity
//! search with payloads, and a collection-metadata lookup used to resolve
//! the configured vector dimensionality. Non-success responses surface as
//! `AppError::Upstream` with the provider's body text attached.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

/// Vector-index operations consumed by the approval pipeline.
/// `VectorStore` is the Qdrant implementation; the orchestrator only
/// sees this trait.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Configured vector dimensionality of a collection.
    async fn collection_dim(&self, collection: &str) -> Result<usize, AppError>;

    /// Upserts one point, waiting for the write to be acknowledged.
    async fn upsert_point(
        &self,
        collection: &str,
        id: Uuid,
        vector: &[f32],
        payload: &Value,
    ) -> Result<(), AppError>;

    /// Top-`limit` nearest points with payloads. Threshold filtering is
    /// done by the service; no local re-check.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, AppError>;
}

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct VectorStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// One search hit: point id (Qdrant allows integers or UUID strings),
/// similarity score, and the stored payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredPoint {
    pub id: Value,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl ScoredPoint {
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    points: Vec<PointStruct<'a>>,
}

#[derive(Debug, Serialize)]
struct PointStruct<'a> {
    id: String,
    vector: &'a [f32],
    payload: &'a Value,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score_threshold: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct CollectionInfoResponse {
    result: CollectionInfo,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    config: CollectionConfig,
}

#[derive(Debug, Deserialize)]
struct CollectionConfig {
    params: CollectionParams,
}

#[derive(Debug, Deserialize)]
struct CollectionParams {
    vectors: VectorsConfig,
}

/// Qdrant reports vector params either as a single unnamed config or a
/// map of named vector configs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VectorsConfig {
    Single { size: usize },
    Named(std::collections::HashMap<String, NamedVectorParams>),
}

#[derive(Debug, Deserialize)]
struct NamedVectorParams {
    size: usize,
}

impl VectorsConfig {
    fn size(&self) -> Option<usize> {
        match self {
            VectorsConfig::Single { size } => Some(*size),
            VectorsConfig::Named(map) => map.values().map(|p| p.size).next(),
        }
    }
}

impl VectorStore {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }
}

#[async_trait]
impl VectorIndex for VectorStore {
    async fn collection_dim(&self, collection: &str) -> Result<usize, AppError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/collections/{collection}"))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "qdrant",
                status: status.as_u16(),
                body,
            });
        }

        let info: CollectionInfoResponse = response.json().await.map_err(|e| {
            AppError::Format(format!("Unexpected collection metadata shape: {e}"))
        })?;

        info.result.config.params.vectors.size().ok_or_else(|| {
            AppError::Format(format!(
                "Collection '{collection}' metadata reports no vector size"
            ))
        })
    }

    async fn upsert_point(
        &self,
        collection: &str,
        id: Uuid,
        vector: &[f32],
        payload: &Value,
    ) -> Result<(), AppError> {
        let body = UpsertRequest {
            points: vec![PointStruct {
                id: id.to_string(),
                vector,
                payload,
            }],
        };

        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{collection}/points?wait=true"),
            )
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "qdrant",
                status: status.as_u16(),
                body,
            });
        }

        debug!("Upserted point {id} into '{collection}' ({}D)", vector.len());
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<ScoredPoint>, AppError> {
        let body = SearchRequest {
            vector,
            limit,
            with_payload: true,
            score_threshold,
        };

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{collection}/points/search"),
            )
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "qdrant",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| {
            AppError::Format(format!("Unexpected search response shape: {e}"))
        })?;

        Ok(parsed.result)
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    AppError::Upstream {
        service: "qdrant",
        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
        body: e.to_string(),
    }
}
