//! Self-hosted inference server — last provider in the fallback chain.
//!
//! Speaks the text-embeddings-inference wire format: `POST {url}/embed`
//! with `{"inputs": ...}` returns one row per input, `[[f32, ...]]`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::embedding::{mean_pool, EmbeddingProvider};
use crate::errors::AppError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct LocalRequest<'a> {
    inputs: &'a str,
}

pub struct LocalProvider {
    client: Client,
    url: String,
}

impl LocalProvider {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            url,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn embed(&self, text: &str, _target_dim: usize) -> Result<Vec<f32>, AppError> {
        let endpoint = format!("{}/embed", self.url.trim_end_matches('/'));
        let response = self
            .client
            .post(endpoint)
            .json(&LocalRequest { inputs: text })
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "local-embedding",
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "local-embedding",
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<Vec<f32>> = response.json().await.map_err(|e| {
            AppError::Format(format!("Local embedding response was not a matrix: {e}"))
        })?;

        if rows.is_empty() {
            return Err(AppError::Format(
                "Local embedding server returned no rows".to_string(),
            ));
        }

        // One input produces one row; multiple rows only if the server
        // tokenized per segment, in which case pool them.
        if rows.len() == 1 {
            Ok(rows.into_iter().next().unwrap_or_default())
        } else {
            Ok(mean_pool(&rows))
        }
    }
}
