//! HuggingFace Inference API — second provider in the fallback chain.
//!
//! Uses the feature-extraction pipeline for `Supabase/gte-small` (384D).
//! The API returns either a flat vector or a token-level matrix depending
//! on pipeline settings; matrices are mean-pooled into one vector.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::embedding::{mean_pool, EmbeddingProvider};
use crate::errors::AppError;

const MODEL_NAME: &str = "Supabase/gte-small";
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct HfRequest<'a> {
    inputs: &'a str,
    options: HfOptions,
}

#[derive(Debug, Serialize)]
struct HfOptions {
    wait_for_model: bool,
}

/// Response shapes the feature-extraction pipeline is known to produce.
/// Anything else is a `FormatError`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfEmbedding {
    Matrix(Vec<Vec<f32>>),
    Vector(Vec<f32>),
}

impl HfEmbedding {
    fn into_vector(self) -> Result<Vec<f32>, AppError> {
        match self {
            HfEmbedding::Vector(v) if !v.is_empty() => Ok(v),
            HfEmbedding::Matrix(rows) if !rows.is_empty() => Ok(mean_pool(&rows)),
            _ => Err(AppError::Format(
                "HuggingFace returned an empty embedding".to_string(),
            )),
        }
    }
}

pub struct HuggingFaceProvider {
    client: Client,
    api_key: String,
}

impl HuggingFaceProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    fn endpoint() -> String {
        format!("https://api-inference.huggingface.co/pipeline/feature-extraction/{MODEL_NAME}")
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    async fn embed(&self, text: &str, _target_dim: usize) -> Result<Vec<f32>, AppError> {
        let response = self
            .client
            .post(Self::endpoint())
            .bearer_auth(&self.api_key)
            .json(&HfRequest {
                inputs: text,
                options: HfOptions {
                    wait_for_model: true,
                },
            })
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "huggingface",
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "huggingface",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: HfEmbedding = response.json().await.map_err(|e| {
            AppError::Format(format!("HuggingFace response had an unexpected shape: {e}"))
        })?;

        parsed.into_vector()
    }
}
