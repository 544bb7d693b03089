//! Modal embedding endpoint — primary provider.
//!
//! `POST {url}` with `{"text": ...}` returns `{"embedding": [f32, ...]}`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::errors::AppError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct ModalRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModalResponse {
    embedding: Option<Vec<f32>>,
}

pub struct ModalProvider {
    client: Client,
    url: String,
}

impl ModalProvider {
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
impl EmbeddingProvider for ModalProvider {
    fn name(&self) -> &'static str {
        "modal"
    }

    async fn embed(&self, text: &str, _target_dim: usize) -> Result<Vec<f32>, AppError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ModalRequest { text })
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: "modal",
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                body: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: "modal",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ModalResponse = response.json().await.map_err(|e| {
            AppError::Format(format!("Modal response was not valid JSON: {e}"))
        })?;

        parsed.embedding.ok_or_else(|| {
            AppError::Format("Modal returned 200 but no 'embedding' field".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modal_response_with_embedding_parses() {
        let parsed: ModalResponse =
            serde_json::from_str(r#"{"embedding": [0.1, 0.2, 0.3]}"#).unwrap();
        assert_eq!(parsed.embedding.unwrap().len(), 3);
    }

    #[test]
    fn test_modal_response_without_embedding_is_none() {
        let parsed: ModalResponse = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert!(parsed.embedding.is_none());
    }
}
