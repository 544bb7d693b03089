//! Embedding acquisition — provider fallback chain.
//!
//! Providers are tried in a fixed priority order (Modal, then HuggingFace,
//! then a local inference server), each at most once per call. This is
//! fallback across providers, not retry on transient failure. The first
//! success wins; its vector is resized to the target dimensionality.

pub mod huggingface;
pub mod local;
pub mod modal;
pub mod text;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::errors::AppError;

/// Character cap applied to input text before submission. Longer inputs
/// are truncated, never rejected.
pub const MAX_EMBED_CHARS: usize = 8000;

/// One embedding backend. Implementations perform exactly one HTTP call
/// per `embed` invocation; the chain owns the fallback policy.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns a raw vector. Callers must not assume the length matches
    /// `target_dim`; the chain resizes after the fact.
    async fn embed(&self, text: &str, target_dim: usize) -> Result<Vec<f32>, AppError>;
}

/// Ordered list of configured providers plus the env vars that would have
/// enabled the unconfigured ones (for the error message when nothing works).
pub struct EmbeddingChain {
    providers: Vec<Box<dyn EmbeddingProvider>>,
    unconfigured: Vec<&'static str>,
}

impl EmbeddingChain {
    pub fn new(providers: Vec<Box<dyn EmbeddingProvider>>, unconfigured: Vec<&'static str>) -> Self {
        Self {
            providers,
            unconfigured,
        }
    }

    /// Builds the chain from configuration, priority order fixed:
    /// Modal, HuggingFace, local inference server.
    pub fn from_config(config: &Config) -> Self {
        let mut providers: Vec<Box<dyn EmbeddingProvider>> = Vec::new();
        let mut unconfigured = Vec::new();

        match &config.modal_embedding_url {
            Some(url) => providers.push(Box::new(modal::ModalProvider::new(url.clone()))),
            None => unconfigured.push("MODAL_EMBEDDING_URL"),
        }
        match &config.huggingface_api_key {
            Some(key) => providers.push(Box::new(huggingface::HuggingFaceProvider::new(
                key.clone(),
            ))),
            None => unconfigured.push("HUGGINGFACE_API_KEY"),
        }
        match &config.local_embedding_url {
            Some(url) => providers.push(Box::new(local::LocalProvider::new(url.clone()))),
            None => unconfigured.push("LOCAL_EMBEDDING_URL"),
        }

        Self::new(providers, unconfigured)
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Tries each configured provider once, in order. The winning vector is
    /// resized (truncate / zero-pad) to exactly `target_dim` elements.
    pub async fn embed(&self, text: &str, target_dim: usize) -> Result<Vec<f32>, AppError> {
        if self.providers.is_empty() {
            return Err(AppError::Config(format!(
                "No embedding provider configured; set one of: {}",
                self.unconfigured.join(", ")
            )));
        }

        let text = truncate_chars(text, MAX_EMBED_CHARS);
        let mut last_error = String::new();

        for provider in &self.providers {
            match provider.embed(&text, target_dim).await {
                Ok(vector) => {
                    info!(
                        "Embedding acquired via {} ({}D raw, {}D target)",
                        provider.name(),
                        vector.len(),
                        target_dim
                    );
                    return Ok(resize_vector(vector, target_dim));
                }
                Err(e) => {
                    warn!("Embedding provider {} failed: {e}", provider.name());
                    last_error = format!("{} failed: {e}", provider.name());
                }
            }
        }

        Err(AppError::Config(format!(
            "All embedding providers failed (last: {last_error}); unconfigured fallbacks: {}",
            if self.unconfigured.is_empty() {
                "none".to_string()
            } else {
                self.unconfigured.join(", ")
            }
        )))
    }
}

/// Deterministically coerces a vector to `target_dim` elements:
/// truncate trailing elements when longer, append zeros when shorter.
pub fn resize_vector(mut vector: Vec<f32>, target_dim: usize) -> Vec<f32> {
    if vector.len() > target_dim {
        vector.truncate(target_dim);
    } else if vector.len() < target_dim {
        vector.resize(target_dim, 0.0);
    }
    vector
}

/// Averages token-level rows into one sentence-level vector. Rows are
/// assumed equal length; shorter rows contribute zeros for the tail.
pub fn mean_pool(rows: &[Vec<f32>]) -> Vec<f32> {
    let Some(width) = rows.iter().map(Vec::len).max() else {
        return Vec::new();
    };
    let mut pooled = vec![0.0f32; width];
    for row in rows {
        for (i, v) in row.iter().enumerate() {
            pooled[i] += v;
        }
    }
    let n = rows.len() as f32;
    for v in &mut pooled {
        *v /= n;
    }
    pooled
}

/// Char-boundary-safe truncation to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
