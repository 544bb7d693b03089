use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::embedding::EmbeddingChain;
use crate::llm_client::LlmClient;
use crate::prediction::PredictionClient;
use crate::vector_store::VectorIndex;

/// Shared application state injected into all route handlers via Axum
/// extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub llm: LlmClient,
    /// Provider fallback chain for embedding acquisition.
    pub embeddings: Arc<EmbeddingChain>,
    /// Qdrant in production; stubbed behind the trait in tests.
    pub vectors: Arc<dyn VectorIndex>,
    /// Unset when PREDICTION_API_URL is not configured; enrichment is
    /// then skipped and defaults apply.
    pub predictions: Option<PredictionClient>,
    pub config: Config,
}
