use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Constructed once at startup and passed into `AppState`; no module
/// reads the environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,

    // Vector store (Qdrant REST)
    pub qdrant_url: String,
    pub qdrant_api_key: Option<String>,
    pub postings_collection: String,
    pub employees_collection: String,
    /// Fallback dimensionality when the collection metadata lookup fails.
    pub embedding_dim: usize,

    // Embedding providers, in fallback priority order. All optional;
    // the chain errors at call time if none is configured.
    pub modal_embedding_url: Option<String>,
    pub huggingface_api_key: Option<String>,
    pub local_embedding_url: Option<String>,

    // Promotion prediction endpoint. Unset means enrichment is skipped.
    pub prediction_api_url: Option<String>,

    /// Minimum similarity score for employee matches. Applied by the
    /// vector store, not re-checked locally.
    pub similarity_score_threshold: Option<f32>,
    /// Whether a failed similarity search aborts the approval. The
    /// non-fatal mode degrades to an empty match list.
    pub similarity_search_fatal: bool,

    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            qdrant_url: require_env("QDRANT_URL")?,
            qdrant_api_key: optional_env("QDRANT_API_KEY"),
            postings_collection: std::env::var("POSTINGS_COLLECTION")
                .unwrap_or_else(|_| "job_postings".to_string()),
            employees_collection: std::env::var("EMPLOYEES_COLLECTION")
                .unwrap_or_else(|_| "employees".to_string()),
            embedding_dim: std::env::var("EMBEDDING_DIM")
                .unwrap_or_else(|_| "384".to_string())
                .parse::<usize>()
                .context("EMBEDDING_DIM must be a positive integer")?,
            modal_embedding_url: optional_env("MODAL_EMBEDDING_URL"),
            huggingface_api_key: optional_env("HUGGINGFACE_API_KEY"),
            local_embedding_url: optional_env("LOCAL_EMBEDDING_URL"),
            prediction_api_url: optional_env("PREDICTION_API_URL"),
            similarity_score_threshold: match optional_env("SIMILARITY_SCORE_THRESHOLD") {
                Some(raw) => Some(
                    raw.parse::<f32>()
                        .context("SIMILARITY_SCORE_THRESHOLD must be a number")?,
                ),
                None => None,
            },
            similarity_search_fatal: std::env::var("SIMILARITY_SEARCH_FATAL")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Treats unset and empty-string variables the same way.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
