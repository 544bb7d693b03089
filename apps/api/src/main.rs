mod config;
mod db;
mod embedding;
mod errors;
mod llm_client;
mod models;
mod postings;
mod prediction;
mod routes;
mod state;
mod vector_store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::embedding::EmbeddingChain;
use crate::llm_client::LlmClient;
use crate::prediction::PredictionClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::vector_store::{VectorIndex, VectorStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TalentFlow API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and apply pending migrations
    let db = create_pool(&config.database_url).await?;
    sqlx::migrate!().run(&db).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Initialize the embedding provider fallback chain
    let embeddings = Arc::new(EmbeddingChain::from_config(&config));
    info!(
        "Embedding chain initialized ({} provider(s) configured)",
        embeddings.provider_count()
    );

    // Initialize the Qdrant client
    let vectors: Arc<dyn VectorIndex> = Arc::new(VectorStore::new(
        config.qdrant_url.clone(),
        config.qdrant_api_key.clone(),
    ));
    info!(
        "Vector store initialized (postings='{}', employees='{}')",
        config.postings_collection, config.employees_collection
    );

    // Prediction endpoint is optional; approval degrades gracefully without it
    let predictions = config
        .prediction_api_url
        .clone()
        .map(PredictionClient::new);
    if predictions.is_none() {
        info!("PREDICTION_API_URL not set; promotion enrichment disabled");
    }

    // Build app state
    let state = AppState {
        db,
        llm,
        embeddings,
        vectors,
        predictions,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
