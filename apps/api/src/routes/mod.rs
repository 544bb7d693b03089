pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::postings::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/postings/generate",
            post(handlers::handle_generate_posting),
        )
        .route(
            "/api/v1/postings/approve",
            post(handlers::handle_approve_posting),
        )
        .route("/api/v1/postings", get(handlers::handle_list_postings))
        .with_state(state)
}
