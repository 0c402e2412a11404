pub mod docs;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod prompts;
pub mod state;
pub mod static_files;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{create_default_config, default_config_template, load_config, AppState};

use crate::handlers::*;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/docs", get(api_docs))
        .route("/api/analyze", post(analyze))
        .route("/api/timeline", post(timeline))
        .route("/api/exhibits", post(exhibits))
        .route("/api/forms/fill", post(fill_form))
        .route("/api/commands", post(run_command))
        .route("/api/emails/ingest", post(ingest_emails))
        .route("/api/documents", post(upsert_document))
        .route("/api/search", post(search_documents))
        .route("/api/ai/generate", post(generate))
        .fallback(static_files::static_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::security_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
