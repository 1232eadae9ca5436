pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/ai_full_analysis", post(handlers::handle_full_analysis))
        .route("/api/analyze_text", post(handlers::handle_analyze_text))
        .route("/api/extract_resume", post(handlers::handle_extract_resume))
        .route("/api/job_demand", get(handlers::handle_job_demand))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}
