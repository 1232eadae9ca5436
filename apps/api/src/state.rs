use std::sync::Arc;

use crate::analysis::AnalysisPipeline;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
/// Read-only after startup; no request writes to it.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<AnalysisPipeline>,
}
