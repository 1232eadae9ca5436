use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::extraction::Document;
use crate::models::report::{AnalysisReport, JobPosting};
use crate::state::AppState;

/// Multipart field that carries the résumé file.
pub const FILE_FIELD: &str = "file";

#[derive(Deserialize)]
pub struct AnalyzeTextRequest {
    pub text: String,
    #[serde(default)]
    pub role_skills: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    pub text: String,
    pub chars: usize,
    /// Set when the structured parser failed and the raw bytes were decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

#[derive(Deserialize)]
pub struct JobDemandQuery {
    pub role: String,
}

#[derive(Serialize)]
pub struct JobDemandResponse {
    pub role: String,
    pub count: usize,
    pub jobs: Vec<JobPosting>,
}

/// POST /api/ai_full_analysis
pub async fn handle_full_analysis(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisReport>, AppError> {
    let document = read_document(multipart).await?;
    let report = state.pipeline.analyze_document(document).await?;
    Ok(Json(report))
}

/// POST /api/analyze_text
pub async fn handle_analyze_text(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeTextRequest>,
) -> Result<Json<AnalysisReport>, AppError> {
    if req.text.trim().is_empty() {
        return Err(AppError::Validation("text must not be empty".to_string()));
    }
    let report = state.pipeline.analyze_text(&req.text, req.role_skills).await?;
    Ok(Json(report))
}

/// POST /api/extract_resume
pub async fn handle_extract_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let document = read_document(multipart).await?;
    let extraction = state.pipeline.extract_document(document).await?;
    Ok(Json(ExtractResponse {
        chars: extraction.text.char_count(),
        text: extraction.text.as_str().to_string(),
        fallback: extraction.fallback,
    }))
}

/// GET /api/job_demand?role=
pub async fn handle_job_demand(
    State(state): State<AppState>,
    Query(params): Query<JobDemandQuery>,
) -> Result<Json<JobDemandResponse>, AppError> {
    let role = params.role.trim().to_string();
    if role.is_empty() {
        return Err(AppError::Validation("role must not be empty".to_string()));
    }
    let jobs = state.pipeline.job_demand(&role).await;
    Ok(Json(JobDemandResponse {
        count: jobs.len(),
        role,
        jobs,
    }))
}

/// Reads the `file` field of a multipart upload. Other fields are skipped.
async fn read_document(mut multipart: Multipart) -> Result<Document, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid file: {e}")))?;

        info!("Received upload '{file_name}' ({} bytes)", bytes.len());
        return Ok(Document { file_name, bytes });
    }
    Err(AppError::Validation("No file uploaded".to_string()))
}
