//! Axum route handlers for the Evaluation API.

use axum::{
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::evaluation::pipeline::{
    evaluate_resume, optimize_resume, require_inputs, EvaluationContext, EvaluationOutcome,
};
use crate::render::render_document;
use crate::state::AppState;

pub const TXT_FILE_NAME: &str = "optimized_resume.txt";
pub const PDF_FILE_NAME: &str = "optimized_resume.pdf";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub optimized_resume: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/evaluate
///
/// Multipart form with `job_description` (text) and `resume` (PDF file).
/// Returns the evaluation plus the context needed to optimize afterwards.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EvaluationOutcome>, AppError> {
    let mut job_description: Option<String> = None;
    let mut resume: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_description" => {
                job_description = Some(field.text().await.map_err(|e| {
                    AppError::Validation(format!("Unreadable job_description: {e}"))
                })?)
            }
            "resume" => {
                resume = Some(field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("Unreadable resume upload: {e}"))
                })?)
            }
            other => debug!("Ignoring unexpected multipart field '{other}'"),
        }
    }

    let (document, job_description) = require_inputs(resume, job_description)?;
    let outcome = evaluate_resume(
        state.extractor.clone(),
        &state.llm,
        document,
        job_description,
    )
    .await?;

    Ok(Json(outcome))
}

/// POST /api/v1/optimize
///
/// Rewrites the résumé from an earlier evaluation's context.
pub async fn handle_optimize(
    State(state): State<AppState>,
    Json(context): Json<EvaluationContext>,
) -> Result<Json<OptimizeResponse>, AppError> {
    let optimized_resume = optimize_resume(&state.llm, &context).await?;
    Ok(Json(OptimizeResponse { optimized_resume }))
}

/// POST /api/v1/optimize/download/txt
pub async fn handle_download_txt(Json(request): Json<DownloadRequest>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment(TXT_FILE_NAME)),
        ],
        request.text,
    )
        .into_response()
}

/// POST /api/v1/optimize/download/pdf
pub async fn handle_download_pdf(
    Json(request): Json<DownloadRequest>,
) -> Result<Response, AppError> {
    let pdf = tokio::task::spawn_blocking(move || render_document(&request.text))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, attachment(PDF_FILE_NAME)),
        ],
        pdf,
    )
        .into_response())
}

fn attachment(file_name: &str) -> String {
    format!("attachment; filename=\"{file_name}\"")
}
