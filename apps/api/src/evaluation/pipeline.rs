//! Evaluate / optimize actions: extraction → prompt → completion → interpretation.
//!
//! No hidden session: `evaluate_resume` hands back an `EvaluationContext` that the caller
//! passes into `optimize_resume`.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::evaluation::interpreter::{parse_evaluation, EvaluationRecord};
use crate::evaluation::prompts::{build_evaluation_prompt, build_optimization_prompt};
use crate::extraction::{ExtractionMethod, TextExtractor};
use crate::llm_client::CompletionClient;

pub const MISSING_INPUT_MESSAGE: &str = "Please provide both a job description and a PDF resume.";

/// The résumé text and job description an evaluation ran on.
/// Returned by evaluate, required by optimize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluationOutcome {
    pub evaluation: EvaluationRecord,
    /// Gauge value; None when "JD Match" is missing or not a number.
    pub match_score: Option<u32>,
    pub extraction_method: ExtractionMethod,
    pub context: EvaluationContext,
}

/// Checks both inputs are present before any pipeline stage runs.
pub fn require_inputs(
    document: Option<Bytes>,
    job_description: Option<String>,
) -> Result<(Bytes, String), AppError> {
    match (document, job_description) {
        (Some(document), Some(jd)) if !document.is_empty() && !jd.trim().is_empty() => {
            Ok((document, jd))
        }
        _ => Err(AppError::Validation(MISSING_INPUT_MESSAGE.to_string())),
    }
}

pub async fn evaluate_resume(
    extractor: Arc<TextExtractor>,
    llm: &CompletionClient,
    document: Bytes,
    job_description: String,
) -> Result<EvaluationOutcome, AppError> {
    info!("Evaluating resume ({} bytes)", document.len());

    let extracted = extractor.extract_blocking(document).await?;
    if extracted.text.trim().is_empty() {
        return Err(AppError::UnprocessableEntity(
            "No text could be extracted from the uploaded resume".to_string(),
        ));
    }

    let prompt = build_evaluation_prompt(&extracted.text, &job_description);
    let raw = llm.complete(&prompt, true).await?;

    let evaluation = parse_evaluation(&raw);
    if !evaluation.is_parsed() {
        warn!("Could not parse evaluation response, returning raw output");
    }
    let match_score = evaluation.match_percentage();

    Ok(EvaluationOutcome {
        evaluation,
        match_score,
        extraction_method: extracted.method,
        context: EvaluationContext {
            resume_text: extracted.text,
            job_description,
        },
    })
}

pub async fn optimize_resume(
    llm: &CompletionClient,
    context: &EvaluationContext,
) -> Result<String, AppError> {
    if context.resume_text.trim().is_empty() || context.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "Evaluate a resume before optimizing it".to_string(),
        ));
    }

    info!("Optimizing resume ({} chars)", context.resume_text.len());
    let prompt = build_optimization_prompt(&context.resume_text, &context.job_description);
    Ok(llm.complete(&prompt, false).await?)
}
