use axum::{
    extract::{Multipart, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::analysis::AnalysisForm;
use crate::errors::AppError;
use crate::extraction::extract_text;
use crate::feedback::generate_feedback;
use crate::report::{assemble, report_filename, AnalysisReport};
use crate::similarity::{SimilarityResult, SimilarityStrategy};
use crate::state::AppState;

#[derive(Serialize)]
pub struct FeedbackResponse {
    pub feedback: String,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub text: String,
}

/// POST /upload-pdf
/// Plain text extraction, no scoring.
pub async fn handle_upload_pdf(multipart: Multipart) -> Result<Json<UploadResponse>, AppError> {
    let mut form = AnalysisForm::from_multipart(multipart).await?;
    let text = extract_text(form.take_pdf()?).await?;
    Ok(Json(UploadResponse { text }))
}

/// POST /analyze
/// Uses the strategy chosen at start-up.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SimilarityResult>, AppError> {
    analyze(&state, None, multipart).await
}

/// POST /analyze/direct
pub async fn handle_analyze_direct(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SimilarityResult>, AppError> {
    analyze(&state, Some(SimilarityStrategy::Direct), multipart).await
}

/// POST /analyze/indexed (also mounted at /analyze/pinecone)
pub async fn handle_analyze_indexed(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SimilarityResult>, AppError> {
    analyze(&state, Some(SimilarityStrategy::Indexed), multipart).await
}

async fn analyze(
    state: &AppState,
    strategy: Option<SimilarityStrategy>,
    multipart: Multipart,
) -> Result<Json<SimilarityResult>, AppError> {
    let mut form = AnalysisForm::from_multipart(multipart).await?;
    let pdf = form.take_pdf()?;
    let job_description = form.take_job_description()?;

    let resume_text = extract_text(pdf).await?;
    let result = match strategy {
        Some(strategy) => {
            state
                .engine
                .compare_with(strategy, &resume_text, &job_description)
                .await?
        }
        None => state.engine.compare(&resume_text, &job_description).await?,
    };

    info!(
        strategy = ?strategy.unwrap_or(state.engine.default_strategy()),
        score = result.score,
        "analysis complete"
    );
    Ok(Json(result))
}

/// POST /feedback
pub async fn handle_feedback(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<FeedbackResponse>, AppError> {
    let llm = state.llm.as_ref().ok_or_else(|| {
        AppError::NotConfigured("feedback requires ANTHROPIC_API_KEY".to_string())
    })?;

    let mut form = AnalysisForm::from_multipart(multipart).await?;
    let pdf = form.take_pdf()?;
    let job_description = form.take_job_description()?;

    let resume_text = extract_text(pdf).await?;
    let feedback = generate_feedback(&resume_text, &job_description, llm).await?;
    Ok(Json(FeedbackResponse { feedback }))
}

/// POST /report
/// Streams back the résumé with an analysis page in front.
pub async fn handle_report(multipart: Multipart) -> Result<Response, AppError> {
    let mut form = AnalysisForm::from_multipart(multipart).await?;
    let pdf = form.take_pdf()?;
    let report = AnalysisReport {
        job_description: form.take_job_description()?,
        similarity: form.take_similarity()?,
        feedback: form.take_feedback()?,
        generated_at: Utc::now(),
    };
    let filename = report_filename(report.generated_at);

    let merged = tokio::task::spawn_blocking(move || assemble(&report, &pdf))
        .await
        .map_err(|e| AppError::Report(format!("report task failed: {e}")))??;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(%filename, bytes = merged.len(), "report generated");
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        merged,
    )
        .into_response())
}
