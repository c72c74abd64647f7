//! Feedback Generator: free-form advice from the generative-text model.
//!
//! Thin wrapper over `LlmClient`: bounds the input size, builds the prompt,
//! and maps failures to `AppError::Generation`.

use tracing::info;

use crate::errors::AppError;
use crate::llm_client::LlmClient;

pub mod prompts;

use prompts::{build_feedback_prompt, FEEDBACK_SYSTEM};

/// Per-document character budget sent to the model.
const MAX_INPUT_CHARS: usize = 12_000;

#[tracing::instrument(name = "generate_feedback", skip_all, fields(model = llm.model()))]
pub async fn generate_feedback(
    resume_text: &str,
    job_description: &str,
    llm: &LlmClient,
) -> Result<String, AppError> {
    if job_description.trim().is_empty() {
        return Err(AppError::Validation("job_description cannot be empty".to_string()));
    }

    let prompt = build_feedback_prompt(
        truncate_chars(resume_text.trim(), MAX_INPUT_CHARS),
        truncate_chars(job_description.trim(), MAX_INPUT_CHARS),
    );

    let feedback = llm
        .call_text(&prompt, FEEDBACK_SYSTEM)
        .await
        .map_err(|e| AppError::Generation(e.to_string()))?;

    info!(chars = feedback.len(), "feedback generated");
    Ok(feedback)
}

/// Cuts `text` to at most `max` characters on a char boundary.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
