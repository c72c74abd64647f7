//! Multipart form handling shared by the analysis endpoints.

use axum::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;

pub mod handlers;

pub const FIELD_PDF: &str = "pdf_file";
pub const FIELD_JOB_DESCRIPTION: &str = "job_description";
pub const FIELD_SIMILARITY: &str = "similarity";
pub const FIELD_FEEDBACK: &str = "feedback";

/// Raw fields of an analysis upload. Unknown parts are ignored.
#[derive(Debug, Default)]
pub struct AnalysisForm {
    pub pdf: Option<Bytes>,
    pub job_description: Option<String>,
    pub similarity: Option<String>,
    pub feedback: Option<String>,
}

impl AnalysisForm {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                FIELD_PDF => form.pdf = Some(field.bytes().await.map_err(multipart_error)?),
                FIELD_JOB_DESCRIPTION => {
                    form.job_description = Some(field.text().await.map_err(multipart_error)?)
                }
                FIELD_SIMILARITY => {
                    form.similarity = Some(field.text().await.map_err(multipart_error)?)
                }
                FIELD_FEEDBACK => form.feedback = Some(field.text().await.map_err(multipart_error)?),
                other => debug!(field = other, "ignoring unknown multipart field"),
            }
        }

        Ok(form)
    }

    pub fn take_pdf(&mut self) -> Result<Bytes, AppError> {
        self.pdf.take().ok_or_else(|| missing(FIELD_PDF))
    }

    /// The job description, which must contain something besides whitespace.
    pub fn take_job_description(&mut self) -> Result<String, AppError> {
        let jd = self
            .job_description
            .take()
            .ok_or_else(|| missing(FIELD_JOB_DESCRIPTION))?;
        if jd.trim().is_empty() {
            return Err(AppError::Validation(format!(
                "{FIELD_JOB_DESCRIPTION} cannot be empty"
            )));
        }
        Ok(jd)
    }

    /// A percentage in `[0, 100]`.
    pub fn take_similarity(&mut self) -> Result<f64, AppError> {
        let raw = self.similarity.take().ok_or_else(|| missing(FIELD_SIMILARITY))?;
        let value: f64 = raw.trim().parse().map_err(|_| {
            AppError::Validation(format!("{FIELD_SIMILARITY} must be a number, got '{raw}'"))
        })?;
        if !(0.0..=100.0).contains(&value) {
            return Err(AppError::Validation(format!(
                "{FIELD_SIMILARITY} must be between 0 and 100, got {value}"
            )));
        }
        Ok(value)
    }

    /// Feedback text; may be blank.
    pub fn take_feedback(&mut self) -> Result<String, AppError> {
        self.feedback.take().ok_or_else(|| missing(FIELD_FEEDBACK))
    }
}

fn missing(field: &str) -> AppError {
    AppError::Validation(format!("missing form field '{field}'"))
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::Validation(format!("malformed upload: {}", e.body_text()))
}
