//! PDF text extraction: turns uploaded résumé bytes into plain text.
//!
//! `pdf-extract` is CPU-bound and may panic on malformed input, so it runs
//! inside `spawn_blocking`; a panic surfaces as a `JoinError` and is reported
//! as an extraction failure instead of taking the worker down.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extracts all page text from an in-memory PDF.
pub async fn extract_text(pdf: Bytes) -> Result<String, AppError> {
    if pdf.is_empty() {
        return Err(AppError::Extraction("uploaded file is empty".to_string()));
    }
    if !looks_like_pdf(&pdf) {
        return Err(AppError::Extraction("uploaded file is not a PDF".to_string()));
    }

    let size = pdf.len();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await
        .map_err(|e| {
            warn!("PDF extraction task aborted: {e}");
            AppError::Extraction("the PDF could not be parsed".to_string())
        })?
        .map_err(|e| AppError::Extraction(e.to_string()))?;

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Extraction(
            "the PDF contains no extractable text (is it a scanned image?)".to_string(),
        ));
    }

    debug!(bytes = size, chars = text.len(), "extracted résumé text");
    Ok(text)
}

/// The header may be preceded by up to 1 KiB of junk per the PDF spec.
fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_pdf() {
        assert!(looks_like_pdf(b"%PDF-1.7\n..."));
        assert!(looks_like_pdf(b"\xef\xbb\xbf%PDF-1.4"));
        assert!(!looks_like_pdf(b"PK\x03\x04 zip file"));
        assert!(!looks_like_pdf(b""));
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let err = extract_text(Bytes::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_non_pdf_rejected() {
        let err = extract_text(Bytes::from_static(b"just some text"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_truncated_pdf_is_extraction_error() {
        let err = extract_text(Bytes::from_static(b"%PDF-1.4\n1 0 obj\n<<"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_text_layer_extracted() {
        let pdf = crate::report::sample_text_pdf(&["Rust systems engineer", "Tokio and Axum"]);
        let text = extract_text(Bytes::from(pdf)).await.unwrap();
        assert!(text.contains("Rust systems engineer"));
        assert!(text.contains("Tokio and Axum"));
    }

    #[tokio::test]
    async fn test_blank_pdf_has_no_text() {
        let err = extract_text(Bytes::from(crate::report::sample_pdf(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }
}
