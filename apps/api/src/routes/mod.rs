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
        .route("/upload-pdf", post(handlers::handle_upload_pdf))
        // Similarity
        .route("/analyze", post(handlers::handle_analyze))
        .route("/analyze/direct", post(handlers::handle_analyze_direct))
        .route("/analyze/indexed", post(handlers::handle_analyze_indexed))
        // Path used by the existing web client
        .route("/analyze/pinecone", post(handlers::handle_analyze_indexed))
        // Feedback + report
        .route("/feedback", post(handlers::handle_feedback))
        .route("/report", post(handlers::handle_report))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::embedding::HashingEmbedder;
    use crate::report::{sample_pdf, sample_text_pdf};
    use crate::similarity::{ConsistencyPolicy, SimilarityEngine, NO_MATCH_WARNING};
    use crate::text::StopWords;
    use crate::vector_store::InMemoryVectorStore;

    const BOUNDARY: &str = "resumatch-test-boundary";

    fn test_engine(config: &Config) -> SimilarityEngine {
        SimilarityEngine::new(
            Arc::new(HashingEmbedder::new(config.embedding_dimension)),
            StopWords::default(),
            config.embedding_dimension,
        )
    }

    fn test_state() -> AppState {
        let config = Config::test_default();
        let engine = test_engine(&config);
        AppState {
            config,
            engine,
            llm: None,
        }
    }

    /// Indexed engine whose writes never become visible within the wait.
    fn lagging_index_state() -> AppState {
        let config = Config::test_default();
        let store = Arc::new(InMemoryVectorStore::with_indexing_lag(Duration::from_secs(3600)));
        let engine = test_engine(&config).with_store(store, ConsistencyPolicy::fixed(Duration::ZERO));
        AppState {
            config,
            engine,
            llm: None,
        }
    }

    const RESUME_LINES: &[&str] = &[
        "Senior backend engineer",
        "Five years of Python and FastAPI services",
    ];
    const JD: &str = "Looking for a Python backend engineer with FastAPI experience";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"resume.pdf\"\r\n\
                             Content-Type: application/pdf\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post(uri: &str, parts: &[Part<'_>]) -> Response {
        post_to(test_state(), uri, parts).await
    }

    async fn post_to(state: AppState, uri: &str, parts: &[Part<'_>]) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        build_router(state).oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "resumatch-api");
        assert_eq!(body["strategy"], "direct");
        assert_eq!(body["feedback_enabled"], false);
    }

    #[tokio::test]
    async fn test_analyze_missing_pdf_is_bad_request() {
        let response = post(
            "/analyze",
            &[Part::Text("job_description", "Rust backend engineer")],
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["error"].as_str().unwrap().contains("pdf_file"));
    }

    #[tokio::test]
    async fn test_analyze_missing_job_description_is_bad_request() {
        let pdf = sample_pdf(1);
        let response = post("/analyze/direct", &[Part::File("pdf_file", &pdf)]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_non_pdf_is_unprocessable() {
        let response = post(
            "/analyze/direct",
            &[
                Part::File("pdf_file", b"plain text pretending to be a resume"),
                Part::Text("job_description", "Rust backend engineer"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["code"], "EXTRACTION_ERROR");
    }

    #[tokio::test]
    async fn test_feedback_without_llm_is_not_configured() {
        let pdf = sample_pdf(1);
        let response = post(
            "/feedback",
            &[
                Part::File("pdf_file", &pdf),
                Part::Text("job_description", "Rust backend engineer"),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(json_body(response).await["code"], "NOT_CONFIGURED");
    }

    #[tokio::test]
    async fn test_report_returns_pdf_attachment() {
        let pdf = sample_pdf(1);
        let response = post(
            "/report",
            &[
                Part::File("pdf_file", &pdf),
                Part::Text("job_description", "Rust backend engineer"),
                Part::Text("similarity", "71.25"),
                Part::Text("feedback", "Lead with your Tokio work."),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"resume_analysis_"));
        assert!(disposition.ends_with(".pdf\""));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let merged = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(merged.get_pages().len(), 2);
    }

    #[tokio::test]
    async fn test_report_rejects_out_of_range_similarity() {
        let pdf = sample_pdf(1);
        let response = post(
            "/report",
            &[
                Part::File("pdf_file", &pdf),
                Part::Text("job_description", "Rust backend engineer"),
                Part::Text("similarity", "140"),
                Part::Text("feedback", ""),
            ],
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_direct_response_contract() {
        let pdf = sample_text_pdf(RESUME_LINES);
        let response = post(
            "/analyze/direct",
            &[Part::File("pdf_file", &pdf), Part::Text("job_description", JD)],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let score = body["similarity"].as_f64().unwrap();
        assert!(score > 0.0 && score <= 100.0, "score {score}");
        assert!(body.get("score").is_none());
        assert_eq!(body["job_description"], JD);
        assert!(body["resume_text"].as_str().unwrap().contains("FastAPI"));
        assert!(body.get("warning").is_none());
    }

    #[tokio::test]
    async fn test_analyze_indexed_no_match_contract() {
        let pdf = sample_text_pdf(RESUME_LINES);
        let response = post_to(
            lagging_index_state(),
            "/analyze/indexed",
            &[Part::File("pdf_file", &pdf), Part::Text("job_description", JD)],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["similarity"].as_f64(), Some(0.0));
        assert_eq!(body["warning"], NO_MATCH_WARNING);
        assert_eq!(body["job_description"], JD);
        assert!(body["resume_text"].as_str().unwrap().contains("Python"));
    }

    #[tokio::test]
    async fn test_analyze_pinecone_path_uses_indexed_strategy() {
        let pdf = sample_text_pdf(RESUME_LINES);
        let response = post_to(
            lagging_index_state(),
            "/analyze/pinecone",
            &[Part::File("pdf_file", &pdf), Part::Text("job_description", JD)],
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        // Only the indexed path can produce the no-match warning.
        assert_eq!(json_body(response).await["warning"], NO_MATCH_WARNING);
    }

    #[tokio::test]
    async fn test_analyze_indexed_without_store_is_not_configured() {
        let pdf = sample_text_pdf(RESUME_LINES);
        let response = post(
            "/analyze/indexed",
            &[Part::File("pdf_file", &pdf), Part::Text("job_description", JD)],
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_upload_pdf_returns_text() {
        let pdf = sample_text_pdf(RESUME_LINES);
        let response = post("/upload-pdf", &[Part::File("pdf_file", &pdf)]).await;
        assert_eq!(response.status(), StatusCode::OK);
        let text = json_body(response).await["text"].as_str().unwrap().to_string();
        assert!(text.contains("Senior backend engineer"));
        assert!(text.contains("FastAPI"));
    }

    #[tokio::test]
    async fn test_upload_pdf_rejects_non_pdf() {
        let response = post("/upload-pdf", &[Part::File("pdf_file", b"hello")]).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let response = build_router(test_state()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
