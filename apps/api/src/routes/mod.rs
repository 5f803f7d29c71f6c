pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::analysis::handlers;
use crate::chat::handlers::handle_chat;
use crate::state::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // One-shot analysis, mirrors the upload-then-score flow
        .route("/api/v1/analysis/extract", post(handlers::handle_extract))
        .route("/api/v1/analysis/score", post(handlers::handle_score))
        // Analysis sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/job-description",
            put(handlers::handle_set_job_description),
        )
        .route(
            "/api/v1/sessions/:id/document",
            put(handlers::handle_select_document).delete(handlers::handle_clear_document),
        )
        .route("/api/v1/sessions/:id/start", post(handlers::handle_start))
        .route("/api/v1/sessions/:id/retry", post(handlers::handle_retry))
        .route("/api/v1/sessions/:id/cancel", post(handlers::handle_cancel))
        // Resume assistant
        .route("/api/v1/chat", post(handle_chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm_client::tests::ScriptedModel;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    pub const TEST_BOUNDARY: &str = "analyzer-test-boundary";

    pub fn test_config() -> Config {
        Config {
            gemini_api_key: "test-key".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            llm_timeout_secs: 5,
            max_upload_bytes: 1024 * 1024,
            session_ttl_secs: 60,
        }
    }

    pub fn test_state(model: Arc<ScriptedModel>) -> AppState {
        AppState::new(test_config(), model)
    }

    pub fn test_app(model: Arc<ScriptedModel>) -> Router {
        build_router(test_state(model))
    }

    pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    /// Single-file multipart body under the field name `file`.
    pub fn multipart_request(
        method: &str,
        uri: &str,
        file_name: &str,
        content_type: &str,
        content: &[u8],
    ) -> Request<Body> {
        let mut body = format!(
            "--{TEST_BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{TEST_BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(method)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={TEST_BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    pub async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let app = test_app(Arc::new(ScriptedModel::replying(&[])));

        let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "analyzer-api");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = test_app(Arc::new(ScriptedModel::replying(&[])));

        let response = app
            .oneshot(empty_request("GET", "/api/v1/unknown"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
