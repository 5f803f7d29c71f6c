use std::sync::{Arc, Mutex};

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analysis::orchestrator::{
    self, drive_run, extract_off_thread, AnalysisOrchestrator, RunSnapshot, RunTicket,
};
use crate::analysis::parser;
use crate::analysis::record::{AnalysisRecord, SchemaWarning};
use crate::errors::AppError;
use crate::extraction::UploadedDocument;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    /// Cleaned resume text, passed back verbatim to the score endpoint.
    pub score_result: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub score_result: String,
    #[serde(default)]
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub resume_analysis: AnalysisRecord,
    pub warnings: Vec<SchemaWarning>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptionRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub snapshot: RunSnapshot,
}

// ── one-shot analysis ───────────────────────────────────────────────────────

/// POST /api/v1/analysis/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let document = read_upload(multipart, state.config.max_upload_bytes).await?;
    document.media_type()?;

    let extracted = extract_off_thread(document).await?;
    let score_result = state.analysis.cleanup(&extracted).await?;
    Ok(Json(ExtractResponse { score_result }))
}

/// POST /api/v1/analysis/score
pub async fn handle_score(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    if req.score_result.trim().is_empty() {
        return Err(AppError::Validation(
            "scoreResult cannot be empty".to_string(),
        ));
    }
    if req.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "jobDescription cannot be empty".to_string(),
        ));
    }

    let raw = state
        .analysis
        .score(&req.score_result, &req.job_description)
        .await?;
    let parsed = parser::parse(&raw)?;

    Ok(Json(ScoreResponse {
        resume_analysis: parsed.record,
        warnings: parsed.warnings,
    }))
}

// ── sessions ────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionResponse>) {
    let session_id = Uuid::new_v4();
    let orchestrator = AnalysisOrchestrator::new();
    let snapshot = orchestrator.snapshot();

    state
        .sessions
        .write()
        .await
        .insert(session_id, Arc::new(Mutex::new(orchestrator)));
    info!("Created analysis session {session_id}");

    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            snapshot,
        }),
    )
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(respond(id, &session))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let session = state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or_else(|| session_not_found(id))?;

    // an in-flight run keeps its Arc until it finishes; cancelling makes it inert
    let mut guard = orchestrator::lock(&session);
    info!(
        "Discarding analysis session {id} in phase {:?}",
        guard.state().phase()
    );
    guard.cancel();
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/:id/job-description
pub async fn handle_set_job_description(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<JobDescriptionRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    orchestrator::lock(&session).set_job_description(req.job_description);
    Ok(respond(id, &session))
}

/// PUT /api/v1/sessions/:id/document
pub async fn handle_select_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    let document = read_upload(multipart, state.config.max_upload_bytes).await?;
    orchestrator::lock(&session).select_document(document);
    Ok(respond(id, &session))
}

/// DELETE /api/v1/sessions/:id/document
pub async fn handle_clear_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    orchestrator::lock(&session).clear_document();
    Ok(respond(id, &session))
}

/// POST /api/v1/sessions/:id/start
pub async fn handle_start(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session = find_session(&state, id).await?;
    let ticket = orchestrator::lock(&session).start()?;
    spawn_run(&state, session.clone(), ticket);
    Ok((StatusCode::ACCEPTED, respond(id, &session)))
}

/// POST /api/v1/sessions/:id/retry
pub async fn handle_retry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let session = find_session(&state, id).await?;
    let ticket = orchestrator::lock(&session).retry()?;
    spawn_run(&state, session.clone(), ticket);
    Ok((StatusCode::ACCEPTED, respond(id, &session)))
}

/// POST /api/v1/sessions/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = find_session(&state, id).await?;
    orchestrator::lock(&session).cancel();
    Ok(respond(id, &session))
}

// ── helpers ─────────────────────────────────────────────────────────────────

async fn find_session(
    state: &AppState,
    id: Uuid,
) -> Result<Arc<Mutex<AnalysisOrchestrator>>, AppError> {
    let session = state
        .sessions
        .read()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| session_not_found(id))?;
    orchestrator::lock(&session).touch();
    Ok(session)
}

fn session_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Analysis session {id} not found"))
}

fn respond(id: Uuid, session: &Mutex<AnalysisOrchestrator>) -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: id,
        snapshot: orchestrator::lock(session).snapshot(),
    })
}

fn spawn_run(state: &AppState, session: Arc<Mutex<AnalysisOrchestrator>>, ticket: RunTicket) {
    let client = state.analysis.clone();
    tokio::spawn(async move {
        drive_run(&session, &client, ticket).await;
    });
}

/// Reads the `file` field of a multipart upload, enforcing the size limit.
async fn read_upload(mut multipart: Multipart, limit: usize) -> Result<UploadedDocument, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let declared_type = field.content_type().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        if content.len() > limit {
            return Err(AppError::PayloadTooLarge { limit });
        }
        if content.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        return Ok(UploadedDocument::new(file_name, declared_type, content));
    }

    Err(AppError::Validation(format!(
        "Multipart field '{FILE_FIELD}' is required"
    )))
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { limit }
    } else {
        AppError::Validation(format!("Invalid multipart upload: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use crate::analysis::record::tests::sample_analysis_json;
    use crate::config::Config;
    use crate::extraction::docx::tests::build_docx;
    use crate::extraction::DOCX_MIME;
    use crate::llm_client::tests::ScriptedModel;
    use crate::routes::build_router;
    use crate::routes::tests::{
        empty_request, json_body, json_request, multipart_request, test_app, test_config,
    };
    use crate::state::AppState;
    use axum::http::StatusCode;
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    const RESUME_TEXT: &str = "Experienced engineer with 8 years building distributed systems.";

    fn analysis_reply(ats_score: u32) -> String {
        json!({ "resume_analysis": sample_analysis_json(ats_score) }).to_string()
    }

    async fn call(app: &Router, request: axum::http::Request<axum::body::Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = if status == StatusCode::NO_CONTENT {
            Value::Null
        } else {
            json_body(response).await
        };
        (status, body)
    }

    async fn create_session(app: &Router) -> String {
        let (status, body) = call(app, empty_request("POST", "/api/v1/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    async fn prepare_session(app: &Router, file_name: &str, content_type: &str, content: &[u8]) -> String {
        let id = create_session(app).await;
        let (status, _) = call(
            app,
            json_request(
                "PUT",
                &format!("/api/v1/sessions/{id}/job-description"),
                json!({"jobDescription": "Looking for a senior engineer"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(
            app,
            multipart_request(
                "PUT",
                &format!("/api/v1/sessions/{id}/document"),
                file_name,
                content_type,
                content,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["can_start"], true);
        id
    }

    async fn wait_until_finished(app: &Router, id: &str) -> Value {
        for _ in 0..400 {
            let (_, body) = call(app, empty_request("GET", &format!("/api/v1/sessions/{id}"))).await;
            let status = body["state"]["status"].as_str().unwrap_or_default();
            if status == "succeeded" || status == "failed" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session {id} never finished");
    }

    // ── one-shot endpoints ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_extract_returns_cleaned_text() {
        let model = Arc::new(ScriptedModel::replying(&[RESUME_TEXT]));
        let app = test_app(model.clone());

        let (status, body) = call(
            &app,
            multipart_request(
                "POST",
                "/api/v1/analysis/extract",
                "resume.docx",
                DOCX_MIME,
                &build_docx(&[RESUME_TEXT]),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"scoreResult": RESUME_TEXT}));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_extract_rejects_png_without_remote_call() {
        let model = Arc::new(ScriptedModel::replying(&[]));
        let app = test_app(model.clone());

        let (status, body) = call(
            &app,
            multipart_request("POST", "/api/v1/analysis/extract", "photo.png", "image/png", b"\x89PNG"),
        )
        .await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["code"], "UNSUPPORTED_FORMAT");
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extract_enforces_upload_limit() {
        let model = Arc::new(ScriptedModel::replying(&[]));
        let config = Config {
            max_upload_bytes: 16,
            ..test_config()
        };
        let app = build_router(AppState::new(config, model.clone()));

        let (status, body) = call(
            &app,
            multipart_request("POST", "/api/v1/analysis/extract", "resume.pdf", "application/pdf", &[b'x'; 64]),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_score_returns_record_from_fenced_reply() {
        let reply = format!("```json\n{}\n```", analysis_reply(82));
        let model = Arc::new(ScriptedModel::replying(&[reply.as_str()]));
        let app = test_app(model);

        let (status, body) = call(
            &app,
            json_request(
                "POST",
                "/api/v1/analysis/score",
                json!({"scoreResult": RESUME_TEXT, "jobDescription": "Senior engineer"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resume_analysis"]["ATS_score"], 82);
        assert_eq!(body["warnings"], json!([]));
    }

    #[tokio::test]
    async fn test_score_prose_reply_is_malformed() {
        let model = Arc::new(ScriptedModel::replying(&["This resume is pretty good overall."]));
        let app = test_app(model);

        let (status, body) = call(
            &app,
            json_request(
                "POST",
                "/api/v1/analysis/score",
                json!({"scoreResult": RESUME_TEXT, "jobDescription": "Senior engineer"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "MALFORMED_RESPONSE");
    }

    #[tokio::test]
    async fn test_score_requires_resume_text() {
        let model = Arc::new(ScriptedModel::replying(&[]));
        let app = test_app(model.clone());

        let (status, _) = call(
            &app,
            json_request("POST", "/api/v1/analysis/score", json!({"scoreResult": " "})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_score_requires_job_description() {
        let model = Arc::new(ScriptedModel::replying(&[]));
        let app = test_app(model.clone());

        for body in [
            json!({"scoreResult": RESUME_TEXT, "jobDescription": "   "}),
            json!({"scoreResult": RESUME_TEXT}),
        ] {
            let (status, body) =
                call(&app, json_request("POST", "/api/v1/analysis/score", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["code"], "VALIDATION_ERROR");
        }
        assert_eq!(model.call_count(), 0);
    }

    // ── sessions ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_session_run_succeeds() {
        let reply = analysis_reply(82);
        let model = Arc::new(ScriptedModel::replying(&[RESUME_TEXT, reply.as_str()]));
        let app = test_app(model.clone());
        let id = prepare_session(&app, "resume.docx", DOCX_MIME, &build_docx(&[RESUME_TEXT])).await;

        let (status, body) = call(&app, empty_request("POST", &format!("/api/v1/sessions/{id}/start"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["run_id"], 1);

        let finished = wait_until_finished(&app, &id).await;
        assert_eq!(finished["state"]["status"], "succeeded");
        assert_eq!(finished["state"]["analysis"]["ATS_score"], 82);
        assert_eq!(finished["document"], Value::Null);
        assert_eq!(finished["can_start"], false);
        assert_eq!(
            finished["phases"],
            json!(["uploading", "extracting", "scoring", "succeeded"])
        );
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_session_png_fails_and_retry_is_allowed() {
        let model = Arc::new(ScriptedModel::replying(&[]));
        let app = test_app(model.clone());
        let id = prepare_session(&app, "photo.png", "image/png", b"\x89PNG").await;

        let (status, _) = call(&app, empty_request("POST", &format!("/api/v1/sessions/{id}/start"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let finished = wait_until_finished(&app, &id).await;
        assert_eq!(finished["state"]["kind"], "UnsupportedFormat");
        assert_eq!(model.call_count(), 0);

        let (status, _) = call(&app, empty_request("POST", &format!("/api/v1/sessions/{id}/retry"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_start_without_inputs_is_conflict() {
        let app = test_app(Arc::new(ScriptedModel::replying(&[])));
        let id = create_session(&app).await;

        let (status, body) = call(&app, empty_request("POST", &format!("/api/v1/sessions/{id}/start"))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_retry_before_failure_is_conflict() {
        let app = test_app(Arc::new(ScriptedModel::replying(&[])));
        let id = create_session(&app).await;

        let (status, _) = call(&app, empty_request("POST", &format!("/api/v1/sessions/{id}/retry"))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_clear_document_disables_start() {
        let app = test_app(Arc::new(ScriptedModel::replying(&[])));
        let id = prepare_session(&app, "resume.docx", DOCX_MIME, &build_docx(&[RESUME_TEXT])).await;

        let (status, body) = call(&app, empty_request("DELETE", &format!("/api/v1/sessions/{id}/document"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["can_start"], false);
        assert_eq!(body["document"], Value::Null);
    }

    #[tokio::test]
    async fn test_cancel_idle_session_is_noop() {
        let app = test_app(Arc::new(ScriptedModel::replying(&[])));
        let id = create_session(&app).await;

        let (status, body) = call(&app, empty_request("POST", &format!("/api/v1/sessions/{id}/cancel"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], json!({"status": "idle"}));
    }

    #[tokio::test]
    async fn test_delete_session_then_lookup_is_404() {
        let app = test_app(Arc::new(ScriptedModel::replying(&[])));
        let id = create_session(&app).await;

        let (status, _) = call(&app, empty_request("DELETE", &format!("/api/v1/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call(&app, empty_request("GET", &format!("/api/v1/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
