//! HTTP front end for skillchatd.
//!
//! Exposes skill listing, chat, upload and export as a JSON API. Every `/api`
//! route honours the optional bearer token.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use skillchat_core::request::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use skillchat_core::SkillInfo;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::orchestrator::{
    Attachment, ConverseRequest, ErrorKind, OrchestratorError, SessionOrchestrator,
};
use crate::remote::ApiKey;
use crate::uploads::{UploadError, UploadStore};

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Largest accepted chat body. Uploaded text comes back as JSON-escaped
/// attachment content, which can grow it.
pub const MAX_CHAT_BYTES: usize = 2 * MAX_UPLOAD_BYTES;

/// Header carrying a caller-supplied inference credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared state for HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    pub orchestrator: Arc<SessionOrchestrator>,
    pub uploads: UploadStore,
    pub auth_token: Option<String>,
}

/// Create the HTTP router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/skills", get(list_skills))
        .route(
            "/api/chat",
            post(chat).layer(DefaultBodyLimit::max(MAX_CHAT_BYTES)),
        )
        .route(
            "/api/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/export/{session_id}", get(export_chat))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn start_server(
    state: Arc<AppState>,
    bind_addr: &str,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("HTTP server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Validate auth token if configured.
fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if let Some(expected) = &state.auth_token {
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.strip_prefix("Bearer ").unwrap_or(s));

        match provided {
            Some(token) if token == expected => Ok(()),
            Some(_) => Err(plain_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid auth token")),
            None => Err(plain_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing auth token")),
        }
    } else {
        Ok(())
    }
}

/// Credential from the `X-API-Key` header, if present and non-blank.
fn caller_api_key(headers: &HeaderMap) -> Option<ApiKey> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(ApiKey::new)
}

fn plain_error(status: StatusCode, kind: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            kind: kind.to_string(),
        }),
    )
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::RemoteRequest => StatusCode::BAD_GATEWAY,
        ErrorKind::RemoteUnavailable => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Configuration | ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn orchestrator_error(err: &OrchestratorError) -> ApiError {
    let kind = err.kind();
    plain_error(status_for(kind), kind.as_str(), err.to_string())
}

// --- Request/Response types ---

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

/// Request payload for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub skill_id: Option<String>,
    #[serde(default)]
    pub skill_version: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
}

impl From<ChatRequest> for ConverseRequest {
    fn from(req: ChatRequest) -> Self {
        Self {
            session_id: req.session_id,
            message: req.message,
            skill_id: req.skill_id,
            skill_version: req.skill_version,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            attachments: req.attachments.unwrap_or_default(),
            api_key: None,
        }
    }
}

/// Response for GET /api/skills.
#[derive(Debug, Serialize)]
pub struct ListSkillsResponse {
    pub skills: Vec<SkillInfo>,
}

// --- Handlers ---

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/skills - List skills visible to the caller's `X-API-Key`, or to
/// the configured credential when the header is absent.
async fn list_skills(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    check_auth(&state, &headers)?;

    let api_key = caller_api_key(&headers);
    let skills = state
        .orchestrator
        .list_skills(api_key.as_ref())
        .await
        .map_err(|e| {
            error!("failed to list skills: {}", e);
            orchestrator_error(&e)
        })?;

    Ok(Json(ListSkillsResponse { skills }))
}

/// POST /api/chat - Run one exchange on a session.
///
/// A client disconnect drops this future before anything is appended.
async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    check_auth(&state, &headers)?;

    let Json(req) = payload.map_err(|rejection| {
        warn!("rejected chat body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            plain_error(rejection.status(), "payload_too_large", rejection.body_text())
        } else {
            plain_error(StatusCode::BAD_REQUEST, "bad_request", rejection.body_text())
        }
    })?;

    if req.session_id.is_empty() {
        return Err(plain_error(
            StatusCode::BAD_REQUEST,
            "bad_request",
            "session_id must not be empty",
        ));
    }

    let mut converse = ConverseRequest::from(req);
    converse.api_key = caller_api_key(&headers);

    let result = state
        .orchestrator
        .converse(converse)
        .await
        .map_err(|e| orchestrator_error(&e))?;

    Ok(Json(result))
}

/// POST /api/upload - Store a multipart `file` field.
async fn upload_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    check_auth(&state, &headers)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| plain_error(StatusCode::BAD_REQUEST, "bad_request", e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let media_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| plain_error(StatusCode::BAD_REQUEST, "bad_request", e.to_string()))?;

        let descriptor = state
            .uploads
            .save(&filename, &bytes, media_type.as_deref())
            .await
            .map_err(|e| match e {
                UploadError::InvalidName(_) => {
                    warn!("rejected upload: {}", e);
                    plain_error(StatusCode::BAD_REQUEST, "bad_request", e.to_string())
                }
                UploadError::Io(_) => {
                    error!("failed to store upload: {}", e);
                    plain_error(StatusCode::INTERNAL_SERVER_ERROR, "unexpected", e.to_string())
                }
            })?;

        return Ok(Json(descriptor));
    }

    Err(plain_error(
        StatusCode::BAD_REQUEST,
        "bad_request",
        "missing multipart field 'file'",
    ))
}

/// GET /api/export/{session_id} - Render a session as markdown.
async fn export_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    check_auth(&state, &headers)?;

    let export = state.orchestrator.export(&session_id).map_err(|e| {
        warn!(session_id = %session_id, "export failed: {}", e);
        orchestrator_error(&e)
    })?;

    Ok(Json(export))
}
