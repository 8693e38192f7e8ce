//! HTTP client for the skillchatd daemon.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use skillchat_core::{InferenceResult, SkillInfo, TranscriptExport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running at {addr}\n  → start with: skillchatd\n  → or set SKILLCHATD_ADDR if using a different address")]
    ConnectionFailed { addr: String },

    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    /// The daemon classified the failure; `kind` is its stable error kind.
    #[error("{kind} (HTTP {status}): {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("unauthorized: check SKILLCHATD_TOKEN env var or --token flag")]
    Unauthorized,

    #[error(
        "daemon not ready after {timeout_ms}ms at {addr}\n  → ensure skillchatd is running\n  → check SKILLCHATD_TOKEN if auth is enabled"
    )]
    DaemonNotReady { addr: String, timeout_ms: u64 },
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            let addr = e
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            ClientError::ConnectionFailed { addr }
        } else {
            ClientError::HttpError {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            }
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::IoError(e.to_string())
    }
}

/// Request payload for POST /api/chat.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Response from the skills endpoint.
#[derive(Debug, Deserialize)]
pub struct ListSkillsResponse {
    pub skills: Vec<SkillInfo>,
}

/// Error response from API.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub kind: Option<String>,
}

/// Default total timeout for the daemon readiness probe.
const DEFAULT_READY_TIMEOUT_MS: u64 = 5000;

/// Initial backoff delay for the readiness probe.
const INITIAL_BACKOFF_MS: u64 = 200;

/// HTTP client for skillchatd.
#[derive(Debug)]
pub struct Client {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            http: reqwest::Client::new(),
        }
    }

    /// Probe /health. Err only when the connection itself fails.
    pub async fn check_health(&self) -> Result<bool, ClientError> {
        let url = format!("{}/health", self.base_url);
        let response = self.http.get(&url).headers(self.headers()).send().await?;
        Ok(response.status().is_success())
    }

    /// Wait for the daemon to become ready, 5s total, backoff from 200ms.
    pub async fn wait_for_ready(&self) -> Result<(), ClientError> {
        self.wait_for_ready_with_timeout(DEFAULT_READY_TIMEOUT_MS)
            .await
    }

    /// Wait for the daemon to become ready with a custom timeout.
    pub async fn wait_for_ready_with_timeout(&self, timeout_ms: u64) -> Result<(), ClientError> {
        let start = std::time::Instant::now();
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            match self.check_health().await {
                Ok(true) => return Ok(()),
                Ok(false) | Err(_) => {
                    let elapsed = start.elapsed().as_millis() as u64;
                    if elapsed >= timeout_ms {
                        return Err(ClientError::DaemonNotReady {
                            addr: self.base_url.clone(),
                            timeout_ms,
                        });
                    }

                    eprintln!(
                        "waiting for daemon at {} (retrying in {}ms)",
                        self.base_url, backoff_ms
                    );

                    let remaining = timeout_ms.saturating_sub(elapsed);
                    let sleep_ms = backoff_ms.min(remaining);
                    tokio::time::sleep(std::time::Duration::from_millis(sleep_ms)).await;

                    backoff_ms = backoff_ms.saturating_mul(2);
                }
            }
        }
    }

    /// Build headers with optional auth token.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    /// Handle error response from API.
    async fn handle_error(&self, response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();

        if status == 401 {
            return ClientError::Unauthorized;
        }

        let body = response.json::<ErrorResponse>().await.ok();
        classify_error(status, body)
    }

    /// List skills visible to the daemon's credential.
    /// GET /api/skills
    pub async fn list_skills(&self) -> Result<Vec<SkillInfo>, ClientError> {
        let url = format!("{}/api/skills", self.base_url);
        let response = self.http.get(&url).headers(self.headers()).send().await?;

        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }

        let body: ListSkillsResponse = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        Ok(body.skills)
    }

    /// Run one exchange.
    /// POST /api/chat
    pub async fn chat(&self, req: &ChatRequest) -> Result<InferenceResult, ClientError> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .http
            .post(&url)
            .headers(self.headers())
            .json(req)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Export a session transcript.
    /// GET /api/export/{session_id}
    pub async fn export(&self, session_id: &str) -> Result<TranscriptExport, ClientError> {
        let response = self
            .http
            .get(self.export_url(session_id))
            .headers(self.headers())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    fn export_url(&self, session_id: &str) -> String {
        format!(
            "{}/api/export/{}",
            self.base_url,
            urlencoding::encode(session_id)
        )
    }
}

fn classify_error(status: u16, body: Option<ErrorResponse>) -> ClientError {
    match body {
        Some(ErrorResponse { error, .. }) if status == 404 => ClientError::SessionNotFound(error),
        Some(ErrorResponse {
            error,
            kind: Some(kind),
        }) => ClientError::Api {
            status,
            kind,
            message: error,
        },
        Some(ErrorResponse { error, kind: None }) => ClientError::HttpError {
            status,
            message: error,
        },
        None => ClientError::HttpError {
            status,
            message: "unknown error".to_string(),
        },
    }
}
