//! Session orchestrator.
//!
//! Coordinates one conversational exchange: resolve the skill attachment, build
//! the request from the stored history, call the inference backend, then append
//! the user turn and the reply together. A call that fails, times out or is
//! cancelled leaves the session exactly as it was.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use skillchat_core::request::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use skillchat_core::{
    resolve_attachment, Config, ConfigError, InferenceRequest, InferenceResult, RequestParams,
    SkillInfo, TranscriptExport, Turn,
};
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::remote::{ApiKey, InferenceBackend, RemoteError};
use crate::store::TranscriptStore;

/// Error category, for callers deciding between retry and fail-fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    NotFound,
    RemoteRequest,
    RemoteUnavailable,
    Cancelled,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::NotFound => "not_found",
            Self::RemoteRequest => "remote_request",
            Self::RemoteUnavailable => "remote_unavailable",
            Self::Cancelled => "cancelled",
            Self::Unexpected => "unexpected",
        }
    }

    /// Whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable | Self::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error(
        "API error (HTTP {status}): {message}\n\nPossible issues:\n  - API key might be invalid\n  - Skill ID might be invalid\n  - Skills or code execution beta might not be enabled for this account"
    )]
    RemoteRequest { status: u16, message: String },
    #[error("inference service unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::RemoteRequest { .. } => ErrorKind::RemoteRequest,
            Self::RemoteUnavailable(_) => ErrorKind::RemoteUnavailable,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }
}

impl From<RemoteError> for OrchestratorError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Rejected { status, message } => Self::RemoteRequest { status, message },
            RemoteError::Unavailable(message) => Self::RemoteUnavailable(message),
            RemoteError::Unexpected(message) => Self::Unexpected(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// A file previously stored through the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Attachment {
    pub filename: String,
    /// Decoded text for textual uploads.
    #[serde(default)]
    pub content: Option<String>,
}

/// Input to [`SessionOrchestrator::converse`].
#[derive(Debug, Clone)]
pub struct ConverseRequest {
    pub session_id: String,
    pub message: String,
    pub skill_id: Option<String>,
    pub skill_version: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub attachments: Vec<Attachment>,
    /// Caller credential; the backend's configured key is used when absent.
    pub api_key: Option<ApiKey>,
}

impl ConverseRequest {
    pub fn new(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            skill_id: None,
            skill_version: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            attachments: Vec::new(),
            api_key: None,
        }
    }

    pub fn with_skill(mut self, skill_id: impl Into<String>) -> Self {
        self.skill_id = Some(skill_id.into());
        self
    }

    pub fn with_skill_version(mut self, version: impl Into<String>) -> Self {
        self.skill_version = Some(version.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

/// User turn text: the message followed by any attachments.
fn compose_user_content(message: &str, attachments: &[Attachment]) -> String {
    let mut content = message.to_string();
    for attachment in attachments {
        match &attachment.content {
            Some(text) => {
                let _ = write!(
                    content,
                    "\n\n[Attachment: {}]\n```\n{}\n```",
                    attachment.filename,
                    text.trim_end()
                );
            }
            None => {
                let _ = write!(content, "\n\n[Attachment: {} (not inlined)]", attachment.filename);
            }
        }
    }
    content
}

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub model: String,
    pub request_timeout: Duration,
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_sec),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Per-session async locks. Entries are dropped once nobody holds or waits on them.
#[derive(Debug, Default)]
struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(&self, session_id: &str) -> SessionGuard<'_> {
        let lock = Arc::clone(self.map().entry(session_id.to_string()).or_default());
        let mut guard = SessionGuard {
            locks: self,
            session_id: session_id.to_string(),
            held: None,
        };
        guard.held = Some(lock.lock_owned().await);
        guard
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

struct SessionGuard<'a> {
    locks: &'a SessionLocks,
    session_id: String,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        let mut map = self.locks.map();
        if map
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.session_id);
        }
    }
}

/// Public coordinator over the transcript store and the inference backend.
pub struct SessionOrchestrator {
    store: Arc<TranscriptStore>,
    backend: Arc<dyn InferenceBackend>,
    config: OrchestratorConfig,
    locks: SessionLocks,
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("config", &self.config)
            .field("sessions", &self.store.session_count())
            .finish_non_exhaustive()
    }
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<TranscriptStore>,
        backend: Arc<dyn InferenceBackend>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            backend,
            config,
            locks: SessionLocks::default(),
        }
    }

    pub fn store(&self) -> &Arc<TranscriptStore> {
        &self.store
    }

    /// Run one exchange on a session.
    pub async fn converse(&self, req: ConverseRequest) -> Result<InferenceResult> {
        self.converse_with_cancel(req, CancellationToken::new()).await
    }

    /// Run one exchange, aborting without side effects if `cancel` fires first.
    pub async fn converse_with_cancel(
        &self,
        req: ConverseRequest,
        cancel: CancellationToken,
    ) -> Result<InferenceResult> {
        let _session = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
            guard = self.locks.acquire(&req.session_id) => guard,
        };

        let skill = resolve_attachment(req.skill_id.as_deref(), req.skill_version.as_deref());
        let history = self.store.get(&req.session_id);
        let user_turn = Turn::user(compose_user_content(&req.message, &req.attachments));

        let params = RequestParams::new(self.config.model.as_str())
            .with_temperature(req.temperature)
            .with_max_tokens(req.max_tokens);
        let request = InferenceRequest::build(&history, &user_turn, params, skill);

        info!(
            session_id = %req.session_id,
            history = history.len(),
            skill_id = request.skill().map(|s| s.skill_id()),
            skill_kind = request.skill().map(|s| s.kind().as_str()),
            "converse"
        );

        let timeout = self.config.request_timeout;
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(session_id = %req.session_id, "converse cancelled");
                return Err(OrchestratorError::Cancelled);
            }
            outcome = tokio::time::timeout(
                timeout,
                self.backend.complete(&request, req.api_key.as_ref()),
            ) => outcome,
        };

        let reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                let err = OrchestratorError::from(e);
                warn!(session_id = %req.session_id, kind = err.kind().as_str(), error = %err, "converse failed");
                return Err(err);
            }
            Err(_) => {
                warn!(session_id = %req.session_id, timeout_sec = timeout.as_secs(), "converse timed out");
                return Err(OrchestratorError::RemoteUnavailable(format!(
                    "no response within {}s",
                    timeout.as_secs()
                )));
            }
        };

        let result = InferenceResult::from(reply);
        self.store.append_exchange(
            &req.session_id,
            user_turn,
            Turn::assistant(result.response_text.as_str()),
        );

        info!(
            session_id = %req.session_id,
            input_tokens = result.usage.input_tokens,
            output_tokens = result.usage.output_tokens,
            "converse complete"
        );
        Ok(result)
    }

    /// Pass-through listing of skills visible to the credential.
    pub async fn list_skills(&self, api_key: Option<&ApiKey>) -> Result<Vec<SkillInfo>> {
        let timeout = self.config.request_timeout;
        match tokio::time::timeout(timeout, self.backend.list_skills(api_key)).await {
            Ok(result) => result.map_err(OrchestratorError::from),
            Err(_) => Err(OrchestratorError::RemoteUnavailable(format!(
                "no response within {}s",
                timeout.as_secs()
            ))),
        }
    }

    /// Render a session as markdown. Unknown sessions are not created.
    pub fn export(&self, session_id: &str) -> Result<TranscriptExport> {
        let turns = self
            .store
            .turns_if_exists(session_id)
            .ok_or_else(|| OrchestratorError::NotFound(session_id.to_string()))?;
        Ok(TranscriptExport::render(&turns, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skillchat_core::{ContentFragment, InferenceReply, Role, TokenUsage};

    /// Backend that echoes the last message, optionally after a delay or failing.
    #[derive(Default)]
    struct ScriptedBackend {
        delay: Option<Duration>,
        fail_with: Option<fn() -> RemoteError>,
        requests: Mutex<Vec<InferenceRequest>>,
        keys: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedBackend {
        fn failing(fail_with: fn() -> RemoteError) -> Self {
            Self {
                fail_with: Some(fail_with),
                ..Self::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        fn recorded(&self) -> Vec<InferenceRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl InferenceBackend for ScriptedBackend {
        async fn complete(
            &self,
            request: &InferenceRequest,
            api_key: Option<&ApiKey>,
        ) -> std::result::Result<InferenceReply, RemoteError> {
            self.requests.lock().unwrap().push(request.clone());
            self.keys
                .lock()
                .unwrap()
                .push(api_key.map(|k| k.expose().to_string()));
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            let last = request.messages().last().unwrap().content.clone();
            Ok(InferenceReply {
                fragments: vec![
                    ContentFragment::Text {
                        text: "echo: ".to_string(),
                    },
                    ContentFragment::Text { text: last },
                ],
                usage: TokenUsage {
                    input_tokens: 7,
                    output_tokens: 3,
                },
            })
        }

        async fn list_skills(
            &self,
            api_key: Option<&ApiKey>,
        ) -> std::result::Result<Vec<SkillInfo>, RemoteError> {
            self.keys
                .lock()
                .unwrap()
                .push(api_key.map(|k| k.expose().to_string()));
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            Ok(Vec::new())
        }
    }

    fn orchestrator(backend: Arc<ScriptedBackend>) -> SessionOrchestrator {
        orchestrator_with_timeout(backend, Duration::from_secs(5))
    }

    fn orchestrator_with_timeout(
        backend: Arc<ScriptedBackend>,
        request_timeout: Duration,
    ) -> SessionOrchestrator {
        SessionOrchestrator::new(
            Arc::new(TranscriptStore::new()),
            backend,
            OrchestratorConfig {
                model: "claude-test".to_string(),
                request_timeout,
            },
        )
    }

    fn rejected() -> RemoteError {
        RemoteError::Rejected {
            status: 400,
            message: "invalid skill".to_string(),
        }
    }

    fn unavailable() -> RemoteError {
        RemoteError::Unavailable("connection refused".to_string())
    }

    #[tokio::test]
    async fn successful_calls_append_alternating_pairs() {
        let orch = orchestrator(Arc::new(ScriptedBackend::default()));

        for i in 0..4 {
            let result = orch
                .converse(ConverseRequest::new("s", format!("msg {i}")))
                .await
                .unwrap();
            assert_eq!(result.response_text, format!("echo: msg {i}"));
            assert_eq!(result.usage.input_tokens, 7);
        }

        let turns = orch.store().get("s");
        assert_eq!(turns.len(), 8);
        for (i, turn) in turns.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected);
        }
        assert_eq!(turns[7].content, "echo: msg 3");
    }

    #[tokio::test]
    async fn history_is_sent_with_new_turn_last() {
        let backend = Arc::new(ScriptedBackend::default());
        let orch = orchestrator(Arc::clone(&backend));

        orch.converse(ConverseRequest::new("s", "first")).await.unwrap();
        orch.converse(ConverseRequest::new("s", "second")).await.unwrap();

        let requests = backend.recorded();
        let contents: Vec<_> = requests[1]
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "echo: first", "second"]);
        assert_eq!(requests[1].model(), "claude-test");
    }

    #[tokio::test]
    async fn remote_rejection_leaves_history_untouched() {
        let orch = orchestrator(Arc::new(ScriptedBackend::failing(rejected)));
        orch.store().append("s", Turn::user("earlier"));
        orch.store().append("s", Turn::assistant("reply"));

        let err = orch
            .converse(ConverseRequest::new("s", "boom").with_skill("skill_bad"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteRequest);
        assert!(err.to_string().contains("invalid skill"));
        assert!(err.to_string().contains("Possible issues"));
        assert_eq!(orch.store().turn_count("s"), 2);
    }

    #[tokio::test]
    async fn unavailable_failure_creates_no_session() {
        let orch = orchestrator(Arc::new(ScriptedBackend::failing(unavailable)));

        let err = orch
            .converse(ConverseRequest::new("fresh", "hello"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
        assert!(err.kind().is_retryable());
        assert!(!orch.store().contains("fresh"));
    }

    #[tokio::test]
    async fn timeout_is_unavailable_and_appends_nothing() {
        let orch = orchestrator_with_timeout(
            Arc::new(ScriptedBackend::slow(Duration::from_secs(10))),
            Duration::from_millis(20),
        );

        let err = orch
            .converse(ConverseRequest::new("s", "slow"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteUnavailable);
        assert_eq!(orch.store().turn_count("s"), 0);
    }

    #[tokio::test]
    async fn cancellation_appends_nothing() {
        let orch = orchestrator(Arc::new(ScriptedBackend::slow(Duration::from_secs(10))));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = orch
            .converse_with_cancel(ConverseRequest::new("s", "never"), cancel)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(orch.store().turn_count("s"), 0);
    }

    #[tokio::test]
    async fn dropped_future_appends_nothing() {
        let orch = orchestrator(Arc::new(ScriptedBackend::slow(Duration::from_secs(10))));

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            orch.converse(ConverseRequest::new("s", "abandoned")),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(orch.store().turn_count("s"), 0);
    }

    #[tokio::test]
    async fn skill_reaches_backend_with_capability() {
        let backend = Arc::new(ScriptedBackend::default());
        let orch = orchestrator(Arc::clone(&backend));

        orch.converse(ConverseRequest::new("s", "with skill").with_skill("skill_01x"))
            .await
            .unwrap();
        orch.converse(ConverseRequest::new("s", "without")).await.unwrap();

        let requests = backend.recorded();
        assert!(requests[0].code_execution_enabled());
        assert_eq!(requests[0].skill().unwrap().skill_id(), "skill_01x");
        assert!(!requests[1].code_execution_enabled());
        assert!(requests[1].skill().is_none());
    }

    #[tokio::test]
    async fn distinct_sessions_do_not_cross_contaminate() {
        let orch = Arc::new(orchestrator(Arc::new(ScriptedBackend::slow(
            Duration::from_millis(10),
        ))));

        let a = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.converse(ConverseRequest::new("alpha", "from alpha")).await })
        };
        let b = {
            let orch = Arc::clone(&orch);
            tokio::spawn(async move { orch.converse(ConverseRequest::new("beta", "from beta")).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let alpha = orch.store().get("alpha");
        let beta = orch.store().get("beta");
        assert_eq!(alpha.len(), 2);
        assert_eq!(beta.len(), 2);
        assert_eq!(alpha[0].content, "from alpha");
        assert_eq!(alpha[1].content, "echo: from alpha");
        assert_eq!(beta[0].content, "from beta");
        assert_eq!(beta[1].content, "echo: from beta");
    }

    #[tokio::test]
    async fn same_session_calls_are_serialized() {
        let backend = Arc::new(ScriptedBackend::slow(Duration::from_millis(10)));
        let orch = Arc::new(orchestrator(Arc::clone(&backend)));

        let handles: Vec<_> = (0..3)
            .map(|i| {
                let orch = Arc::clone(&orch);
                tokio::spawn(async move {
                    orch.converse(ConverseRequest::new("shared", format!("m{i}")))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let turns = orch.store().get("shared");
        assert_eq!(turns.len(), 6);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].content, format!("echo: {}", pair[0].content));
        }
        // Each request saw every previously completed exchange.
        let sizes: Vec<_> = backend
            .recorded()
            .iter()
            .map(|r| r.messages().len())
            .collect();
        assert_eq!(sizes, vec![1, 3, 5]);
        assert_eq!(orch.locks.len(), 0);
    }

    #[tokio::test]
    async fn attachments_are_inlined_into_user_turn() {
        let orch = orchestrator(Arc::new(ScriptedBackend::default()));
        let attachments = vec![
            Attachment {
                filename: "notes.txt".to_string(),
                content: Some("line one\n".to_string()),
            },
            Attachment {
                filename: "photo.png".to_string(),
                content: None,
            },
        ];

        orch.converse(ConverseRequest::new("s", "see files").with_attachments(attachments))
            .await
            .unwrap();

        let user = &orch.store().get("s")[0];
        assert!(user.content.starts_with("see files"));
        assert!(user
            .content
            .contains("[Attachment: notes.txt]\n```\nline one\n```"));
        assert!(user.content.contains("[Attachment: photo.png (not inlined)]"));
    }

    #[tokio::test]
    async fn export_unknown_session_is_not_found() {
        let orch = orchestrator(Arc::new(ScriptedBackend::default()));
        let err = orch.export("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!orch.store().contains("missing"));
    }

    #[tokio::test]
    async fn export_renders_conversation_in_order() {
        let orch = orchestrator(Arc::new(ScriptedBackend::default()));
        orch.converse(ConverseRequest::new("s", "hi")).await.unwrap();

        let export = orch.export("s").unwrap();
        let user = export.markdown.find("\nhi\n").unwrap();
        let reply = export.markdown.find("\necho: hi\n").unwrap();
        assert!(user < reply);
        assert!(export.filename.starts_with("chat_export_"));
    }

    #[tokio::test]
    async fn list_skills_maps_errors() {
        let orch = orchestrator(Arc::new(ScriptedBackend::failing(rejected)));
        let err = orch.list_skills(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteRequest);
    }

    #[tokio::test]
    async fn caller_key_reaches_backend() {
        let backend = Arc::new(ScriptedBackend::default());
        let orch = orchestrator(Arc::clone(&backend));
        let key = ApiKey::new("sk-user").unwrap();

        orch.converse(ConverseRequest::new("s", "hi").with_api_key(key.clone()))
            .await
            .unwrap();
        orch.converse(ConverseRequest::new("s", "again")).await.unwrap();
        orch.list_skills(Some(&key)).await.unwrap();

        assert_eq!(
            *backend.keys.lock().unwrap(),
            vec![Some("sk-user".to_string()), None, Some("sk-user".to_string())]
        );
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(OrchestratorError::NotFound("x".into()).kind().as_str(), "not_found");
        assert_eq!(
            OrchestratorError::from(ConfigError::MissingApiKey).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            OrchestratorError::from(RemoteError::Unexpected("bad json".into())).kind(),
            ErrorKind::Unexpected
        );
        assert!(!ErrorKind::RemoteRequest.is_retryable());
    }
}
