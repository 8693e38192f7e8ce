//! skillchatd - skill-aware chat orchestration daemon
//!
//! Library components for the daemon process: transcript store, session
//! orchestrator, inference backend, upload storage and the HTTP front end.

pub mod orchestrator;
pub mod remote;
pub mod server;
pub mod store;
pub mod uploads;

use std::path::PathBuf;
use std::sync::Arc;

use orchestrator::{OrchestratorConfig, SessionOrchestrator};
use remote::{AnthropicBackend, InferenceBackend};
use server::AppState;
use skillchat_core::{Config, ConfigError};
use store::TranscriptStore;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uploads::UploadStore;

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// `host:port` for the HTTP server.
    pub bind_addr: String,
    /// Auth token for the HTTP API (optional).
    pub auth_token: Option<String>,
    /// Directory for uploaded attachments.
    pub upload_dir: PathBuf,
    /// Session cap for the transcript store (0 = unbounded).
    pub max_sessions: usize,
    pub orchestrator: OrchestratorConfig,
}

impl DaemonConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            bind_addr: config.bind_addr(),
            auth_token: config.auth_token.clone(),
            upload_dir: config.upload_dir.clone(),
            max_sessions: config.max_sessions,
            orchestrator: OrchestratorConfig::from_config(config),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Daemon state.
#[derive(Debug)]
pub struct Daemon {
    config: DaemonConfig,
    state: Arc<AppState>,
    shutdown: CancellationToken,
}

impl Daemon {
    /// Create a daemon around an explicit inference backend.
    pub fn new(config: DaemonConfig, backend: Arc<dyn InferenceBackend>) -> Self {
        let store = Arc::new(TranscriptStore::with_max_sessions(config.max_sessions));
        let orchestrator = Arc::new(SessionOrchestrator::new(
            store,
            backend,
            config.orchestrator.clone(),
        ));

        let state = Arc::new(AppState {
            orchestrator,
            uploads: UploadStore::new(config.upload_dir.clone()),
            auth_token: config.auth_token.clone(),
        });

        Self {
            config,
            state,
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a daemon backed by the hosted API. Fails if the API key is
    /// missing or still the placeholder.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?;
        let backend = Arc::new(AnthropicBackend::new(api_key, &config.api_base_url));
        Ok(Self::new(DaemonConfig::from_config(config), backend))
    }

    /// Get a reference to the orchestrator.
    pub fn orchestrator(&self) -> &Arc<SessionOrchestrator> {
        &self.state.orchestrator
    }

    /// Serve HTTP until shutdown is requested.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!("skillchatd starting on {}", self.config.bind_addr);
        info!("model: {}", self.config.orchestrator.model);
        info!(
            "request timeout: {}s",
            self.config.orchestrator.request_timeout.as_secs()
        );
        info!("upload dir: {}", self.config.upload_dir.display());
        if self.config.max_sessions > 0 {
            info!("session cap: {}", self.config.max_sessions);
        }
        if self.config.auth_token.is_some() {
            info!("auth token: enabled");
        }

        server::start_server(
            Arc::clone(&self.state),
            &self.config.bind_addr,
            self.shutdown.clone(),
        )
        .await
    }

    /// Signal the daemon to shut down.
    pub fn shutdown(&self) {
        info!("shutdown requested");
        self.shutdown.cancel();
    }
}
