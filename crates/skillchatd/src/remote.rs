//! Remote inference capability.
//!
//! [`InferenceBackend`] is the seam between the orchestrator and the hosted
//! service. [`AnthropicBackend`] speaks the Messages and Skills HTTP APIs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use skillchat_core::request::{
    RequestMessage, CODE_EXECUTION_TOOL_NAME, CODE_EXECUTION_TOOL_TYPE, SKILLS_BETA,
};
use skillchat_core::{
    ContentFragment, InferenceReply, InferenceRequest, SkillInfo, SkillKind, TokenUsage, ToolUse,
};
use thiserror::Error;
use tracing::debug;

/// API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Classified failure from the remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service understood the request and refused it.
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    /// Transport failure or temporary unavailability.
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Unexpected(e.to_string())
        } else {
            RemoteError::Unavailable(e.to_string())
        }
    }
}

/// Caller-supplied credential, used instead of the backend's configured key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank keys.
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        (!key.is_empty()).then(|| Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Given a conversation and an optional skill, produce a reply and usage counts.
///
/// `api_key` overrides the backend's own credential for this call only.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn complete(
        &self,
        request: &InferenceRequest,
        api_key: Option<&ApiKey>,
    ) -> Result<InferenceReply, RemoteError>;

    /// Skills visible to the credential, custom and pre-built.
    async fn list_skills(&self, api_key: Option<&ApiKey>) -> Result<Vec<SkillInfo>, RemoteError>;
}

// --- Wire types ---

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: &'a [RequestMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    container: Option<Container<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec>,
}

#[derive(Debug, Serialize)]
struct Container<'a> {
    skills: Vec<SkillSpec<'a>>,
}

#[derive(Debug, Serialize)]
struct SkillSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    skill_id: &'a str,
    version: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'static str,
}

impl<'a> MessagesBody<'a> {
    fn from_request(request: &'a InferenceRequest) -> Self {
        let container = request.skill().map(|skill| Container {
            skills: vec![SkillSpec {
                kind: skill.kind().as_str(),
                skill_id: skill.skill_id(),
                version: skill.version(),
            }],
        });

        let tools = if request.code_execution_enabled() {
            vec![ToolSpec {
                kind: CODE_EXECUTION_TOOL_TYPE,
                name: CODE_EXECUTION_TOOL_NAME,
            }]
        } else {
            Vec::new()
        };

        Self {
            model: request.model(),
            max_tokens: request.max_tokens(),
            temperature: request.temperature(),
            messages: request.messages(),
            container,
            tools,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<WireBlock>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        text: String,
    },
    ToolUse {
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    ServerToolUse {
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl From<MessagesResponse> for InferenceReply {
    fn from(response: MessagesResponse) -> Self {
        let fragments = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                WireBlock::Text { text } => Some(ContentFragment::Text { text }),
                WireBlock::ToolUse { name, input } | WireBlock::ServerToolUse { name, input } => {
                    Some(ContentFragment::ToolUse(ToolUse { name, input }))
                }
                WireBlock::Other => None,
            })
            .collect();

        Self {
            fragments,
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SkillsPage {
    #[serde(default)]
    data: Vec<WireSkill>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireSkill {
    id: String,
    #[serde(default)]
    display_title: Option<String>,
    #[serde(default)]
    source: String,
    #[serde(default)]
    description: Option<String>,
}

impl From<WireSkill> for SkillInfo {
    fn from(skill: WireSkill) -> Self {
        Self {
            name: skill.display_title.unwrap_or_else(|| skill.id.clone()),
            source: SkillKind::from_source(&skill.source),
            description: skill.description,
            id: skill.id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Classify a non-success HTTP status.
fn classify_status(status: u16, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    match status {
        408 | 429 | 500..=599 => RemoteError::Unavailable(format!("HTTP {status}: {message}")),
        _ => RemoteError::Rejected { status, message },
    }
}

// --- Client ---

/// Client for the hosted Messages and Skills APIs.
pub struct AnthropicBackend {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AnthropicBackend {
    pub fn new(api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn key<'k>(&'k self, api_key: Option<&'k ApiKey>) -> &'k str {
        api_key.map_or(self.api_key.as_str(), ApiKey::expose)
    }

    fn post_messages(
        &self,
        request: &InferenceRequest,
        api_key: Option<&ApiKey>,
    ) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .post(format!("{}/v1/messages?beta=true", self.base_url))
            .header("x-api-key", self.key(api_key))
            .header("anthropic-version", ANTHROPIC_VERSION);

        let betas = request.betas();
        if !betas.is_empty() {
            builder = builder.header("anthropic-beta", betas.join(","));
        }

        builder.json(&MessagesBody::from_request(request))
    }

    async fn fetch_skills_page(
        &self,
        page: Option<&str>,
        api_key: Option<&ApiKey>,
    ) -> Result<SkillsPage, RemoteError> {
        let mut builder = self
            .http
            .get(format!("{}/v1/skills", self.base_url))
            .query(&[("beta", "true")])
            .header("x-api-key", self.key(api_key))
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("anthropic-beta", SKILLS_BETA);
        if let Some(page) = page {
            builder = builder.query(&[("page", page)]);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl InferenceBackend for AnthropicBackend {
    async fn complete(
        &self,
        request: &InferenceRequest,
        api_key: Option<&ApiKey>,
    ) -> Result<InferenceReply, RemoteError> {
        debug!(
            model = %request.model(),
            messages = request.messages().len(),
            skill_id = request.skill().map(|s| s.skill_id()),
            caller_key = api_key.is_some(),
            "messages request"
        );

        let response = self.post_messages(request, api_key).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let body: MessagesResponse = response.json().await?;
        Ok(body.into())
    }

    async fn list_skills(&self, api_key: Option<&ApiKey>) -> Result<Vec<SkillInfo>, RemoteError> {
        let mut skills = Vec::new();
        let mut page: Option<String> = None;

        loop {
            let batch = self.fetch_skills_page(page.as_deref(), api_key).await?;
            skills.extend(batch.data.into_iter().map(SkillInfo::from));

            match batch.next_page {
                Some(next) if batch.has_more => page = Some(next),
                _ => break,
            }
        }

        debug!(count = skills.len(), "listed skills");
        Ok(skills)
    }
}
