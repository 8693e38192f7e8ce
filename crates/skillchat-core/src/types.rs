//! Core conversation types shared by the daemon and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Heading label used in exported transcripts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One message in a conversation.
///
/// Turns are never mutated after they are appended to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// User turn stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, Utc::now())
    }

    /// Assistant turn stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, Utc::now())
    }
}

/// Token accounting reported by the inference service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A tool invocation reported by the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUse {
    pub name: String,
    #[serde(default)]
    pub input: serde_json::Value,
}

/// One content block of a reply, in the order the service returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentFragment {
    Text { text: String },
    ToolUse(ToolUse),
}

/// Raw reply from the inference service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceReply {
    pub fragments: Vec<ContentFragment>,
    pub usage: TokenUsage,
}

impl InferenceReply {
    /// Concatenation of every text fragment, in order. Tool fragments are skipped.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                ContentFragment::Text { text } => Some(text.as_str()),
                ContentFragment::ToolUse(_) => None,
            })
            .collect()
    }

    pub fn tool_uses(&self) -> Vec<ToolUse> {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                ContentFragment::ToolUse(tool) => Some(tool.clone()),
                ContentFragment::Text { .. } => None,
            })
            .collect()
    }
}

/// Normalized result of a single `converse` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    #[serde(rename = "response")]
    pub response_text: String,
    pub usage: TokenUsage,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_uses: Vec<ToolUse>,
}

impl From<InferenceReply> for InferenceResult {
    fn from(reply: InferenceReply) -> Self {
        Self {
            response_text: reply.text(),
            tool_uses: reply.tool_uses(),
            usage: reply.usage,
        }
    }
}
