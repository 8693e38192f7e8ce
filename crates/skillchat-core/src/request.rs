//! Outbound inference request assembly.

use crate::skills::SkillAttachment;
use crate::types::{Role, Turn};

/// Beta flag enabling the code execution tool.
pub const CODE_EXECUTION_BETA: &str = "code-execution-2025-08-25";

/// Beta flag enabling skill containers.
pub const SKILLS_BETA: &str = "skills-2025-10-02";

/// Tool type of the code execution capability.
pub const CODE_EXECUTION_TOOL_TYPE: &str = "code_execution_20250825";

/// Tool name of the code execution capability.
pub const CODE_EXECUTION_TOOL_NAME: &str = "code_execution";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 1.0;

/// Default output token budget.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Per-call generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParams {
    pub model: String,
    /// Passed through unclamped; the service rejects out-of-range values.
    pub temperature: f64,
    pub max_tokens: u32,
}

impl RequestParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A turn as sent on the wire: role and content, no timestamp.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RequestMessage {
    pub role: Role,
    pub content: String,
}

/// A fully-formed request to the inference service.
///
/// The code execution capability is enabled exactly when a skill is attached;
/// there is no way to set one without the other.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    params: RequestParams,
    messages: Vec<RequestMessage>,
    skill: Option<SkillAttachment>,
}

impl InferenceRequest {
    /// Build a request from prior history plus the new user turn.
    pub fn build(
        history: &[Turn],
        new_turn: &Turn,
        params: RequestParams,
        skill: Option<SkillAttachment>,
    ) -> Self {
        let messages = history
            .iter()
            .chain(std::iter::once(new_turn))
            .map(|turn| RequestMessage {
                role: turn.role,
                content: turn.content.clone(),
            })
            .collect();

        Self {
            params,
            messages,
            skill,
        }
    }

    pub fn model(&self) -> &str {
        &self.params.model
    }

    pub fn temperature(&self) -> f64 {
        self.params.temperature
    }

    pub fn max_tokens(&self) -> u32 {
        self.params.max_tokens
    }

    pub fn messages(&self) -> &[RequestMessage] {
        &self.messages
    }

    pub fn skill(&self) -> Option<&SkillAttachment> {
        self.skill.as_ref()
    }

    /// Whether the auxiliary code execution capability is requested.
    pub fn code_execution_enabled(&self) -> bool {
        self.skill.is_some()
    }

    /// Beta flags the request must declare. Empty without a skill.
    pub fn betas(&self) -> &'static [&'static str] {
        if self.code_execution_enabled() {
            &[CODE_EXECUTION_BETA, SKILLS_BETA]
        } else {
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::{resolve_attachment, SkillKind};
    use chrono::{TimeZone, Utc};

    fn turn(role: Role, content: &str, secs: i64) -> Turn {
        Turn::new(role, content, Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn history_is_flattened_in_order_with_new_turn_last() {
        let history = vec![
            turn(Role::User, "hi", 1),
            turn(Role::Assistant, "hello", 2),
        ];
        let new_turn = turn(Role::User, "how are you?", 3);

        let request =
            InferenceRequest::build(&history, &new_turn, RequestParams::new("m"), None);

        let contents: Vec<_> = request.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "hello", "how are you?"]);
        assert_eq!(request.messages()[1].role, Role::Assistant);
    }

    #[test]
    fn params_pass_through_unclamped() {
        let params = RequestParams::new("claude-test")
            .with_temperature(3.5)
            .with_max_tokens(16);
        let request = InferenceRequest::build(&[], &Turn::user("x"), params, None);

        assert_eq!(request.model(), "claude-test");
        assert!((request.temperature() - 3.5).abs() < f64::EPSILON);
        assert_eq!(request.max_tokens(), 16);
    }

    #[test]
    fn no_skill_means_no_capability_and_no_betas() {
        let request =
            InferenceRequest::build(&[], &Turn::user("x"), RequestParams::new("m"), None);
        assert!(request.skill().is_none());
        assert!(!request.code_execution_enabled());
        assert!(request.betas().is_empty());
    }

    #[test]
    fn skill_carries_capability_and_triple() {
        let skill = resolve_attachment(Some("skill_123"), Some("4"));
        let request =
            InferenceRequest::build(&[], &Turn::user("x"), RequestParams::new("m"), skill);

        let attached = request.skill().unwrap();
        assert_eq!(attached.kind(), SkillKind::Custom);
        assert_eq!(attached.skill_id(), "skill_123");
        assert_eq!(attached.version(), "4");
        assert!(request.code_execution_enabled());
        assert_eq!(request.betas(), &[CODE_EXECUTION_BETA, SKILLS_BETA]);
    }

    #[test]
    fn capability_flag_tracks_skill_presence() {
        let ids = [None, Some(""), Some("pptx"), Some("skill_x"), Some("  "), Some("docx")];
        for (i, id) in ids.iter().cycle().take(48).enumerate() {
            let version = if i % 3 == 0 { Some("1") } else { None };
            let skill = resolve_attachment(*id, version);
            let expected = skill.is_some();
            let request =
                InferenceRequest::build(&[], &Turn::user("q"), RequestParams::new("m"), skill);

            assert_eq!(request.skill().is_some(), expected);
            assert_eq!(request.code_execution_enabled(), expected);
            assert_eq!(!request.betas().is_empty(), expected);
        }
    }
}
