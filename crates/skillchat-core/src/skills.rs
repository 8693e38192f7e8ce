//! Skill attachment resolution and skill listing types.
//!
//! A skill identifier is classified locally by its shape alone. Whether the
//! skill actually exists is only discovered when the inference service is
//! called.

use serde::{Deserialize, Serialize};

/// Prefix reserved for identifiers of user-uploaded (custom) skills.
pub const CUSTOM_SKILL_PREFIX: &str = "skill_";

/// Version sentinel used when the caller does not pin a skill version.
pub const LATEST_VERSION: &str = "latest";

/// Sample skill id shipped in `.env.example`; treated as unset.
pub const PLACEHOLDER_SKILL_ID: &str = "skill_01AbCdEfGhIjKlMnOpQrStUv";

/// Where a skill comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillKind {
    /// Uploaded by the account owner.
    #[serde(rename = "custom")]
    Custom,
    /// Published by the service provider.
    #[serde(rename = "anthropic")]
    Prebuilt,
}

impl SkillKind {
    /// Classify a skill identifier by its prefix.
    pub fn classify(skill_id: &str) -> Self {
        if skill_id.starts_with(CUSTOM_SKILL_PREFIX) {
            Self::Custom
        } else {
            Self::Prebuilt
        }
    }

    /// Map a `source` value reported by the skills listing.
    pub fn from_source(source: &str) -> Self {
        if source == "custom" {
            Self::Custom
        } else {
            Self::Prebuilt
        }
    }

    /// Wire name used in request containers and listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Prebuilt => "anthropic",
        }
    }
}

/// A skill to attach to a single request. Never stored.
///
/// The kind is derived from the identifier and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillAttachment {
    skill_id: String,
    kind: SkillKind,
    version: String,
}

impl SkillAttachment {
    pub fn skill_id(&self) -> &str {
        &self.skill_id
    }

    pub fn kind(&self) -> SkillKind {
        self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Resolve a raw skill identifier (and optional pinned version) into an attachment.
///
/// Returns `None` when no skill was requested: the identifier is absent, empty,
/// or whitespace only. Surrounding whitespace is not part of the identifier.
pub fn resolve_attachment(skill_id: Option<&str>, version: Option<&str>) -> Option<SkillAttachment> {
    let skill_id = skill_id.map(str::trim).filter(|id| !id.is_empty())?;
    let version = version
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(LATEST_VERSION);

    Some(SkillAttachment {
        skill_id: skill_id.to_string(),
        kind: SkillKind::classify(skill_id),
        version: version.to_string(),
    })
}

/// A skill as reported by the skills listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub source: SkillKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Split a listing into (custom, pre-built), preserving order within each group.
pub fn partition_by_source(skills: &[SkillInfo]) -> (Vec<&SkillInfo>, Vec<&SkillInfo>) {
    skills
        .iter()
        .partition(|skill| skill.source == SkillKind::Custom)
}

/// Returns true if the identifier is unset or still the sample placeholder.
pub fn is_placeholder_skill_id(skill_id: &str) -> bool {
    let trimmed = skill_id.trim();
    trimmed.is_empty() || trimmed.starts_with(PLACEHOLDER_SKILL_ID)
}
