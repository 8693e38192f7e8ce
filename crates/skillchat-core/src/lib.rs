pub mod config;
pub mod export;
pub mod request;
pub mod skills;
pub mod types;

pub use config::{Config, ConfigError};
pub use export::TranscriptExport;
pub use request::{InferenceRequest, RequestParams};
pub use skills::{resolve_attachment, SkillAttachment, SkillInfo, SkillKind};
pub use types::*;
