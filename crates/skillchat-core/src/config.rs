//! Configuration loading for the daemon and the CLI.
//!
//! Values come from a `.env`-style file (`KEY=value` lines) and the process
//! environment. Precedence: CLI flags > process environment > env file > defaults.
//! Keys this crate does not recognize are ignored, since env files are shared
//! with other tools.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::request::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::skills::is_placeholder_skill_id;

/// Sample API key shipped in `.env.example`.
pub const PLACEHOLDER_API_KEY: &str = "your-api-key-here";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read env file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid env line: {0}")]
    InvalidLine(String),
    #[error("invalid integer value for {key}: {value}")]
    InvalidInt { key: String, value: String },
    #[error("ANTHROPIC_API_KEY not set\n  → copy .env.example to .env and add your API key")]
    MissingApiKey,
    #[error("ANTHROPIC_API_KEY is still the placeholder 'your-api-key-here'\n  → replace it with your actual API key in .env")]
    PlaceholderApiKey,
}

/// Daemon and client configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    // Credentials
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_base_url: String,

    // Generation defaults
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Used by the CLI probe when no skill is given on the command line.
    pub default_skill_id: Option<String>,

    /// Timeout for a single inference call.
    pub request_timeout_sec: u64,

    /// Session cap for the transcript store; 0 keeps every session for the
    /// lifetime of the process.
    pub max_sessions: usize,

    // HTTP front end
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,

    pub upload_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: "https://api.anthropic.com".to_string(),
            model: "claude-opus-4-6".to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            default_skill_id: None,
            request_timeout_sec: 120,
            max_sessions: 0,
            host: "127.0.0.1".to_string(),
            port: 8000,
            auth_token: None,
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

impl Config {
    /// Load defaults, then the env file (if present), then the process environment.
    pub fn load(env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = env_file {
            if path.exists() {
                config.load_env_file(path)?;
            }
        }
        config.apply_vars(std::env::vars())?;
        Ok(config)
    }

    /// Load config from an env file, merging with defaults.
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.load_env_file(path)?;
        Ok(config)
    }

    /// Load and merge values from an env file.
    pub fn load_env_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path)?;
        self.parse_content(&content)
    }

    /// Parse env file content (`KEY=value` format).
    fn parse_content(&mut self, content: &str) -> Result<(), ConfigError> {
        for line in content.lines() {
            let trimmed = line.trim();

            // Skip empty lines and comments
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);

            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::InvalidLine(line.to_string()));
            };

            let key = key.trim();
            let value = Self::unquote(value.trim());

            self.apply_value(key, &value)?;
        }
        Ok(())
    }

    /// Merge values from `(key, value)` pairs such as `std::env::vars()`.
    pub fn apply_vars<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            self.apply_value(&key, &value)?;
        }
        Ok(())
    }

    /// Remove surrounding quotes from a value.
    fn unquote(value: &str) -> String {
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            return value[1..value.len() - 1].to_string();
        }
        value.to_string()
    }

    /// Apply a single value. Unrecognized keys are ignored.
    fn apply_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "ANTHROPIC_API_KEY" => self.api_key = Self::non_empty(value),
            "ANTHROPIC_BASE_URL" => {
                if !value.is_empty() {
                    self.api_base_url = value.trim_end_matches('/').to_string();
                }
            }
            "CLAUDE_SKILL_ID" => self.default_skill_id = Self::non_empty(value),
            "SKILLCHAT_MODEL" => {
                if !value.is_empty() {
                    self.model = value.to_string();
                }
            }
            "SKILLCHAT_TIMEOUT_SEC" => self.request_timeout_sec = Self::parse_int(key, value)?,
            "SKILLCHAT_MAX_SESSIONS" => self.max_sessions = Self::parse_int(key, value)?,
            "SKILLCHAT_UPLOAD_DIR" => self.upload_dir = PathBuf::from(value),
            "SKILLCHATD_AUTH_TOKEN" => self.auth_token = Self::non_empty(value),
            "WEB_APP_HOST" => self.host = value.to_string(),
            "WEB_APP_PORT" => self.port = Self::parse_int(key, value)?,
            _ => {}
        }
        Ok(())
    }

    fn non_empty(value: &str) -> Option<String> {
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
        value.parse().map_err(|_| ConfigError::InvalidInt {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    /// The API key, or a configuration error if it is unset or a placeholder.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.api_key.as_deref() {
            None | Some("") => Err(ConfigError::MissingApiKey),
            Some(PLACEHOLDER_API_KEY) => Err(ConfigError::PlaceholderApiKey),
            Some(key) => Ok(key),
        }
    }

    /// Configured default skill, ignoring the sample placeholder.
    pub fn default_skill(&self) -> Option<&str> {
        self.default_skill_id
            .as_deref()
            .filter(|id| !is_placeholder_skill_id(id))
    }

    /// `host:port` for the HTTP front end.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.request_timeout_sec, 120);
        assert_eq!(config.max_sessions, 0);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn parses_env_file_with_comments_quotes_and_export() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "# credentials\nANTHROPIC_API_KEY=\"sk-ant-123\"\nexport CLAUDE_SKILL_ID='skill_01Real'\n\nWEB_APP_PORT=9001\nUNRELATED=1"
        )
        .unwrap();

        let config = Config::from_env_file(file.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-ant-123"));
        assert_eq!(config.default_skill(), Some("skill_01Real"));
        assert_eq!(config.port, 9001);
    }

    #[test]
    fn invalid_line_is_rejected() {
        let mut config = Config::default();
        let err = config.parse_content("NOT A PAIR").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLine(_)));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_vars(vars(&[("WEB_APP_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidInt { .. }));
    }

    #[test]
    fn later_sources_override_earlier() {
        let mut config = Config::default();
        config.parse_content("SKILLCHAT_MODEL=from-file").unwrap();
        config
            .apply_vars(vars(&[("SKILLCHAT_MODEL", "from-env")]))
            .unwrap();
        assert_eq!(config.model, "from-env");
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let config = Config::default();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));

        let mut empty = Config::default();
        empty.apply_vars(vars(&[("ANTHROPIC_API_KEY", "")])).unwrap();
        assert!(matches!(
            empty.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn placeholder_api_key_is_a_configuration_error() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[("ANTHROPIC_API_KEY", PLACEHOLDER_API_KEY)]))
            .unwrap();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::PlaceholderApiKey)
        ));
    }

    #[test]
    fn placeholder_skill_id_is_ignored() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[("CLAUDE_SKILL_ID", "skill_01AbCdEfGhIjKlMnOpQrStUv")]))
            .unwrap();
        assert!(config.default_skill().is_none());
    }

    #[test]
    fn missing_env_file_is_not_an_error_for_load() {
        let config = Config::load(Some(Path::new("/nonexistent/skillchat/.env")));
        assert!(config.is_ok());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[("ANTHROPIC_BASE_URL", "http://localhost:9999/")]))
            .unwrap();
        assert_eq!(config.api_base_url, "http://localhost:9999");
    }
}
