//! Configuration loading and validation for Toolweave.
//!
//! Loads configuration from `~/.toolweave/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use toolweave_codecs::{CodecOptions, Dialect, ReasoningEffort};

/// The root configuration structure.
///
/// Maps directly to `~/.toolweave/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prompt dialect: `llama3.1`, `qwen2.5`, `qwen3` or `gpt-oss`
    #[serde(default = "default_dialect")]
    pub dialect: String,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub codec: CodecConfig,
}

fn default_dialect() -> String {
    Dialect::default().as_str().into()
}

/// Agent loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// System instructions placed at the top of every prompt
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Tool-call turns allowed per invocation
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Bytes per token stream read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_agent_name() -> String {
    "toolweave".into()
}
fn default_instructions() -> String {
    "You are a helpful assistant.".into()
}
fn default_max_turns() -> usize {
    10
}
fn default_chunk_size() -> usize {
    256
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            instructions: default_instructions(),
            max_turns: default_max_turns(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Completion server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Max tokens generated per model turn
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Extra stop strings sent with every request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

fn default_server_url() -> String {
    "http://127.0.0.1:8080".into()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            stop: Vec::new(),
        }
    }
}

/// How streamed messages are framed on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// One JSON message per line
    #[default]
    Raw,
    /// Server-sent events (`data: {...}`)
    Sse,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub format: StreamFormat,
}

/// Dialect-specific codec knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// GPT-OSS reasoning effort: `low`, `medium` or `high`
    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: String,

    /// Date shown in system headers (YYYY-MM-DD); today when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_date: Option<String>,
}

fn default_reasoning_effort() -> String {
    ReasoningEffort::default().as_str().into()
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            reasoning_effort: default_reasoning_effort(),
            current_date: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.toolweave/config.toml).
    ///
    /// Environment variables override the file:
    /// - `TOOLWEAVE_DIALECT`
    /// - `TOOLWEAVE_SERVER_URL`
    /// - `TOOLWEAVE_MAX_TURNS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in [`AppConfig::load`]).
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dialect) = lookup("TOOLWEAVE_DIALECT") {
            self.dialect = dialect;
        }
        if let Some(url) = lookup("TOOLWEAVE_SERVER_URL") {
            self.inference.server_url = url;
        }
        if let Some(turns) = lookup("TOOLWEAVE_MAX_TURNS") {
            self.agent.max_turns = turns.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "TOOLWEAVE_MAX_TURNS must be a positive integer, got '{turns}'"
                ))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".toolweave")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dialect()?;
        self.codec_options()?;

        if self.agent.max_turns < 1 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be at least 1".into(),
            ));
        }

        if self.agent.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "agent.chunk_size must be greater than 0".into(),
            ));
        }

        if !(0.0..=2.0).contains(&self.inference.temperature) {
            return Err(ConfigError::ValidationError(
                "inference.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        Ok(())
    }

    /// The configured prompt dialect.
    pub fn dialect(&self) -> Result<Dialect, ConfigError> {
        self.dialect
            .parse()
            .map_err(|e: toolweave_codecs::CodecConfigError| {
                ConfigError::ValidationError(e.to_string())
            })
    }

    /// Codec construction options derived from the `[codec]` table.
    pub fn codec_options(&self) -> Result<CodecOptions, ConfigError> {
        let reasoning_effort = self
            .codec
            .reasoning_effort
            .parse::<ReasoningEffort>()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let current_date = self
            .codec
            .current_date
            .as_deref()
            .map(|date| {
                NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                    ConfigError::ValidationError(format!(
                        "codec.current_date '{date}' is not a YYYY-MM-DD date: {e}"
                    ))
                })
            })
            .transpose()?;

        Ok(CodecOptions {
            current_date,
            reasoning_effort,
        })
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            agent: AgentConfig::default(),
            inference: InferenceConfig::default(),
            stream: StreamConfig::default(),
            codec: CodecConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.dialect, "llama3.1");
        assert_eq!(config.agent.max_turns, 10);
        assert_eq!(config.agent.chunk_size, 256);
        assert_eq!(config.inference.server_url, "http://127.0.0.1:8080");
        assert_eq!(config.stream.format, StreamFormat::Raw);
        assert!(config.validate().is_ok());
        assert_eq!(config.dialect().unwrap(), Dialect::Llama31);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.inference.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_turns_and_chunks_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_turns = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.agent.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_dialect_rejected() {
        let config = AppConfig {
            dialect: "mistral".into(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mistral"));
    }

    #[test]
    fn codec_options_parse_date_and_effort() {
        let mut config = AppConfig::default();
        config.codec.reasoning_effort = "high".into();
        config.codec.current_date = Some("2025-08-05".into());

        let options = config.codec_options().unwrap();
        assert_eq!(options.reasoning_effort, ReasoningEffort::High);
        assert_eq!(options.current_date, NaiveDate::from_ymd_opt(2025, 8, 5));

        config.codec.current_date = Some("05/08/2025".into());
        assert!(config.codec_options().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert_eq!(result.unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
dialect = "gpt-oss"

[agent]
instructions = "Answer in French."

[stream]
format = "sse"

[codec]
reasoning_effort = "low"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.dialect().unwrap(), Dialect::GptOss);
        assert_eq!(config.agent.instructions, "Answer in French.");
        assert_eq!(config.agent.max_turns, 10);
        assert_eq!(config.stream.format, StreamFormat::Sse);
        assert_eq!(config.codec_options().unwrap().reasoning_effort, ReasoningEffort::Low);
    }

    #[test]
    fn invalid_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "dialect = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_values_in_file_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent]\nmax_turns = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("TOOLWEAVE_DIALECT", "qwen3"),
                ("TOOLWEAVE_SERVER_URL", "http://gpu:9000"),
                ("TOOLWEAVE_MAX_TURNS", "3"),
            ]))
            .unwrap();
        assert_eq!(config.dialect().unwrap(), Dialect::Qwen3);
        assert_eq!(config.inference.server_url, "http://gpu:9000");
        assert_eq!(config.agent.max_turns, 3);
    }

    #[test]
    fn bad_max_turns_env_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[("TOOLWEAVE_MAX_TURNS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("lots"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("dialect = \"llama3.1\""));
        assert!(toml_str.contains("[inference]"));
        assert!(toml_str.contains("http://127.0.0.1:8080"));
        assert!(!toml_str.contains("current_date"));
    }
}
