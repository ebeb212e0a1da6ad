use std::path::Path;
use std::time::Duration;

use pagechat_core::ContextPolicy;
use serde::{Deserialize, Serialize};
use session_logging::{session_info, session_warn};

use crate::reduce::{ReductionStrategy, DEFAULT_MAX_CONTENT_LENGTH};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },
}

/// Everything the conversation loop needs, with a default for every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ChatConfig {
    pub endpoint: EndpointConfig,
    pub limits: Limits,
    pub sampling: SamplingByMode,
    pub context_policy: ContextPolicy,
    pub reduction: ReductionStrategy,
    pub prompt: PromptProfile,
    pub archive: ArchiveConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// OpenAI-compatible base URL, including the version segment.
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub connect_timeout_secs: u64,
}

impl EndpointConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            api_key: String::new(),
            model: "qwen2.5-32b-instruct-mlx".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Character budget for the reduced page text sent to the model.
    pub max_content_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub presence_penalty: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingByMode {
    pub summarize: SamplingParams,
    pub chat: SamplingParams,
}

impl Default for SamplingByMode {
    fn default() -> Self {
        Self {
            summarize: SamplingParams {
                temperature: 0.1,
                max_tokens: 8192,
                top_p: 0.95,
                presence_penalty: 0.1,
            },
            chat: SamplingParams {
                temperature: 0.7,
                max_tokens: 8192,
                top_p: 0.95,
                presence_penalty: 0.1,
            },
        }
    }
}

/// Target language and section labels used by the prompt builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptProfile {
    pub language: String,
    pub summary_label: String,
    pub key_points_label: String,
}

impl Default for PromptProfile {
    fn default() -> Self {
        Self {
            language: "Traditional Chinese (繁體中文)".to_string(),
            summary_label: "總結".to_string(),
            key_points_label: "要點".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub output_dir: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: "output".to_string(),
        }
    }
}

/// Load a RON config file. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ChatConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            session_warn!("Config {:?} not found, using defaults", path);
            return Ok(ChatConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };

    let config: ChatConfig = ron::from_str(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    session_info!("Loaded config from {:?}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_ron_keeps_defaults_for_missing_fields() {
        let text = r#"(endpoint: (model: "local-model"), context_policy: OriginalSummary)"#;
        let config: ChatConfig = ron::from_str(text).unwrap();

        assert_eq!(config.endpoint.model, "local-model");
        assert_eq!(config.endpoint.base_url, "http://localhost:1234/v1");
        assert_eq!(config.context_policy, ContextPolicy::OriginalSummary);
        assert_eq!(config.sampling, SamplingByMode::default());
        assert_eq!(config.limits.max_content_length, DEFAULT_MAX_CONTENT_LENGTH);
    }

    #[test]
    fn completions_url_tolerates_trailing_slash() {
        let endpoint = EndpointConfig {
            base_url: "https://gateway.example/v1/".into(),
            ..EndpointConfig::default()
        };
        assert_eq!(
            endpoint.completions_url(),
            "https://gateway.example/v1/chat/completions"
        );
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_config(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(config, ChatConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.ron");
        std::fs::write(&path, "(endpoint: ").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }
}
