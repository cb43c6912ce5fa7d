//! Client config load/save for `~/.ondemand-chat/config.yaml`, and validation
//! into the [`Settings`] used by the client.

use std::path::{Path, PathBuf};

use crate::messages::{ContextField, ModelConfigs, ResponseMode};

pub const DEFAULT_BASE_URL: &str = "https://api.on-demand.io/chat/v1";
pub const DEFAULT_ENDPOINT_ID: &str = "predefined-openai-gpt4.1";
pub const DEFAULT_REASONING_MODE: &str = "grok-4-fast";

const API_KEY_PLACEHOLDER: &str = "<your_api_key>";
const EXTERNAL_USER_ID_PLACEHOLDER: &str = "<your_external_user_id>";

/// API section (base_url, api_key, external_user_id).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ApiSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_user_id: Option<String>,
}

/// Query section (text, response_mode, agent_ids, endpoint_id, reasoning_mode).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct QuerySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,
    #[serde(default)]
    pub agent_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_mode: Option<String>,
}

/// Model section; unset values fall back to the defaults in [`ModelSection::resolve`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ModelSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fulfillment_prompt: Option<String>,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
}

impl ModelSection {
    fn resolve(self) -> Result<ModelConfigs, ConfigError> {
        let model = ModelConfigs {
            fulfillment_prompt: self.fulfillment_prompt.unwrap_or_default(),
            stop_sequences: self.stop_sequences,
            temperature: self.temperature.unwrap_or(0.7),
            top_p: self.top_p.unwrap_or(1.0),
            max_tokens: self.max_tokens.unwrap_or(0),
            presence_penalty: self.presence_penalty.unwrap_or(0.0),
            frequency_penalty: self.frequency_penalty.unwrap_or(0.0),
        };
        for (name, value) in [
            ("temperature", model.temperature),
            ("top_p", model.top_p),
            ("presence_penalty", model.presence_penalty),
            ("frequency_penalty", model.frequency_penalty),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidModelParameter { name, value });
            }
        }
        Ok(model)
    }
}

/// Full config file.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub query: QuerySection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub context_metadata: Vec<ContextField>,
}

impl Config {
    /// Override file values from environment-style lookups
    /// (`ONDEMAND_API_KEY`, `ONDEMAND_EXTERNAL_USER_ID`, `ONDEMAND_BASE_URL`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("ONDEMAND_API_KEY") {
            self.api.api_key = Some(v);
        }
        if let Some(v) = lookup("ONDEMAND_EXTERNAL_USER_ID") {
            self.api.external_user_id = Some(v);
        }
        if let Some(v) = lookup("ONDEMAND_BASE_URL") {
            self.api.base_url = Some(v);
        }
    }
}

/// Validated, fully defaulted configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub api_key: String,
    pub external_user_id: String,
    /// True when `external_user_id` was generated rather than configured.
    pub generated_user_id: bool,
    pub query: String,
    pub response_mode: ResponseMode,
    pub agent_ids: Vec<String>,
    pub endpoint_id: String,
    pub reasoning_mode: String,
    pub model: ModelConfigs,
    pub context_metadata: Vec<ContextField>,
}

impl Settings {
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let api_key = config
            .api
            .api_key
            .filter(|k| !k.trim().is_empty() && k != API_KEY_PLACEHOLDER)
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = config
            .api
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        reqwest::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let (external_user_id, generated_user_id) = match config
            .api
            .external_user_id
            .filter(|id| !id.trim().is_empty() && id != EXTERNAL_USER_ID_PLACEHOLDER)
        {
            Some(id) => (id, false),
            None => (uuid::Uuid::new_v4().to_string(), true),
        };

        let query = config
            .query
            .text
            .filter(|q| !q.trim().is_empty())
            .ok_or(ConfigError::EmptyQuery)?;

        Ok(Settings {
            base_url,
            api_key,
            external_user_id,
            generated_user_id,
            query,
            response_mode: config.query.response_mode.unwrap_or_default(),
            agent_ids: config.query.agent_ids,
            endpoint_id: config
                .query
                .endpoint_id
                .unwrap_or_else(|| DEFAULT_ENDPOINT_ID.to_string()),
            reasoning_mode: config
                .query
                .reasoning_mode
                .unwrap_or_else(|| DEFAULT_REASONING_MODE.to_string()),
            model: config.model.resolve()?,
            context_metadata: config.context_metadata,
        })
    }
}

/// Returns the default config file path: `~/.ondemand-chat/config.yaml` (platform-specific).
pub fn default_config_path() -> Option<PathBuf> {
    let home = home_dir()?;
    Some(home.join(".ondemand-chat").join("config.yaml"))
}

#[cfg(unix)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(windows)]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE").map(PathBuf::from)
}

#[cfg(not(any(unix, windows)))]
fn home_dir() -> Option<PathBuf> {
    None
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("API key is not set (api.api_key or ONDEMAND_API_KEY)")]
    MissingApiKey,
    #[error("invalid base URL {0}")]
    InvalidBaseUrl(String),
    #[error("query text is empty")]
    EmptyQuery,
    #[error("model parameter {name} must be finite, got {value}")]
    InvalidModelParameter { name: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Config {
        let mut config = Config::default();
        config.api.api_key = Some("key".into());
        config.query.text = Some("hello".into());
        config
    }

    #[test]
    fn defaults_match_demo_constants() {
        let settings = Settings::from_config(minimal()).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.endpoint_id, "predefined-openai-gpt4.1");
        assert_eq!(settings.reasoning_mode, "grok-4-fast");
        assert_eq!(settings.response_mode, ResponseMode::Stream);
        assert_eq!(settings.model.temperature, 0.7);
        assert_eq!(settings.model.top_p, 1.0);
        assert_eq!(settings.model.max_tokens, 0);
        assert!(settings.agent_ids.is_empty());
    }

    #[test]
    fn placeholder_api_key_is_rejected() {
        let mut config = minimal();
        config.api.api_key = Some(API_KEY_PLACEHOLDER.into());
        assert!(matches!(
            Settings::from_config(config),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn missing_user_id_is_generated() {
        let mut config = minimal();
        config.api.external_user_id = Some(EXTERNAL_USER_ID_PLACEHOLDER.into());
        let settings = Settings::from_config(config).unwrap();
        assert!(settings.generated_user_id);
        assert!(uuid::Uuid::parse_str(&settings.external_user_id).is_ok());
    }

    #[test]
    fn configured_user_id_is_kept() {
        let mut config = minimal();
        config.api.external_user_id = Some("user-7".into());
        let settings = Settings::from_config(config).unwrap();
        assert!(!settings.generated_user_id);
        assert_eq!(settings.external_user_id, "user-7");
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let mut config = minimal();
        config.api.base_url = Some("http://localhost:9000/chat/v1/".into());
        let settings = Settings::from_config(config).unwrap();
        assert_eq!(settings.base_url, "http://localhost:9000/chat/v1");
    }

    #[test]
    fn non_finite_model_parameter_is_rejected() {
        let mut config = minimal();
        config.model.temperature = Some(f64::NAN);
        assert!(matches!(
            Settings::from_config(config),
            Err(ConfigError::InvalidModelParameter { name: "temperature", .. })
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = minimal();
        config.apply_env(|key| match key {
            "ONDEMAND_API_KEY" => Some("from-env".into()),
            "ONDEMAND_BASE_URL" => Some("http://127.0.0.1:1".into()),
            _ => None,
        });
        assert_eq!(config.api.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.api.base_url.as_deref(), Some("http://127.0.0.1:1"));
        assert_eq!(config.api.external_user_id, None);
    }
}
