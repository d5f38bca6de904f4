//! Aggregated provider settings loaded once at startup.
//!
//! Settings come from environment variables or from a YAML/JSON file and are
//! handed by reference to [`create_provider`](crate::factory::create_provider).

use crate::config::LocalLlmConfig;
use crate::error::{LlmError, Result};
use crate::factory::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Credentials and model selection for one remote backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// API key. Construction fails when this is unset.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model override.
    #[serde(default)]
    pub model: Option<String>,
    /// Endpoint override.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl BackendSettings {
    fn from_env(key_var: &str, model_var: &str, base_url_var: Option<&str>) -> Self {
        Self {
            api_key: utils::config::get_env_nonempty(key_var),
            model: std::env::var(model_var).ok(),
            base_url: base_url_var.and_then(|v| std::env::var(v).ok()),
        }
    }

    /// Fill every unset field from `fallback`.
    pub fn or(self, fallback: BackendSettings) -> Self {
        Self {
            api_key: self.api_key.or(fallback.api_key),
            model: self.model.or(fallback.model),
            base_url: self.base_url.or(fallback.base_url),
        }
    }
}

/// Settings for every backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Backend used when the caller does not pick one.
    #[serde(default)]
    pub default_provider: Option<ProviderKind>,
    /// Remote chat-style backend.
    #[serde(default)]
    pub openai: BackendSettings,
    /// Remote messages-style backend.
    #[serde(default)]
    pub anthropic: BackendSettings,
    /// Remote inference-style backend.
    #[serde(default)]
    pub huggingface: BackendSettings,
    /// On-device backend.
    #[serde(default)]
    pub local: LocalLlmConfig,
    /// Request deadline in seconds for the remote backends.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl LlmSettings {
    /// Read every backend's settings from the environment.
    pub fn from_env() -> Self {
        Self {
            default_provider: std::env::var("LLMKIT_PROVIDER")
                .ok()
                .and_then(|p| p.parse().ok()),
            openai: BackendSettings::from_env("OPENAI_API_KEY", "OPENAI_MODEL", Some("OPENAI_BASE_URL")),
            anthropic: BackendSettings::from_env("ANTHROPIC_API_KEY", "ANTHROPIC_MODEL", None),
            huggingface: BackendSettings::from_env("HUGGINGFACE_API_KEY", "HUGGINGFACE_MODEL", None),
            local: LocalLlmConfig::from_env(),
            timeout_secs: utils::config::get_env_parse("LLMKIT_TIMEOUT_SECS").ok(),
        }
    }

    /// Load settings from a `.yaml`, `.yml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        utils::config::load_config_file(path).map_err(|e| LlmError::ConfigError(e.to_string()))
    }

    /// Load a settings file and fill whatever it leaves unset from the
    /// environment. The on-device section is taken from the file as a whole.
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_file(path)?.or(Self::from_env()))
    }

    /// Fill every unset remote field from `fallback`. Values already present
    /// win.
    pub fn or(self, fallback: LlmSettings) -> Self {
        Self {
            default_provider: self.default_provider.or(fallback.default_provider),
            openai: self.openai.or(fallback.openai),
            anthropic: self.anthropic.or(fallback.anthropic),
            huggingface: self.huggingface.or(fallback.huggingface),
            local: self.local,
            timeout_secs: self.timeout_secs.or(fallback.timeout_secs),
        }
    }

    /// Settings for a remote backend.
    pub fn backend(&self, kind: ProviderKind) -> Option<&BackendSettings> {
        match kind {
            ProviderKind::OpenAi => Some(&self.openai),
            ProviderKind::Anthropic => Some(&self.anthropic),
            ProviderKind::HuggingFace => Some(&self.huggingface),
            ProviderKind::OnDevice => None,
        }
    }

    /// Model a provider of this kind would use, without constructing it.
    pub fn model(&self, kind: ProviderKind) -> String {
        match self.backend(kind) {
            Some(backend) => backend
                .model
                .clone()
                .unwrap_or_else(|| kind.defaults().1.to_string()),
            None => {
                let file = self
                    .local
                    .model_path
                    .clone()
                    .unwrap_or_else(|| self.local.model_file.clone().into());
                file.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| self.local.model_file.clone())
            }
        }
    }

    /// Remote request deadline, if overridden.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
