//! Build a provider for a named backend from [`LlmSettings`].

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::local::{on_device, OnDeviceProvider};
use crate::provider::LlmProvider;
use crate::registry::ModelRegistry;
use crate::remote::{anthropic, huggingface, openai};
use crate::remote::{AnthropicProvider, HuggingFaceProvider, OpenAiProvider};
use crate::settings::{BackendSettings, LlmSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// The four supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Remote chat-style (OpenAI chat completions).
    #[serde(alias = "chat")]
    OpenAi,
    /// Remote messages-style (Anthropic messages).
    #[serde(alias = "claude")]
    Anthropic,
    /// Remote inference-style (Hugging Face text generation).
    #[serde(alias = "hf")]
    HuggingFace,
    /// On-device (llama.cpp).
    #[serde(rename = "local", alias = "on-device")]
    OnDevice,
}

impl ProviderKind {
    /// All backends, in declaration order.
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::HuggingFace,
        ProviderKind::OnDevice,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::HuggingFace => "huggingface",
            ProviderKind::OnDevice => "local",
        }
    }

    /// Static context-size table for this backend.
    pub fn registry(&self) -> &'static ModelRegistry {
        match self {
            ProviderKind::OpenAi => &openai::REGISTRY,
            ProviderKind::Anthropic => &anthropic::REGISTRY,
            ProviderKind::HuggingFace => &huggingface::REGISTRY,
            ProviderKind::OnDevice => &on_device::REGISTRY,
        }
    }

    fn api_key_var(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::HuggingFace => "HUGGINGFACE_API_KEY",
            ProviderKind::OnDevice => "",
        }
    }

    pub(crate) fn defaults(&self) -> (&'static str, &'static str) {
        match self {
            ProviderKind::OpenAi => (openai::DEFAULT_BASE_URL, openai::DEFAULT_MODEL),
            ProviderKind::Anthropic => (anthropic::DEFAULT_BASE_URL, anthropic::DEFAULT_MODEL),
            ProviderKind::HuggingFace => (huggingface::DEFAULT_BASE_URL, huggingface::DEFAULT_MODEL),
            ProviderKind::OnDevice => ("", ""),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "chat" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "huggingface" | "hf" => Ok(ProviderKind::HuggingFace),
            "local" | "on-device" | "ondevice" => Ok(ProviderKind::OnDevice),
            other => Err(LlmError::ConfigError(format!("unknown provider: {}", other))),
        }
    }
}

/// Construct the provider for `kind`.
///
/// # Errors
///
/// Configuration-class errors when credentials or model weights are missing.
pub fn create_provider(kind: ProviderKind, settings: &LlmSettings) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(remote_config(kind, &settings.openai, settings)?)?),
        ProviderKind::Anthropic => {
            Arc::new(AnthropicProvider::new(remote_config(kind, &settings.anthropic, settings)?)?)
        }
        ProviderKind::HuggingFace => Arc::new(HuggingFaceProvider::new(remote_config(
            kind,
            &settings.huggingface,
            settings,
        )?)?),
        ProviderKind::OnDevice => Arc::new(OnDeviceProvider::new(settings.local.clone())?),
    };

    info!(provider = %kind, model = provider.model(), "provider ready");
    Ok(provider)
}

fn remote_config(
    kind: ProviderKind,
    backend: &BackendSettings,
    settings: &LlmSettings,
) -> Result<RemoteLlmConfig> {
    let api_key = backend
        .api_key
        .clone()
        .ok_or_else(|| LlmError::ApiKeyNotFound(format!("Environment variable: {}", kind.api_key_var())))?;
    let (default_base_url, default_model) = kind.defaults();

    let mut config = RemoteLlmConfig::new(
        api_key,
        backend.base_url.as_deref().unwrap_or(default_base_url),
        backend.model.as_deref().unwrap_or(default_model),
    );
    if let Some(timeout) = settings.timeout() {
        config = config.with_timeout(timeout);
    }
    Ok(config)
}
