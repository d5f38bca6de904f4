//! Common configuration structures for LLM providers.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Weight file probed for when no explicit path or file name is configured.
pub const DEFAULT_MODEL_FILE: &str = "llama-2-7b-chat.Q4_K_M.gguf";

/// llama.cpp command-line binary used for on-device inference.
pub const DEFAULT_LLAMA_CLI: &str = "llama-cli";

/// Configuration for remote LLM providers (OpenAI, Anthropic, Hugging Face).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    ///
    /// Examples:
    /// - OpenAI: "https://api.openai.com/v1"
    /// - Anthropic: "https://api.anthropic.com"
    /// - Hugging Face: "https://api-inference.huggingface.co"
    pub base_url: String,

    /// Model name/identifier.
    pub model: String,

    /// Request deadline applied to every call.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Organization ID (optional, for providers that support it).
    #[serde(default)]
    pub organization: Option<String>,
}

impl RemoteLlmConfig {
    /// Create a new remote LLM configuration.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout: default_timeout(),
            organization: None,
        }
    }

    /// Create configuration from environment variable.
    pub fn from_env(
        env_var: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .map_err(|_| LlmError::ApiKeyNotFound(format!("Environment variable: {}", env_var)))?;

        Ok(Self::new(api_key, base_url, model))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the organization ID.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Fail fast when the credential is missing.
    pub(crate) fn require_api_key(&self, backend: &str) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::ApiKeyNotFound(format!(
                "{} provider requires an API key",
                backend
            )));
        }
        Ok(())
    }

    /// Base URL without a trailing slash.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Configuration for the on-device provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalLlmConfig {
    /// Explicit path to the weight file. When unset the file is searched for.
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// File name probed for in `search_dirs`.
    #[serde(default = "default_model_file")]
    pub model_file: String,

    /// Directories probed in order.
    #[serde(default = "default_search_dirs")]
    pub search_dirs: Vec<PathBuf>,

    /// llama.cpp binary (name on `PATH` or absolute path).
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Extra arguments appended to every invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Deadline for a blocking generation.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for LocalLlmConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            model_file: default_model_file(),
            search_dirs: default_search_dirs(),
            executable: default_executable(),
            extra_args: Vec::new(),
            timeout: default_timeout(),
        }
    }
}

impl LocalLlmConfig {
    /// Create a configuration that probes the default locations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `LOCAL_MODEL_PATH`, `LOCAL_MODEL_FILE` and `LLAMA_CLI_PATH`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("LOCAL_MODEL_PATH") {
            config.model_path = Some(PathBuf::from(path));
        }
        if let Ok(file) = std::env::var("LOCAL_MODEL_FILE") {
            config.model_file = file;
        }
        if let Ok(exe) = std::env::var("LLAMA_CLI_PATH") {
            config.executable = exe;
        }
        config
    }

    /// Use an explicit weight file.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Probe for a different file name.
    pub fn with_model_file(mut self, file: impl Into<String>) -> Self {
        self.model_file = file.into();
        self
    }

    /// Replace the probed directories.
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    /// Set the llama.cpp binary.
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Append an argument to every invocation.
    pub fn with_extra_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Ordered list of directories probed for local weights.
///
/// `$LLMKIT_MODEL_DIR`, `./models`, `<cache>/llmkit/models`, `~/models`.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs_list = Vec::new();
    if let Ok(dir) = std::env::var("LLMKIT_MODEL_DIR") {
        dirs_list.push(PathBuf::from(dir));
    }
    dirs_list.push(PathBuf::from("models"));
    if let Some(cache) = dirs::cache_dir() {
        dirs_list.push(cache.join("llmkit").join("models"));
    }
    if let Some(home) = dirs::home_dir() {
        dirs_list.push(home.join("models"));
    }
    dirs_list
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_model_file() -> String {
    DEFAULT_MODEL_FILE.to_string()
}

fn default_executable() -> String {
    DEFAULT_LLAMA_CLI.to_string()
}
