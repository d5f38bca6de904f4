//! llama.cpp on-device provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::local::OnDeviceProvider;
//! use llm::config::LocalLlmConfig;
//! use llm::{GenerateOptions, LlmProvider};
//!
//! let provider = OnDeviceProvider::new(
//!     LocalLlmConfig::new().with_model_path("/opt/models/mistral-7b-instruct.Q4_K_M.gguf"),
//! )?;
//! let response = provider.generate("Hello!", GenerateOptions::new()).await?;
//! ```

use crate::config::LocalLlmConfig;
use crate::error::{LlmError, Result};
use crate::provider::{GenerateOptions, LlmProvider, LlmResponse, TextStream, Usage};
use crate::registry::ModelRegistry;
use crate::tokens::TokenCounter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, error};

/// Completion budget when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: usize = 512;

const GGUF_EXTENSION: &str = "gguf";

const LOCAL_MODELS: &[(&str, usize)] = &[
    ("llama-2-7b-chat.Q4_K_M", 4096),
    ("llama-2-13b-chat.Q4_K_M", 4096),
    ("mistral-7b-instruct-v0.2.Q4_K_M", 32768),
    ("zephyr-7b-beta.Q4_K_M", 32768),
    ("phi-2.Q4_K_M", 2048),
    ("tinyllama-1.1b-chat-v1.0.Q4_K_M", 2048),
];

/// Context sizes keyed by weight-file stem; unknown models get 2048.
pub const REGISTRY: ModelRegistry = ModelRegistry::new("on-device", LOCAL_MODELS, 2048);

/// Find the weight file: the explicit path if configured, otherwise the first
/// search directory that contains `model_file`.
pub fn resolve_model_path(config: &LocalLlmConfig) -> Result<PathBuf> {
    if let Some(path) = &config.model_path {
        if path.is_file() {
            return Ok(path.clone());
        }
        return Err(LlmError::ModelNotFound(format!(
            "configured model path {} does not exist",
            path.display()
        )));
    }

    for dir in &config.search_dirs {
        let candidate = dir.join(&config.model_file);
        debug!(candidate = %candidate.display(), "probing for model weights");
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    let searched = config
        .search_dirs
        .iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(LlmError::ModelNotFound(format!(
        "{} not found in any of: {}",
        config.model_file, searched
    )))
}

/// Provider that runs a local GGUF model with llama.cpp.
#[derive(Clone, Debug)]
pub struct OnDeviceProvider {
    config: LocalLlmConfig,
    model_path: PathBuf,
    model: String,
    counter: TokenCounter,
}

impl OnDeviceProvider {
    /// Create a provider, failing if no weight file can be found.
    pub fn new(config: LocalLlmConfig) -> Result<Self> {
        let model_path = resolve_model_path(&config)?;
        let model = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.model_file.clone());
        let counter = TokenCounter::heuristic("on-device", &model);

        Ok(Self {
            config,
            model_path,
            model,
            counter,
        })
    }

    /// Build from `LOCAL_MODEL_PATH`, `LOCAL_MODEL_FILE` and `LLAMA_CLI_PATH`.
    pub fn from_env() -> Result<Self> {
        Self::new(LocalLlmConfig::from_env())
    }

    /// Resolved weight file.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    fn command(&self, prompt: &str, options: &GenerateOptions) -> Command {
        let mut cmd = Command::new(&self.config.executable);
        cmd.arg("-m")
            .arg(&self.model_path)
            .arg("-p")
            .arg(options.prompt_with_system(prompt))
            .arg("-n")
            .arg(options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).to_string())
            .arg("--temp")
            .arg(options.temperature.to_string())
            .arg("--no-display-prompt");

        if let Some(top_p) = options.top_p {
            cmd.arg("--top-p").arg(top_p.to_string());
        }
        for stop in &options.stop_sequences {
            cmd.arg("-r").arg(stop);
        }
        for (key, value) in &options.extra {
            cmd.arg(format!("--{}", key));
            match value {
                serde_json::Value::Bool(true) | serde_json::Value::Null => {}
                serde_json::Value::String(s) => {
                    cmd.arg(s);
                }
                other => {
                    cmd.arg(other.to_string());
                }
            }
        }
        cmd.args(&self.config.extra_args);

        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl LlmProvider for OnDeviceProvider {
    fn name(&self) -> &str {
        "on-device"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<LlmResponse> {
        let full_prompt = options.prompt_with_system(prompt);
        let mut cmd = self.command(prompt, &options);
        debug!(model = %self.model, executable = %self.config.executable, "running local inference");

        let output = tokio::time::timeout(self.config.timeout, cmd.output())
            .await
            .map_err(|_| {
                error!(model = %self.model, "local inference timed out");
                LlmError::ProcessError(format!(
                    "inference exceeded {}s deadline",
                    self.config.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                error!(executable = %self.config.executable, error = %e, "failed to run llama.cpp");
                LlmError::ProcessError(format!("{}: {}", self.config.executable, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(status = %output.status, "llama.cpp exited with an error");
            return Err(LlmError::ProcessError(format!(
                "llama.cpp exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let usage = Usage::new(self.count_tokens(&full_prompt), self.count_tokens(&text));
        let raw = serde_json::json!({
            "model_path": self.model_path.display().to_string(),
            "exit_status": output.status.code(),
        });

        Ok(LlmResponse::new(text, self.model.clone(), usage, raw))
    }

    async fn generate_stream(&self, prompt: &str, options: GenerateOptions) -> Result<TextStream> {
        let mut cmd = self.command(prompt, &options);
        cmd.stdout(Stdio::piped()).stderr(Stdio::null());
        debug!(model = %self.model, "streaming local inference");

        let mut child = cmd.spawn().map_err(|e| {
            error!(executable = %self.config.executable, error = %e, "failed to spawn llama.cpp");
            LlmError::ProcessError(format!("{}: {}", self.config.executable, e))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LlmError::ProcessError("llama.cpp stdout was not captured".to_string()))?;

        Ok(stdout_stream(child, stdout))
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        let mut models = Vec::new();
        for dir in &self.config.search_dirs {
            let mut entries = match tokio::fs::read_dir(dir).await {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some(GGUF_EXTENSION) {
                    if let Some(stem) = path.file_stem() {
                        models.push(stem.to_string_lossy().into_owned());
                    }
                }
            }
        }
        if !models.contains(&self.model) {
            models.push(self.model.clone());
        }
        models.sort();
        models.dedup();
        Ok(models)
    }

    fn model_context_size(&self, model: Option<&str>) -> usize {
        REGISTRY.context_size(model.unwrap_or(&self.model))
    }
}

/// Stream the child's stdout as UTF-8 fragments. The child is owned by the
/// stream and killed if the stream is dropped early.
fn stdout_stream(child: Child, stdout: ChildStdout) -> TextStream {
    Box::pin(async_stream::try_stream! {
        let mut child = child;
        let mut stdout = stdout;
        let mut buf = [0u8; 512];
        let mut pending: Vec<u8> = Vec::new();

        loop {
            let n = stdout
                .read(&mut buf)
                .await
                .map_err(|e| {
                    error!(error = %e, "failed reading llama.cpp output");
                    LlmError::StreamError(e.to_string())
                })?;
            if n == 0 {
                break;
            }
            pending.extend_from_slice(&buf[..n]);
            let text = take_utf8_prefix(&mut pending);
            if !text.is_empty() {
                yield text;
            }
        }

        if !pending.is_empty() {
            yield String::from_utf8_lossy(&pending).into_owned();
        }

        let status = child
            .wait()
            .await
            .map_err(|e| {
                error!(error = %e, "failed waiting for llama.cpp");
                LlmError::ProcessError(e.to_string())
            })?;
        if !status.success() {
            error!(status = %status, "llama.cpp exited with an error");
            Err::<(), LlmError>(LlmError::ProcessError(format!(
                "llama.cpp exited with {}",
                status
            )))?;
        }
    })
}

/// Remove and return the longest valid UTF-8 prefix of `pending`, leaving an
/// incomplete trailing sequence in place. Invalid bytes are replaced.
fn take_utf8_prefix(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(s) => {
            let text = s.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}
