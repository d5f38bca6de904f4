//! The provider capability contract shared by every backend.
//!
//! All backends implement [`LlmProvider`]. Callers hold them as
//! `Arc<dyn LlmProvider>` and never need to know which backend answered.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{GenerateOptions, LlmProvider};
//! use futures::StreamExt;
//!
//! let response = provider
//!     .generate("Explain ownership", GenerateOptions::new().with_max_tokens(256))
//!     .await?;
//! println!("{} ({} tokens)", response.text, response.usage.total_tokens);
//!
//! let mut stream = provider.generate_stream("Count to 5", GenerateOptions::new()).await?;
//! while let Some(fragment) = stream.next().await {
//!     print!("{}", fragment?);
//! }
//! ```

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Sampling temperature used when the caller does not pick one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Incremental text fragments produced by `generate_stream`.
///
/// The stream owns its transport. Dropping it before the end closes the
/// connection (or stops the local process).
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Generation parameters accepted by every backend.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    /// Maximum tokens to generate. `None` selects the backend default.
    pub max_tokens: Option<usize>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Nucleus sampling. Omitted from the request when `None`.
    pub top_p: Option<f32>,

    /// Sequences that halt generation. Omitted from the request when empty.
    pub stop_sequences: Vec<String>,

    /// Standing instruction. Sent in a dedicated protocol field when the
    /// backend has one, otherwise prepended to the prompt.
    pub system_message: Option<String>,

    /// Backend-specific fields merged into the request body. Keys the
    /// backend request already sets (model, stream, sampling fields) are
    /// dropped.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: DEFAULT_TEMPERATURE,
            top_p: None,
            stop_sequences: Vec::new(),
            system_message: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl GenerateOptions {
    /// Options with backend defaults and temperature 0.7.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set top-p (nucleus) sampling.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set stop sequences.
    pub fn with_stop_sequences(mut self, sequences: Vec<String>) -> Self {
        self.stop_sequences = sequences;
        self
    }

    /// Set the system message.
    pub fn with_system_message(mut self, system: impl Into<String>) -> Self {
        self.system_message = Some(system.into());
        self
    }

    /// Add a backend-specific request field.
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Stop sequences as an optional list, `None` when empty.
    pub(crate) fn stop(&self) -> Option<Vec<String>> {
        if self.stop_sequences.is_empty() {
            None
        } else {
            Some(self.stop_sequences.clone())
        }
    }

    /// Prompt with the system message prepended, for backends without a
    /// dedicated system field.
    pub(crate) fn prompt_with_system(&self, prompt: &str) -> String {
        match &self.system_message {
            Some(system) if !system.is_empty() => format!("{}\n\n{}", system, prompt),
            _ => prompt.to_string(),
        }
    }
}

/// Token accounting for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: usize,
    /// Tokens produced by the model.
    pub completion_tokens: usize,
    /// Sum of both.
    pub total_tokens: usize,
}

impl Usage {
    /// Build usage, deriving the total.
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Result of a blocking generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text.
    pub text: String,
    /// Model that produced the text.
    pub model: String,
    /// Token usage.
    pub usage: Usage,
    /// Backend payload, kept for diagnostics.
    pub raw_response: serde_json::Value,
}

impl LlmResponse {
    /// Create a response.
    pub fn new(
        text: impl Into<String>,
        model: impl Into<String>,
        usage: Usage,
        raw_response: serde_json::Value,
    ) -> Self {
        Self {
            text: text.into(),
            model: model.into(),
            usage,
            raw_response,
        }
    }
}

/// Capability contract implemented by every text-generation backend.
///
/// Implementations must be `Send + Sync`; share them with `Arc<dyn LlmProvider>`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend identifier, e.g. `"openai"`.
    fn name(&self) -> &str;

    /// Model used when a call does not name one.
    fn model(&self) -> &str;

    /// Generate a complete response.
    ///
    /// # Errors
    ///
    /// Transport-class [`LlmError`](crate::LlmError) when the backend call fails.
    /// Failures are never retried.
    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<LlmResponse>;

    /// Generate a response as incremental text fragments.
    async fn generate_stream(&self, prompt: &str, options: GenerateOptions) -> Result<TextStream>;

    /// Count the tokens `text` would occupy for this backend.
    fn count_tokens(&self, text: &str) -> usize;

    /// Models this backend can serve.
    async fn available_models(&self) -> Result<Vec<String>>;

    /// Context window of `model` (or the active model when `None`).
    ///
    /// Unknown models log a warning and return the backend's default.
    fn model_context_size(&self, model: Option<&str>) -> usize;
}
