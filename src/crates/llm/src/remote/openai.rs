//! OpenAI chat-completions provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::OpenAiProvider;
//! use llm::config::RemoteLlmConfig;
//! use llm::{GenerateOptions, LlmProvider};
//!
//! let config = RemoteLlmConfig::from_env(
//!     "OPENAI_API_KEY",
//!     "https://api.openai.com/v1",
//!     "gpt-4"
//! )?;
//! let provider = OpenAiProvider::new(config)?;
//!
//! let response = provider
//!     .generate("Hello!", GenerateOptions::new().with_system_message("Be brief"))
//!     .await?;
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::provider::{GenerateOptions, LlmProvider, LlmResponse, TextStream, Usage};
use crate::registry::ModelRegistry;
use crate::remote::{decode, read_json, send_checked};
use crate::sse::text_stream_from_sse;
use crate::tokens::TokenCounter;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Completion budget when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: usize = 1024;

const BACKEND: &str = "OpenAI";

const OPENAI_MODELS: &[(&str, usize)] = &[
    ("gpt-3.5-turbo", 4096),
    ("gpt-3.5-turbo-16k", 16384),
    ("gpt-3.5-turbo-1106", 16385),
    ("gpt-4", 8192),
    ("gpt-4-32k", 32768),
    ("gpt-4-turbo", 128000),
    ("gpt-4-turbo-preview", 128000),
    ("gpt-4o", 128000),
    ("gpt-4o-mini", 128000),
];

/// Context sizes for OpenAI models; unknown models get 4096.
pub const REGISTRY: ModelRegistry = ModelRegistry::new("openai", OPENAI_MODELS, 4096);

/// OpenAI API provider.
#[derive(Clone, Debug)]
pub struct OpenAiProvider {
    config: RemoteLlmConfig,
    client: Client,
    counter: TokenCounter,
}

impl OpenAiProvider {
    /// Create a provider, failing if the API key is missing.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        config.require_api_key(BACKEND)?;
        let client = Client::builder().timeout(config.timeout).build()?;
        let counter = TokenCounter::for_openai_model(&config.model);

        Ok(Self {
            config,
            client,
            counter,
        })
    }

    /// Build from `OPENAI_API_KEY`, `OPENAI_MODEL` and `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(RemoteLlmConfig::from_env("OPENAI_API_KEY", base_url, model)?)
    }

    /// The configuration in use.
    pub fn config(&self) -> &RemoteLlmConfig {
        &self.config
    }

    fn build_request(&self, prompt: &str, options: &GenerateOptions, stream: bool) -> OpenAiRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &options.system_message {
            messages.push(OpenAiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OpenAiMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        OpenAiRequest {
            model: self.config.model.clone(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: options.top_p,
            stop: options.stop(),
            stream,
            extra: super::extra_fields("OpenAI", &options.extra, REQUEST_FIELDS),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("Authorization", format!("Bearer {}", self.config.api_key));
        match &self.config.organization {
            Some(org) => builder.header("OpenAI-Organization", org),
            None => builder,
        }
    }

    fn convert_response(&self, raw: serde_json::Value) -> Result<LlmResponse> {
        let parsed: OpenAiResponse = decode(BACKEND, &raw)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

        let usage = parsed
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse::new(
            choice.message.content.unwrap_or_default(),
            parsed.model,
            usage,
            raw,
        ))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<LlmResponse> {
        let url = self.config.endpoint("/chat/completions");
        let body = self.build_request(prompt, &options, false);
        debug!(model = %body.model, max_tokens = body.max_tokens, "sending chat completion");

        let response = send_checked(BACKEND, self.authorized(self.client.post(&url)).json(&body)).await?;
        let raw = read_json(BACKEND, response).await?;
        self.convert_response(raw)
    }

    async fn generate_stream(&self, prompt: &str, options: GenerateOptions) -> Result<TextStream> {
        let url = self.config.endpoint("/chat/completions");
        let body = self.build_request(prompt, &options, true);
        debug!(model = %body.model, "opening chat completion stream");

        let response = send_checked(BACKEND, self.authorized(self.client.post(&url)).json(&body)).await?;

        Ok(text_stream_from_sse(response, |_event, data| {
            if data.trim() == "[DONE]" {
                return Ok(None);
            }
            let chunk: OpenAiStreamChunk = serde_json::from_str(data)?;
            Ok(chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content))
        }))
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        let url = self.config.endpoint("/models");
        let response = send_checked(BACKEND, self.authorized(self.client.get(&url))).await?;
        let raw = read_json(BACKEND, response).await?;
        let listing: OpenAiModelList = decode(BACKEND, &raw)?;

        let mut models: Vec<String> = listing.data.into_iter().map(|m| m.id).collect();
        models.sort();
        Ok(models)
    }

    fn model_context_size(&self, model: Option<&str>) -> usize {
        REGISTRY.context_size(model.unwrap_or(&self.config.model))
    }
}

// OpenAI API types
const REQUEST_FIELDS: &[&str] = &["model", "messages", "temperature", "max_tokens", "top_p", "stop", "stream"];

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    stream: bool,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    #[serde(default)]
    delta: OpenAiDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiModelList {
    data: Vec<OpenAiModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAiModel {
    id: String,
}
