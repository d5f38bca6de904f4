//! Hugging Face text-generation inference provider.
//!
//! The inference protocol has no system field, so a system message is
//! prepended to the prompt. The API does not report usage; it is computed
//! with this provider's own token counter.

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
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

/// `max_new_tokens` when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: usize = 512;

const BACKEND: &str = "HuggingFace";

const HUGGINGFACE_MODELS: &[(&str, usize)] = &[
    ("mistralai/Mistral-7B-Instruct-v0.2", 32768),
    ("mistralai/Mixtral-8x7B-Instruct-v0.1", 32768),
    ("HuggingFaceH4/zephyr-7b-beta", 32768),
    ("meta-llama/Llama-2-7b-chat-hf", 4096),
    ("meta-llama/Llama-2-13b-chat-hf", 4096),
    ("tiiuae/falcon-7b-instruct", 2048),
    ("bigscience/bloom", 2048),
    ("google/flan-t5-xxl", 512),
    ("gpt2", 1024),
];

/// Context sizes for hosted inference models; unknown models get 2048.
pub const REGISTRY: ModelRegistry = ModelRegistry::new("huggingface", HUGGINGFACE_MODELS, 2048);

/// Hugging Face Inference API provider.
#[derive(Clone, Debug)]
pub struct HuggingFaceProvider {
    config: RemoteLlmConfig,
    client: Client,
    counter: TokenCounter,
}

impl HuggingFaceProvider {
    /// Create a provider, failing if the API key is missing.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        config.require_api_key(BACKEND)?;
        let client = Client::builder().timeout(config.timeout).build()?;
        let counter = TokenCounter::heuristic("huggingface", &config.model);

        Ok(Self {
            config,
            client,
            counter,
        })
    }

    /// Build from `HUGGINGFACE_API_KEY` and `HUGGINGFACE_MODEL`.
    pub fn from_env() -> Result<Self> {
        let model =
            std::env::var("HUGGINGFACE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(RemoteLlmConfig::from_env(
            "HUGGINGFACE_API_KEY",
            DEFAULT_BASE_URL,
            model,
        )?)
    }

    /// The configuration in use.
    pub fn config(&self) -> &RemoteLlmConfig {
        &self.config
    }

    fn build_request(&self, prompt: &str, options: &GenerateOptions, stream: bool) -> InferenceRequest {
        InferenceRequest {
            inputs: options.prompt_with_system(prompt),
            parameters: InferenceParameters {
                max_new_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                temperature: options.temperature,
                top_p: options.top_p,
                stop: options.stop(),
                return_full_text: false,
                extra: super::extra_fields("HuggingFace", &options.extra, PARAMETER_FIELDS),
            },
            stream,
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("Bearer {}", self.config.api_key))
    }

    fn model_url(&self) -> String {
        self.config.endpoint(&format!("/models/{}", self.config.model))
    }

    fn convert_response(&self, prompt: &str, raw: serde_json::Value) -> Result<LlmResponse> {
        let parsed: InferenceResponse = decode(BACKEND, &raw)?;
        let text = match parsed {
            InferenceResponse::Batch(mut outputs) => {
                if outputs.is_empty() {
                    return Err(LlmError::InvalidResponse(
                        "response contained no generations".to_string(),
                    ));
                }
                outputs.swap_remove(0).generated_text
            }
            InferenceResponse::Single(output) => output.generated_text,
        };

        let usage = Usage::new(self.count_tokens(prompt), self.count_tokens(&text));
        Ok(LlmResponse::new(text, self.config.model.clone(), usage, raw))
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<LlmResponse> {
        let body = self.build_request(prompt, &options, false);
        debug!(
            model = %self.config.model,
            max_new_tokens = body.parameters.max_new_tokens,
            "sending inference request"
        );

        let response =
            send_checked(BACKEND, self.authorized(self.client.post(self.model_url())).json(&body)).await?;
        let raw = read_json(BACKEND, response).await?;
        self.convert_response(&body.inputs, raw)
    }

    async fn generate_stream(&self, prompt: &str, options: GenerateOptions) -> Result<TextStream> {
        let body = self.build_request(prompt, &options, true);
        debug!(model = %self.config.model, "opening inference stream");

        let response =
            send_checked(BACKEND, self.authorized(self.client.post(self.model_url())).json(&body)).await?;

        Ok(text_stream_from_sse(response, |_event, data| {
            let chunk: InferenceStreamChunk = serde_json::from_str(data)?;
            if let Some(error) = chunk.error {
                return Err(LlmError::ProviderError(error));
            }
            Ok(chunk.token.filter(|t| !t.special).map(|t| t.text))
        }))
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        Ok(REGISTRY.model_names())
    }

    fn model_context_size(&self, model: Option<&str>) -> usize {
        REGISTRY.context_size(model.unwrap_or(&self.config.model))
    }
}

// Inference API types
const PARAMETER_FIELDS: &[&str] = &["max_new_tokens", "temperature", "top_p", "stop", "return_full_text"];

#[derive(Debug, Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: InferenceParameters,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    return_full_text: bool,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<InferenceOutput>),
    Single(InferenceOutput),
}

#[derive(Debug, Deserialize)]
struct InferenceOutput {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct InferenceStreamChunk {
    token: Option<InferenceToken>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InferenceToken {
    text: String,
    #[serde(default)]
    special: bool,
}
