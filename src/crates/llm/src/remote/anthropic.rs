//! Anthropic messages-API provider.
//!
//! The system message travels in the dedicated `system` field. Anthropic does
//! not publish a local tokenizer, so token counts use the word heuristic.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::AnthropicProvider;
//! use llm::config::RemoteLlmConfig;
//!
//! let config = RemoteLlmConfig::from_env(
//!     "ANTHROPIC_API_KEY",
//!     "https://api.anthropic.com",
//!     "claude-3-opus-20240229"
//! )?;
//! let provider = AnthropicProvider::new(config)?;
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

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";

/// Completion budget when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: usize = 1024;

const BACKEND: &str = "Anthropic";

const ANTHROPIC_MODELS: &[(&str, usize)] = &[
    ("claude-3-5-sonnet-20240620", 200000),
    ("claude-3-opus-20240229", 200000),
    ("claude-3-sonnet-20240229", 200000),
    ("claude-3-haiku-20240307", 200000),
    ("claude-2.1", 200000),
    ("claude-2.0", 100000),
    ("claude-instant-1.2", 100000),
];

/// Context sizes for Claude models; unknown models get 100000.
pub const REGISTRY: ModelRegistry = ModelRegistry::new("anthropic", ANTHROPIC_MODELS, 100000);

/// Anthropic Claude API provider.
#[derive(Clone, Debug)]
pub struct AnthropicProvider {
    config: RemoteLlmConfig,
    client: Client,
    counter: TokenCounter,
}

impl AnthropicProvider {
    /// Create a provider, failing if the API key is missing.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        config.require_api_key(BACKEND)?;
        let client = Client::builder().timeout(config.timeout).build()?;
        let counter = TokenCounter::heuristic("anthropic", &config.model);

        Ok(Self {
            config,
            client,
            counter,
        })
    }

    /// Build from `ANTHROPIC_API_KEY` and `ANTHROPIC_MODEL`.
    pub fn from_env() -> Result<Self> {
        let model =
            std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(RemoteLlmConfig::from_env(
            "ANTHROPIC_API_KEY",
            DEFAULT_BASE_URL,
            model,
        )?)
    }

    /// The configuration in use.
    pub fn config(&self) -> &RemoteLlmConfig {
        &self.config
    }

    fn build_request(&self, prompt: &str, options: &GenerateOptions, stream: bool) -> AnthropicRequest {
        AnthropicRequest {
            model: self.config.model.clone(),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            system: options.system_message.clone(),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature,
            top_p: options.top_p,
            stop_sequences: options.stop(),
            stream,
            extra: super::extra_fields("Anthropic", &options.extra, REQUEST_FIELDS),
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
    }

    fn convert_response(&self, raw: serde_json::Value) -> Result<LlmResponse> {
        let parsed: AnthropicResponse = decode(BACKEND, &raw)?;
        let text = parsed
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Ok(LlmResponse::new(
            text,
            parsed.model,
            Usage::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
            raw,
        ))
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<LlmResponse> {
        let url = self.config.endpoint("/v1/messages");
        let body = self.build_request(prompt, &options, false);
        debug!(model = %body.model, max_tokens = body.max_tokens, "sending messages request");

        let response = send_checked(BACKEND, self.authorized(self.client.post(&url)).json(&body)).await?;
        let raw = read_json(BACKEND, response).await?;
        self.convert_response(raw)
    }

    async fn generate_stream(&self, prompt: &str, options: GenerateOptions) -> Result<TextStream> {
        let url = self.config.endpoint("/v1/messages");
        let body = self.build_request(prompt, &options, true);
        debug!(model = %body.model, "opening messages stream");

        let response = send_checked(BACKEND, self.authorized(self.client.post(&url)).json(&body)).await?;

        Ok(text_stream_from_sse(response, |event, data| match event {
            "content_block_delta" => {
                let delta: AnthropicDeltaEvent = serde_json::from_str(data)?;
                Ok(delta.delta.text)
            }
            "error" => Err(LlmError::ProviderError(data.to_string())),
            _ => Ok(None),
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

// Anthropic API types
const REQUEST_FIELDS: &[&str] = &[
    "model",
    "messages",
    "system",
    "max_tokens",
    "temperature",
    "top_p",
    "stop_sequences",
    "stream",
];

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    stream: bool,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    model: String,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct AnthropicDeltaEvent {
    delta: AnthropicDelta,
}

#[derive(Debug, Deserialize)]
struct AnthropicDelta {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str) -> AnthropicProvider {
        AnthropicProvider::new(RemoteLlmConfig::new(
            "test-key",
            base_url,
            "claude-3-opus-20240229",
        ))
        .unwrap()
    }

    #[test]
    fn test_missing_api_key_fails_construction() {
        let err = AnthropicProvider::new(RemoteLlmConfig::new("", DEFAULT_BASE_URL, DEFAULT_MODEL))
            .unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyNotFound(_)));
    }

    #[test]
    fn test_system_message_uses_dedicated_field() {
        let client = provider(DEFAULT_BASE_URL);
        let options = GenerateOptions::new().with_system_message("You are helpful");
        let value = serde_json::to_value(client.build_request("Hello", &options, false)).unwrap();

        assert_eq!(value["system"], "You are helpful");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
        assert_eq!(value["messages"][0]["content"], "Hello");
        assert_eq!(value["max_tokens"], 1024);
        assert!(value.get("top_p").is_none());
        assert!(value.get("stop_sequences").is_none());
    }

    #[test]
    fn test_unknown_model_context_size() {
        let client = provider(DEFAULT_BASE_URL);
        assert_eq!(client.model_context_size(Some("unknown-model-xyz")), 100000);
        assert_eq!(client.model_context_size(Some("claude-2.0")), 100000);
        assert_eq!(client.model_context_size(None), 200000);
    }

    #[test]
    fn test_count_tokens_uses_word_heuristic() {
        let client = provider(DEFAULT_BASE_URL);
        assert_eq!(client.count_tokens("the quick brown fox"), 4);
    }

    #[tokio::test]
    async fn test_available_models_from_registry() {
        let models = provider(DEFAULT_BASE_URL).available_models().await.unwrap();
        assert!(models.contains(&"claude-3-haiku-20240307".to_string()));
        assert_eq!(models.len(), ANTHROPIC_MODELS.len());
    }

    #[tokio::test]
    async fn test_generate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({"system": "Be brief"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": "claude-3-opus-20240229",
                "content": [
                    {"type": "text", "text": "Hello"},
                    {"type": "text", "text": " world"}
                ],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 10, "output_tokens": 3}
            })))
            .mount(&server)
            .await;

        let response = provider(&server.uri())
            .generate("Hi", GenerateOptions::new().with_system_message("Be brief"))
            .await
            .unwrap();

        assert_eq!(response.text, "Hello world");
        assert_eq!(response.usage.total_tokens, 13);
        assert_eq!(response.raw_response["id"], "msg_1");
    }

    #[tokio::test]
    async fn test_generate_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider(&server.uri())
            .generate("Hi", GenerateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::ProviderError(_)));
    }

    #[tokio::test]
    async fn test_generate_stream() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\"}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let stream = provider(&server.uri())
            .generate_stream("Hi", GenerateOptions::new())
            .await
            .unwrap();
        let text: String = stream.map(|f| f.unwrap()).collect::<Vec<_>>().await.concat();
        assert_eq!(text, "Hi there");
    }
}
