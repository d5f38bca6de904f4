//! Remote LLM provider implementations.
//!
//! These providers talk to hosted APIs and require an API key, which is
//! checked when the provider is constructed.
//!
//! # Providers
//!
//! - **OpenAI** - chat-completions protocol (GPT-3.5, GPT-4)
//! - **Anthropic** - messages protocol (Claude 2, Claude 3)
//! - **Hugging Face** - text-generation inference protocol

pub mod anthropic;
pub mod huggingface;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use huggingface::HuggingFaceProvider;
pub use openai::OpenAiProvider;

use crate::error::{LlmError, Result};
use reqwest::{RequestBuilder, Response};
use serde_json::{Map, Value};
use tracing::{error, warn};

/// Send a request and turn transport failures and error statuses into
/// [`LlmError`]s, logging each one.
pub(crate) async fn send_checked(backend: &str, request: RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(|e| {
        error!(backend, error = %e, "request to backend failed");
        LlmError::HttpError(e)
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(backend, %status, "backend returned an error status");
        return Err(LlmError::from_status(backend, status, body));
    }

    Ok(response)
}

/// Read a JSON body, keeping it as an opaque value.
pub(crate) async fn read_json(backend: &str, response: Response) -> Result<serde_json::Value> {
    response.json().await.map_err(|e| {
        error!(backend, error = %e, "backend returned an unreadable body");
        LlmError::InvalidResponse(e.to_string())
    })
}

/// Decode a typed view of a raw payload.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    backend: &str,
    raw: &serde_json::Value,
) -> Result<T> {
    serde_json::from_value(raw.clone()).map_err(|e| {
        error!(backend, error = %e, "unexpected response shape");
        LlmError::InvalidResponse(e.to_string())
    })
}

/// Caller-supplied request fields minus any key the request body already
/// sets. The typed field always wins.
pub(crate) fn extra_fields(backend: &str, extra: &Map<String, Value>, reserved: &[&str]) -> Map<String, Value> {
    extra
        .iter()
        .filter(|(key, _)| {
            let taken = reserved.contains(&key.as_str());
            if taken {
                warn!(backend, key = %key, "ignoring extra field that the request already sets");
            }
            !taken
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_fields_drop_reserved_keys() {
        let mut extra = Map::new();
        extra.insert("model".to_string(), json!("other"));
        extra.insert("seed".to_string(), json!(7));
        extra.insert("stream".to_string(), json!(true));

        let kept = extra_fields("OpenAI", &extra, &["model", "stream"]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept["seed"], 7);
    }
}
