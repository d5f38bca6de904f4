//! Integration tests for provider construction
//!
//! Every backend is built through `create_provider` and exercised through the
//! `LlmProvider` trait object.

use llm::{create_provider, BackendSettings, GenerateOptions, LlmError, LlmSettings, ProviderKind};
use serde_json::json;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(base_url: &str) -> BackendSettings {
    BackendSettings {
        api_key: Some("test-key".to_string()),
        model: None,
        base_url: Some(base_url.to_string()),
    }
}

#[test]
fn test_remote_providers_require_api_key() {
    let settings = LlmSettings::default();
    for kind in [ProviderKind::OpenAi, ProviderKind::Anthropic, ProviderKind::HuggingFace] {
        let err = create_provider(kind, &settings).err().unwrap();
        assert!(matches!(err, LlmError::ApiKeyNotFound(_)), "{}: {}", kind, err);
        assert!(err.is_configuration_error());
    }
}

#[test]
fn test_on_device_requires_weights() {
    let empty = TempDir::new().unwrap();
    let mut settings = LlmSettings::default();
    settings.local.search_dirs = vec![empty.path().to_path_buf()];

    let err = create_provider(ProviderKind::OnDevice, &settings).err().unwrap();
    assert!(matches!(err, LlmError::ModelNotFound(_)));
}

#[test]
fn test_on_device_from_search_dir() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("phi-2.Q4_K_M.gguf"), b"GGUF").unwrap();

    let mut settings = LlmSettings::default();
    settings.local.model_file = "phi-2.Q4_K_M.gguf".to_string();
    settings.local.search_dirs = vec![dir.path().to_path_buf()];

    let provider = create_provider(ProviderKind::OnDevice, &settings).unwrap();
    assert_eq!(provider.name(), "on-device");
    assert_eq!(provider.model(), "phi-2.Q4_K_M");
    assert_eq!(provider.model_context_size(None), 2048);
}

#[test]
fn test_defaults_and_context_sizes() {
    let settings = LlmSettings {
        openai: backend("http://localhost:1"),
        anthropic: backend("http://localhost:1"),
        huggingface: backend("http://localhost:1"),
        timeout_secs: Some(3),
        ..LlmSettings::default()
    };

    let openai = create_provider(ProviderKind::OpenAi, &settings).unwrap();
    assert_eq!(openai.model(), "gpt-3.5-turbo");
    assert_eq!(openai.model_context_size(None), 4096);

    let anthropic = create_provider(ProviderKind::Anthropic, &settings).unwrap();
    assert_eq!(anthropic.model(), "claude-3-sonnet-20240229");
    assert_eq!(anthropic.model_context_size(Some("unknown-model-xyz")), 100000);

    let huggingface = create_provider(ProviderKind::HuggingFace, &settings).unwrap();
    assert_eq!(huggingface.model(), "mistralai/Mistral-7B-Instruct-v0.2");
    assert_eq!(huggingface.model_context_size(Some("unknown-model-xyz")), 2048);
    assert_eq!(settings.timeout(), Some(Duration::from_secs(3)));
}

#[tokio::test]
async fn test_factory_provider_reaches_overridden_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_2",
            "type": "message",
            "role": "assistant",
            "model": "claude-2.1",
            "content": [{"type": "text", "text": "pong"}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = LlmSettings::default();
    settings.anthropic = BackendSettings {
        model: Some("claude-2.1".to_string()),
        ..backend(&server.uri())
    };

    let provider = create_provider(ProviderKind::Anthropic, &settings).unwrap();
    let response = provider.generate("ping", GenerateOptions::new()).await.unwrap();
    assert_eq!(response.text, "pong");
    assert_eq!(response.usage.total_tokens, 2);
}

#[tokio::test]
async fn test_transport_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gpt2"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = LlmSettings::default();
    settings.huggingface = BackendSettings {
        model: Some("gpt2".to_string()),
        ..backend(&server.uri())
    };

    let provider = create_provider(ProviderKind::HuggingFace, &settings).unwrap();
    let err = provider.generate("hello", GenerateOptions::new()).await.unwrap_err();
    assert!(matches!(err, LlmError::RateLimitExceeded(_)));
    assert!(err.is_transport_error());
}
