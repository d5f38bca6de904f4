//! Deterministic provider for context tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use llm::{GenerateOptions, LlmError, LlmProvider, LlmResponse, Result, TextStream, Usage};
use std::sync::Mutex;

/// Counts whitespace-separated words and returns a canned reply.
pub struct MockProvider {
    name: &'static str,
    reply: std::result::Result<String, String>,
    calls: Mutex<Vec<(String, GenerateOptions)>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::replying("  A short summary.  ")
    }

    pub fn replying(reply: &str) -> Self {
        Self {
            name: "mock",
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            name: "mock",
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn calls(&self) -> Vec<(String, GenerateOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

/// `n` space-separated words, i.e. `n` mock tokens.
pub fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<LlmResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), options));
        match &self.reply {
            Ok(text) => Ok(LlmResponse::new(
                text.clone(),
                "mock-model",
                Usage::new(self.count_tokens(prompt), self.count_tokens(text)),
                serde_json::Value::Null,
            )),
            Err(message) => Err(LlmError::ProviderError(message.clone())),
        }
    }

    async fn generate_stream(&self, prompt: &str, options: GenerateOptions) -> Result<TextStream> {
        let response = self.generate(prompt, options).await?;
        Ok(Box::pin(stream::iter(vec![Ok(response.text)])))
    }

    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    async fn available_models(&self) -> Result<Vec<String>> {
        Ok(vec!["mock-model".to_string()])
    }

    fn model_context_size(&self, _model: Option<&str>) -> usize {
        4096
    }
}
