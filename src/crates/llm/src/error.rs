//! Error types for LLM provider implementations.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when working with LLM providers.
///
/// Variants fall into two classes. Configuration errors are raised while a
/// provider is being constructed and mean no call was ever attempted.
/// Transport errors are raised by `generate`/`generate_stream` when the
/// backend call itself fails. Neither class is retried.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize/deserialize data.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// API key not found in environment or configuration.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Model weights or model resource not found.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid response from provider.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Backend returned a non-success status.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Streaming transport broke mid-response.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Local inference process could not be spawned or exited abnormally.
    #[error("Process error: {0}")]
    ProcessError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Check if this error was raised while building a provider.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LlmError::ApiKeyNotFound(_) | LlmError::ModelNotFound(_) | LlmError::ConfigError(_)
        )
    }

    /// Check if this error came from a failed backend call.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            LlmError::HttpError(_)
                | LlmError::AuthenticationError(_)
                | LlmError::RateLimitExceeded(_)
                | LlmError::InvalidResponse(_)
                | LlmError::ProviderError(_)
                | LlmError::StreamError(_)
                | LlmError::ProcessError(_)
        )
    }

    /// Map a non-success HTTP status to the matching transport error.
    pub(crate) fn from_status(backend: &str, status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::AuthenticationError(body),
            429 => LlmError::RateLimitExceeded(body),
            _ => LlmError::ProviderError(format!("{} API error {}: {}", backend, status, body)),
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for LlmError {
    fn from(err: std::io::Error) -> Self {
        LlmError::ProcessError(err.to_string())
    }
}
