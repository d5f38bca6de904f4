//! Error types for context operations.

use llm::LlmError;
use thiserror::Error;

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors raised by [`ContextManager`](crate::ContextManager).
#[derive(Debug, Error)]
pub enum ContextError {
    /// The bound provider failed.
    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),
}
