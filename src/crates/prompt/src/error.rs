//! Error types for prompt rendering.

use thiserror::Error;

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, PromptError>;

/// Errors raised while loading, saving or rendering a template.
#[derive(Debug, Error)]
pub enum PromptError {
    /// A placeholder had no value and no default.
    #[error("Missing required variable: {name}")]
    MissingVariable {
        /// Placeholder name.
        name: String,
    },

    /// Reading or writing a template file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
