//! Prompt templates.
//!
//! A template is plain text with `{name}` placeholders and optional
//! `{%if name%} ... {%else%} ... {%endif%}` sections:
//!
//! ```rust,ignore
//! use prompt::{PromptTemplate, Variables};
//! use serde_json::json;
//!
//! let template = PromptTemplate::new(
//!     "You are {persona}.{%if task%} Your task: {task}.{%endif%}",
//! )
//! .with_defaults(Variables::from([("persona".to_string(), json!("a helpful assistant"))]));
//!
//! let text = template.format(&Variables::from([("task".to_string(), json!("summarize"))]))?;
//! assert_eq!(text, "You are a helpful assistant. Your task: summarize.");
//! ```

pub mod error;
pub mod template;

pub use error::{PromptError, Result};
pub use template::{is_truthy, PromptTemplate, Variables};
