//! Conversation transcripts kept inside a token budget.
//!
//! A [`ContextManager`] owns the ordered messages of one conversation and the
//! provider used to count their tokens. Every insertion is followed by a
//! pruning pass that drops the oldest non-system messages until the
//! transcript fits in `max_tokens - reserve_tokens`. System messages are never
//! pruned.
//!
//! ```rust,ignore
//! use context::{ContextManager, Role};
//!
//! let mut ctx = ContextManager::new(provider.clone(), 4096, 512);
//! ctx.add_message(Role::System, "You are a concise assistant.", None);
//! ctx.add_message(Role::User, "What is a token budget?", None);
//!
//! let prompt = ctx.get_context_string(true);
//! let reply = provider.generate(&prompt, Default::default()).await?;
//! ctx.add_message(Role::Assistant, reply.text, None);
//! ```

pub mod error;
pub mod manager;
pub mod message;
pub mod usage;

pub use error::{ContextError, Result};
pub use manager::{ContextManager, DEFAULT_SUMMARY_TOKENS, SUMMARY_TEMPERATURE};
pub use message::{ChatMessage, Message, Metadata, Role};
pub use usage::{ContextUsage, WarningLevel};
