//! Context Manager for LLM conversation history
//!
//! Keeps one conversation's transcript within a token budget, pruning the
//! oldest non-system messages after every insertion.

use crate::error::Result;
use crate::message::{stamped_metadata, ChatMessage, Message, Metadata, Role};
use crate::usage::ContextUsage;
use llm::{GenerateOptions, LlmProvider};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Temperature used by [`ContextManager::summarize_history`].
pub const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Summary length when the caller does not set one.
pub const DEFAULT_SUMMARY_TOKENS: usize = 200;

/// Owns a conversation transcript and keeps it inside
/// `max_tokens - reserve_tokens`.
///
/// Token counts are taken from the bound provider when a message is added and
/// cached on the message. Swapping the provider does not recount them.
pub struct ContextManager {
    provider: Arc<dyn LlmProvider>,
    max_tokens: usize,
    reserve_tokens: usize,
    messages: Vec<Message>,
}

impl ContextManager {
    /// Create an empty transcript.
    pub fn new(provider: Arc<dyn LlmProvider>, max_tokens: usize, reserve_tokens: usize) -> Self {
        Self {
            provider,
            max_tokens,
            reserve_tokens,
            messages: Vec::new(),
        }
    }

    /// Tokens the transcript may hold.
    pub fn budget(&self) -> usize {
        self.max_tokens.saturating_sub(self.reserve_tokens)
    }

    /// Append a message and prune.
    ///
    /// With no `metadata` the message is stamped with the current time;
    /// caller metadata is stored as given.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>, metadata: Option<Metadata>) {
        let content = content.into();
        let token_count = self.provider.count_tokens(&content);
        let metadata = metadata.unwrap_or_else(stamped_metadata);

        debug!(%role, token_count, "adding message to context");
        self.messages
            .push(Message::new(role, content, token_count, metadata));
        self.prune();
    }

    /// Messages in conversational order as `{role, content}` pairs.
    pub fn get_context(&self, include_system: bool) -> Vec<ChatMessage> {
        self.messages
            .iter()
            .filter(|m| include_system || !m.is_system())
            .map(Message::to_chat)
            .collect()
    }

    /// The transcript as `"<Role>: <content>"` blocks separated by blank lines.
    pub fn get_context_string(&self, include_system: bool) -> String {
        self.messages
            .iter()
            .filter(|m| include_system || !m.is_system())
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n\n")
            .trim()
            .to_string()
    }

    /// Sum of the cached token counts.
    pub fn get_token_count(&self) -> usize {
        self.messages.iter().map(|m| m.token_count).sum()
    }

    /// Tokens left before the reserve, never negative.
    pub fn get_available_tokens(&self) -> usize {
        self.max_tokens
            .saturating_sub(self.get_token_count())
            .saturating_sub(self.reserve_tokens)
    }

    /// Drop every message, or every non-system message if `keep_system`.
    pub fn clear(&mut self, keep_system: bool) {
        if keep_system {
            self.messages.retain(Message::is_system);
        } else {
            self.messages.clear();
        }
        debug!(remaining = self.messages.len(), "context cleared");
    }

    /// Ask the provider for a summary of the non-system transcript.
    ///
    /// Returns `""` without calling the provider when there are fewer than two
    /// messages or nothing but system messages.
    ///
    /// # Errors
    ///
    /// Provider failures are returned unchanged.
    pub async fn summarize_history(&self, max_tokens: Option<usize>) -> Result<String> {
        let conversation: Vec<&Message> = self.messages.iter().filter(|m| !m.is_system()).collect();
        if self.messages.len() < 2 || conversation.is_empty() {
            return Ok(String::new());
        }

        let transcript = conversation
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Please provide a concise summary of the following conversation, \
             preserving the key points, decisions and any open questions:\n\n\
             {}\n\nSummary:",
            transcript
        );

        let options = GenerateOptions::new()
            .with_temperature(SUMMARY_TEMPERATURE)
            .with_max_tokens(max_tokens.unwrap_or(DEFAULT_SUMMARY_TOKENS));

        debug!(messages = conversation.len(), "summarizing context");
        let response = self.provider.generate(&prompt, options).await?;
        Ok(response.text.trim().to_string())
    }

    /// Stored messages in conversational order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn reserve_tokens(&self) -> usize {
        self.reserve_tokens
    }

    /// Provider used for counting and summaries.
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Bind a different provider. Existing token counts are kept as they are.
    pub fn set_provider(&mut self, provider: Arc<dyn LlmProvider>) {
        debug!(from = self.provider.name(), to = provider.name(), "switching context provider");
        self.provider = provider;
    }

    /// Snapshot of budget usage.
    pub fn usage(&self) -> ContextUsage {
        ContextUsage::new(self.get_token_count(), self.max_tokens, self.reserve_tokens)
    }

    fn prune(&mut self) {
        let budget = self.budget();
        let total = self.get_token_count();
        if total <= budget {
            return;
        }

        let to_remove = total - budget;
        let removable: usize = self
            .messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| m.token_count)
            .sum();
        let emergency = to_remove > removable;
        if emergency {
            warn!(
                total,
                budget,
                removable,
                "system messages alone exceed the budget, dropping all other messages"
            );
        }

        // Oldest first; missing timestamps sort first and ties keep insertion order.
        let mut order: Vec<usize> = (0..self.messages.len())
            .filter(|&i| !self.messages[i].is_system())
            .collect();
        order.sort_by_key(|&i| self.messages[i].timestamp());

        let mut dropped = vec![false; self.messages.len()];
        let mut freed = 0;
        for i in order {
            if freed >= to_remove {
                break;
            }
            dropped[i] = true;
            freed += self.messages[i].token_count;
        }

        let mut index = 0;
        self.messages.retain(|_| {
            let keep = !dropped[index];
            index += 1;
            keep
        });

        info!(
            removed = dropped.iter().filter(|d| **d).count(),
            freed,
            total = self.get_token_count(),
            budget,
            emergency,
            "pruned context"
        );
    }
}

impl std::fmt::Debug for ContextManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextManager")
            .field("provider", &self.provider.name())
            .field("max_tokens", &self.max_tokens)
            .field("reserve_tokens", &self.reserve_tokens)
            .field("messages", &self.messages.len())
            .finish()
    }
}
