//! Token counting shared by the providers.
//!
//! A model-specific BPE tokenizer is used where one can be loaded. Everything
//! else falls back to counting whitespace-separated words, which is logged
//! once as a degraded mode.

use std::fmt;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Token counter bound to one backend/model.
#[derive(Clone)]
pub enum TokenCounter {
    /// Exact counts from a BPE tokenizer.
    Bpe(Arc<CoreBPE>),
    /// Whitespace-word approximation.
    WordHeuristic,
}

impl TokenCounter {
    /// Load the BPE tokenizer for an OpenAI-family model, falling back to the
    /// word heuristic if the model is not recognised.
    pub fn for_openai_model(model: &str) -> Self {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => TokenCounter::Bpe(Arc::new(bpe)),
            Err(e) => {
                warn!(
                    model,
                    error = %e,
                    "no tokenizer for model; counting tokens by whitespace words"
                );
                TokenCounter::WordHeuristic
            }
        }
    }

    /// Word heuristic for backends that ship no local tokenizer.
    pub fn heuristic(backend: &str, model: &str) -> Self {
        warn!(
            backend,
            model, "no local tokenizer available; counting tokens by whitespace words"
        );
        TokenCounter::WordHeuristic
    }

    /// Count tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        match self {
            TokenCounter::Bpe(bpe) => bpe.encode_with_special_tokens(text).len(),
            TokenCounter::WordHeuristic => count_words(text),
        }
    }
}

impl fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenCounter::Bpe(_) => f.write_str("TokenCounter::Bpe"),
            TokenCounter::WordHeuristic => f.write_str("TokenCounter::WordHeuristic"),
        }
    }
}

/// Whitespace-separated word count.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
