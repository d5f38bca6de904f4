//! Transcript entries.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Free-form per-message data, commonly holding a `"timestamp"`.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key read by pruning to order messages.
pub const TIMESTAMP_KEY: &str = "timestamp";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standing instruction, never pruned.
    System,
    /// Human turn.
    User,
    /// Model turn.
    Assistant,
}

impl Role {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Capitalised label used in rendered transcripts.
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored transcript entry.
///
/// `token_count` is measured once at insertion and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub token_count: usize,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, token_count: usize, metadata: Metadata) -> Self {
        Self {
            role,
            content: content.into(),
            token_count,
            metadata,
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }

    /// Parsed `"timestamp"` metadata.
    ///
    /// Accepts RFC 3339 strings, ISO 8601 strings without an offset (read as
    /// UTC) and numeric epoch seconds. Anything else is `None`, which sorts
    /// before every real timestamp.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self.metadata.get(TIMESTAMP_KEY)? {
            Value::String(s) => parse_timestamp_str(s),
            Value::Number(n) => {
                let secs = n.as_f64()?;
                if !secs.is_finite() {
                    return None;
                }
                let whole = secs.floor();
                let nanos = ((secs - whole) * 1e9) as u32;
                DateTime::from_timestamp(whole as i64, nanos)
            }
            _ => None,
        }
    }

    /// Role and content only.
    pub fn to_chat(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, NAIVE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, NAIVE_SPACE_FORMAT))
        .ok()
        .map(|naive| naive.and_utc())
}

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const NAIVE_SPACE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// The `{role, content}` pair handed to a chat-style backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Metadata holding only the current time as an RFC 3339 timestamp.
pub(crate) fn stamped_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert(
        TIMESTAMP_KEY.to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    metadata
}
