//! `ConversationMessage` and the `(item_id, session_id)` key it is filed
//! under (`spec.md` §3, §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role a message plays in the conversation, per `spec.md` §3's
/// `ConversationMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };
        write!(f, "{label}")
    }
}

/// Identifies one conversation: a kanban item paired with a session,
/// matching `spec.md` §6's "ordered table keyed by (item_id, session_id)".
/// `item_id` is opaque to the core — the task store that owns items is
/// explicitly out of scope (`spec.md` §1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub item_id: String,
    pub session_id: String,
}

impl ConversationKey {
    pub fn new(item_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// One row of a conversation. Append-only from the agent's perspective;
/// removed only by a session purge or by compaction replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: u64,
    pub item_id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub approximate_token_count: u32,
    pub created_at: DateTime<Utc>,
}
