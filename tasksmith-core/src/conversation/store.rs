//! `ConversationStore` trait and its in-process reference implementation.
//!
//! `spec.md` §5: "the conversation store serialises writes through its own
//! connection-level lock" — here that is a single `std::sync::Mutex`
//! guarding a `HashMap` keyed by [`ConversationKey`], matching the
//! teacher's pattern of a coarse lock around an in-memory session table
//! rather than a per-row lock.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

use super::compaction::estimate_tokens;
use super::message::{ConversationKey, ConversationMessage, MessageRole};

/// Named, serialised snapshot of a conversation's message sequence
/// (`spec.md` §3's `Checkpoint`, §6: "unspecified-but-stable textual
/// encoding; round-trip must be exact"). The encoding chosen here is
/// `serde_json`, recorded as an Open Question decision in the grounding
/// ledger.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub id: u64,
    pub item_id: String,
    pub name: String,
    pub serialised_state: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct CheckpointBlob {
    messages: Vec<ConversationMessage>,
}

/// Storage contract for conversation messages and checkpoints. Histories
/// returned to callers are by-value copies (`spec.md` §3: "histories
/// returned to callers are by-value copies").
pub trait ConversationStore: Send + Sync {
    fn append(
        &self,
        key: &ConversationKey,
        role: MessageRole,
        content: &str,
    ) -> Result<ConversationMessage, AgentError>;

    fn history(&self, key: &ConversationKey) -> Vec<ConversationMessage>;

    /// Replace the oldest `messages_to_replace` messages in-place with a
    /// single synthetic message, in one transaction (`spec.md` §4.7). The
    /// replacement message is returned alongside the count actually
    /// removed (it may be less than requested if a checkpoint boundary
    /// was reached first).
    fn replace_oldest(
        &self,
        key: &ConversationKey,
        messages_to_replace: usize,
        replacement_content: &str,
    ) -> Result<(ConversationMessage, usize), AgentError>;

    fn checkpoint(&self, key: &ConversationKey, name: &str) -> Result<Checkpoint, AgentError>;

    fn restore_checkpoint(&self, key: &ConversationKey, checkpoint: &Checkpoint) -> Result<(), AgentError>;

    /// Index, within `history(key)`, of the oldest message still covered
    /// by a stored checkpoint. Compaction must never replace a message at
    /// or past this boundary (`spec.md` §4.7: "never crosses a checkpoint
    /// boundary").
    fn checkpoint_boundary(&self, key: &ConversationKey) -> usize;
}

struct Conversation {
    messages: Vec<ConversationMessage>,
    checkpoints: Vec<Checkpoint>,
    next_message_id: u64,
    next_checkpoint_id: u64,
}

impl Conversation {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            checkpoints: Vec::new(),
            next_message_id: 0,
            next_checkpoint_id: 0,
        }
    }
}

/// Single-process reference store keyed by `(item_id, session_id)`.
pub struct InMemoryConversationStore {
    conversations: Mutex<HashMap<ConversationKey, Conversation>>,
}

impl Default for InMemoryConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self {
            conversations: Mutex::new(HashMap::new()),
        }
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn append(
        &self,
        key: &ConversationKey,
        role: MessageRole,
        content: &str,
    ) -> Result<ConversationMessage, AgentError> {
        let mut guard = self
            .conversations
            .lock()
            .map_err(|_| AgentError::Internal("conversation store lock poisoned".to_string()))?;
        let conversation = guard
            .entry(key.clone())
            .or_insert_with(Conversation::new);
        let message = ConversationMessage {
            id: conversation.next_message_id,
            item_id: key.item_id.clone(),
            session_id: key.session_id.clone(),
            role,
            content: content.to_string(),
            approximate_token_count: estimate_tokens(content),
            created_at: Utc::now(),
        };
        conversation.next_message_id += 1;
        conversation.messages.push(message.clone());
        Ok(message)
    }

    fn history(&self, key: &ConversationKey) -> Vec<ConversationMessage> {
        let guard = self.conversations.lock().expect("conversation store lock poisoned");
        guard
            .get(key)
            .map(|c| c.messages.clone())
            .unwrap_or_default()
    }

    fn replace_oldest(
        &self,
        key: &ConversationKey,
        messages_to_replace: usize,
        replacement_content: &str,
    ) -> Result<(ConversationMessage, usize), AgentError> {
        let mut guard = self
            .conversations
            .lock()
            .map_err(|_| AgentError::Internal("conversation store lock poisoned".to_string()))?;
        let conversation = guard
            .get_mut(key)
            .ok_or_else(|| AgentError::Internal("no conversation for key".to_string()))?;

        let boundary = checkpoint_boundary_of(conversation);
        let actual_replace_count = messages_to_replace.min(boundary).min(conversation.messages.len());

        let replacement = ConversationMessage {
            id: conversation.next_message_id,
            item_id: key.item_id.clone(),
            session_id: key.session_id.clone(),
            role: MessageRole::System,
            content: replacement_content.to_string(),
            approximate_token_count: estimate_tokens(replacement_content),
            created_at: Utc::now(),
        };
        conversation.next_message_id += 1;

        conversation.messages.drain(0..actual_replace_count);
        conversation.messages.insert(0, replacement.clone());

        Ok((replacement, actual_replace_count))
    }

    fn checkpoint(&self, key: &ConversationKey, name: &str) -> Result<Checkpoint, AgentError> {
        let mut guard = self
            .conversations
            .lock()
            .map_err(|_| AgentError::Internal("conversation store lock poisoned".to_string()))?;
        let conversation = guard
            .entry(key.clone())
            .or_insert_with(Conversation::new);

        let blob = CheckpointBlob {
            messages: conversation.messages.clone(),
        };
        let serialised_state = serde_json::to_string(&blob)
            .map_err(|err| AgentError::Internal(format!("checkpoint serialisation failed: {err}")))?;

        let checkpoint = Checkpoint {
            id: conversation.next_checkpoint_id,
            item_id: key.item_id.clone(),
            name: name.to_string(),
            serialised_state,
            created_at: Utc::now(),
        };
        conversation.next_checkpoint_id += 1;
        conversation.checkpoints.push(checkpoint.clone());
        Ok(checkpoint)
    }

    fn restore_checkpoint(&self, key: &ConversationKey, checkpoint: &Checkpoint) -> Result<(), AgentError> {
        let blob: CheckpointBlob = serde_json::from_str(&checkpoint.serialised_state)
            .map_err(|err| AgentError::Internal(format!("checkpoint deserialisation failed: {err}")))?;
        let mut guard = self
            .conversations
            .lock()
            .map_err(|_| AgentError::Internal("conversation store lock poisoned".to_string()))?;
        let conversation = guard
            .entry(key.clone())
            .or_insert_with(Conversation::new);
        conversation.messages = blob.messages;
        Ok(())
    }

    fn checkpoint_boundary(&self, key: &ConversationKey) -> usize {
        let guard = self.conversations.lock().expect("conversation store lock poisoned");
        guard
            .get(key)
            .map(checkpoint_boundary_of)
            .unwrap_or(usize::MAX)
    }
}

/// Every checkpoint snapshots a prefix length (the number of messages it
/// covered at capture time); the boundary compaction must respect is the
/// length of the longest such prefix still live in the current history.
fn checkpoint_boundary_of(conversation: &Conversation) -> usize {
    if conversation.checkpoints.is_empty() {
        return usize::MAX;
    }
    conversation
        .checkpoints
        .iter()
        .filter_map(|cp| serde_json::from_str::<CheckpointBlob>(&cp.serialised_state).ok())
        .map(|blob| blob.messages.len())
        .max()
        .unwrap_or(0)
        .min(conversation.messages.len())
}
