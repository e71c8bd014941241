//! Token estimation and the deterministic, non-LLM compaction strategy
//! (`spec.md` §4.7). Explicitly not LLM-based: "the design does not
//! attempt to tokenise exactly" and "it does not perform LLM-based
//! summarisation for compaction" (`spec.md` §1).

use super::message::{ConversationKey, ConversationMessage};
use super::store::ConversationStore;

const COMPACTION_TRIGGER_FRACTION: f64 = 0.75;
const SNIPPET_MAX_CHARS: usize = 60;

/// `estimate_tokens(text) ≈ ceil(len_chars(text) / 4)` (`spec.md` §4.7).
pub fn estimate_tokens(text: &str) -> u32 {
    (text.chars().count() as u32).div_ceil(4)
}

/// Outcome of a compaction check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// History was already under the threshold; nothing changed.
    NotNeeded,
    /// `n` of the oldest messages were replaced by one summary message.
    Compacted { messages_replaced: usize },
}

/// Run compaction if `estimated_tokens(system_prompt) + Σ
/// estimated_tokens(history) > 0.75 × context_window`. A single pass
/// collapses the oldest messages (bounded by the checkpoint boundary) into
/// one synthetic `system`-role summary sized so the result fits, when that
/// is achievable; if even summarising everything up to the boundary cannot
/// bring the total under threshold, the largest reduction available is
/// still applied rather than looping indefinitely toward an unreachable
/// target (`spec.md` §4.7: "compaction never crosses a checkpoint
/// boundary").
pub fn compact_if_needed(
    store: &dyn ConversationStore,
    key: &ConversationKey,
    system_prompt: &str,
    context_window: u32,
) -> CompactionOutcome {
    let threshold = (context_window as f64 * COMPACTION_TRIGGER_FRACTION) as u32;
    let system_tokens = estimate_tokens(system_prompt);

    let history = store.history(key);
    let history_tokens: u32 = history.iter().map(|m| m.approximate_token_count).sum();
    if system_tokens + history_tokens <= threshold || history.is_empty() {
        return CompactionOutcome::NotNeeded;
    }

    let boundary = store.checkpoint_boundary(key);
    if boundary == 0 {
        return CompactionOutcome::NotNeeded;
    }

    let replace_count = oldest_count_to_replace(&history, boundary, system_tokens, threshold);
    if replace_count == 0 {
        return CompactionOutcome::NotNeeded;
    }

    let summary = summarise(&history[..replace_count]);
    match store.replace_oldest(key, replace_count, &summary) {
        Ok((_, removed)) if removed > 0 => CompactionOutcome::Compacted {
            messages_replaced: removed,
        },
        _ => CompactionOutcome::NotNeeded,
    }
}

/// Choose the smallest prefix length N (capped by `boundary`) such that the
/// remaining suffix plus one replacement message would fit under
/// `threshold`, growing N one message at a time starting from one.
fn oldest_count_to_replace(
    history: &[ConversationMessage],
    boundary: usize,
    system_tokens: u32,
    threshold: u32,
) -> usize {
    let max_n = boundary.min(history.len());
    for n in 1..=max_n {
        let remaining_tokens: u32 = history[n..].iter().map(|m| m.approximate_token_count).sum();
        // A replacement summary's token cost scales with how much it
        // summarises but is bounded by its fixed-format snippet budget;
        // approximate it as a small constant so the search terminates.
        let replacement_tokens = estimate_tokens(&summarise(&history[..n]));
        if system_tokens + remaining_tokens + replacement_tokens <= threshold {
            return n;
        }
    }
    max_n
}

/// Deterministic, fixed-format summary: one line per message with a
/// truncated content snippet (`spec.md` §4.7's literal example format).
fn summarise(messages: &[ConversationMessage]) -> String {
    let mut lines = Vec::with_capacity(messages.len() + 1);
    lines.push(format!("[summary of {} earlier turns]", messages.len()));
    for message in messages {
        let snippet = truncate(&message.content, SNIPPET_MAX_CHARS);
        lines.push(format!("{}: {}", message.role, snippet));
    }
    lines.join("\n")
}

fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let truncated: String = collapsed.chars().take(max_chars).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::message::MessageRole;
    use crate::conversation::store::InMemoryConversationStore;

    #[test]
    fn estimate_tokens_matches_ceil_div_four() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(100)), 25);
    }

    #[test]
    fn compaction_not_needed_under_threshold() {
        let store = InMemoryConversationStore::new();
        let key = ConversationKey::new("item", "session");
        store.append(&key, MessageRole::User, "short").unwrap();
        let outcome = compact_if_needed(&store, &key, "system prompt", 100_000);
        assert_eq!(outcome, CompactionOutcome::NotNeeded);
    }

    #[test]
    fn compaction_collapses_oldest_messages_and_stays_under_threshold() {
        let store = InMemoryConversationStore::new();
        let key = ConversationKey::new("item", "session");
        for i in 0..40 {
            store
                .append(&key, MessageRole::User, &format!("turn number {i} with some padding text"))
                .unwrap();
        }
        let outcome = compact_if_needed(&store, &key, "system", 200);
        match outcome {
            CompactionOutcome::Compacted { messages_replaced } => assert!(messages_replaced > 0),
            CompactionOutcome::NotNeeded => panic!("expected compaction to run"),
        }

        let history = store.history(&key);
        let system_tokens = estimate_tokens("system");
        let history_tokens: u32 = history.iter().map(|m| m.approximate_token_count).sum();
        assert!(system_tokens + history_tokens <= (200.0 * COMPACTION_TRIGGER_FRACTION) as u32);
    }

    #[test]
    fn compaction_respects_checkpoint_boundary() {
        let store = InMemoryConversationStore::new();
        let key = ConversationKey::new("item", "session");
        for i in 0..5 {
            store
                .append(&key, MessageRole::User, &format!("turn {i}"))
                .unwrap();
        }
        store.checkpoint(&key, "cp").unwrap();
        for i in 5..10 {
            store
                .append(&key, MessageRole::User, &format!("turn {i}"))
                .unwrap();
        }
        let _ = compact_if_needed(&store, &key, "system", 1);
        let boundary = store.checkpoint_boundary(&key);
        assert_eq!(boundary, 5);
    }
}
