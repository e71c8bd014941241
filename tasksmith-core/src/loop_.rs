//! The tool-use loop (`spec.md` §4.8): assemble, generate, parse a
//! `TOOL_CALL:` marker if present, execute, append, and re-prompt.

use std::time::Duration;

use crate::conversation::{compact_if_needed, ConversationKey, ConversationStore, MessageRole};
use crate::error::AgentError;
use crate::provider::{generate_with_retry, CancelToken, InferenceProvider};
use crate::tools::Executor;

const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

const TOOL_CALL_MARKER: &str = "TOOL_CALL:";
const END_TOOL_CALL_MARKER: &str = "END_TOOL_CALL";

/// Drives one user turn to completion: possibly several rounds of
/// generation and tool execution, ending either in a final textual answer
/// or a loop-guard short-circuit (`spec.md` §4.8 step 5).
pub async fn run_turn(
    provider: &dyn InferenceProvider,
    store: &dyn ConversationStore,
    executor: &Executor,
    key: &ConversationKey,
    system_prompt: &str,
    user_message: &str,
    session_id: &str,
    max_tool_iterations: u32,
) -> Result<String, AgentError> {
    store.append(key, MessageRole::User, user_message)?;

    let mut previous_call_signature: Option<String> = None;
    let mut last_tool_result = String::new();
    let mut calls_made: u32 = 0;

    loop {
        compact_if_needed(store, key, system_prompt, provider.context_window());
        let history = store.history(key);
        let history_text = render_history(&history);

        let prompt = if calls_made == 0 {
            format!("{system_prompt}\n\n{user_message}")
        } else {
            format!(
                "Tool output so far:\n{last_tool_result}\n\nOriginal question: {user_message}"
            )
        };

        let mut out_buffer = String::new();
        let cancel = CancelToken::new();
        generate_with_retry(
            provider,
            &prompt,
            Some(&history_text),
            &mut out_buffer,
            None,
            &cancel,
            DEFAULT_MAX_RETRIES,
            DEFAULT_RETRY_DELAY,
        )
        .await?;

        let Some((tool_name, tool_input)) = parse_tool_call(&out_buffer) else {
            store.append(key, MessageRole::Assistant, &out_buffer)?;
            return Ok(out_buffer);
        };

        store.append(key, MessageRole::Assistant, &out_buffer)?;

        // Loop guard: iteration cap (`spec.md` §4.8 step 5).
        if calls_made >= max_tool_iterations {
            return Ok(last_tool_result);
        }

        // Loop guard: byte-identical repeat of the previous call.
        let signature = format!("{tool_name}\n{tool_input}");
        if previous_call_signature.as_deref() == Some(signature.as_str()) {
            return Ok(last_tool_result);
        }
        previous_call_signature = Some(signature);

        let result = executor.execute(&tool_name, &tool_input, session_id).await;
        let (framed, for_followup) = match &result {
            Ok(output) => (format!("[Tool {tool_name} result]\n{output}"), output.clone()),
            Err(err) => (format!("[Tool {tool_name} error]\n{err}"), err.to_string()),
        };
        store.append(key, MessageRole::User, &framed)?;
        last_tool_result = for_followup;
        calls_made += 1;
    }
}

/// Parse the line after `TOOL_CALL:` as the tool name (trimmed), and
/// everything up to `END_TOOL_CALL` as the input. A missing
/// `END_TOOL_CALL` is tolerated by taking input to end of text
/// (`spec.md` §4.8 step 4).
fn parse_tool_call(text: &str) -> Option<(String, String)> {
    let marker_at = text.find(TOOL_CALL_MARKER)?;
    let mut lines = text[marker_at + TOOL_CALL_MARKER.len()..].lines();
    let tool_name = lines.next()?.trim().to_string();
    if tool_name.is_empty() {
        return None;
    }
    let remaining: Vec<&str> = lines.collect();
    let input_lines = match remaining.iter().position(|line| line.trim() == END_TOOL_CALL_MARKER) {
        Some(end_index) => &remaining[..end_index],
        None => &remaining[..],
    };
    Some((tool_name, input_lines.join("\n")))
}

fn render_history(history: &[crate::conversation::ConversationMessage]) -> String {
    history
        .iter()
        .map(|message| format!("{}: {}", message.role, message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditJournal;
    use crate::conversation::InMemoryConversationStore;
    use crate::provider::EchoProvider;
    use crate::tools::{ExecutionContext, ToolDescriptor, ToolHandler, ToolKind};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tasksmith_config::autonomy::AutonomyHandle;
    use tasksmith_config::{AutonomyConfig, AutonomyLevel, CommandsConfig, Limits};
    use tempfile::tempdir;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
            Ok(format!("ran: {input}"))
        }
    }

    async fn executor() -> (Executor, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let journal = AuditJournal::spawn(dir.path().join("audit.log"), 2 * 1024 * 1024, 3);
        let autonomy = AutonomyHandle::new(AutonomyConfig::new(AutonomyLevel::Workspace));
        let executor = Executor::new(autonomy, CommandsConfig::default(), Limits::default(), journal);
        executor
            .register(ToolDescriptor::new(
                "echo_tool",
                "echoes",
                ToolKind::Read,
                false,
                1024,
                Arc::new(EchoTool),
            ))
            .await
            .unwrap();
        (executor, dir)
    }

    #[tokio::test]
    async fn plain_answer_without_tool_call_returns_immediately() {
        let provider = EchoProvider::new("just an answer, no markers here", 8192);
        let store = InMemoryConversationStore::new();
        let (exec, _dir) = executor().await;
        let key = ConversationKey::new("item", "session");

        let answer = run_turn(&provider, &store, &exec, &key, "system", "hi", "session", 5)
            .await
            .unwrap();
        assert_eq!(answer, "just an answer, no markers here");
        assert_eq!(store.history(&key).len(), 2);
    }

    #[tokio::test]
    async fn tool_call_is_parsed_and_executed() {
        let provider = EchoProvider::new(
            "TOOL_CALL: echo_tool\nhello\nEND_TOOL_CALL",
            8192,
        );
        let store = InMemoryConversationStore::new();
        let (exec, _dir) = executor().await;
        let key = ConversationKey::new("item", "session");

        let answer = run_turn(&provider, &store, &exec, &key, "system", "do it", "session", 5)
            .await
            .unwrap();
        assert_eq!(answer, "ran: hello");

        let history = store.history(&key);
        assert!(history.iter().any(|m| m.content.contains("[Tool echo_tool result]")));
    }

    #[test]
    fn parse_tool_call_handles_missing_end_marker() {
        let (name, input) = parse_tool_call("TOOL_CALL: shell\nls -la").unwrap();
        assert_eq!(name, "shell");
        assert_eq!(input, "ls -la");
    }

    #[test]
    fn parse_tool_call_returns_none_without_marker() {
        assert!(parse_tool_call("just plain text").is_none());
    }

    #[tokio::test]
    async fn repeat_call_breaks_the_loop() {
        let provider = EchoProvider::new(
            "TOOL_CALL: echo_tool\nsame\nEND_TOOL_CALL",
            8192,
        );
        let store = InMemoryConversationStore::new();
        let (exec, _dir) = executor().await;
        let key = ConversationKey::new("item", "session");

        let answer = run_turn(&provider, &store, &exec, &key, "system", "loop me", "session", 5)
            .await
            .unwrap();
        assert_eq!(answer, "ran: same");
    }
}
