//! `EchoProvider`: a deterministic reference implementation used by tests
//! and the CLI smoke harness when no real backend is configured
//! (`spec.md` §6's "opaque contract over a native inference backend" still
//! needs *something* behind it for the loop to exercise end to end).

use async_trait::async_trait;

use crate::error::AgentError;

use super::generation::{CancelToken, GenerationOutcome, InferenceProvider, StreamEvent};

/// Echoes a fixed continuation back, optionally driving the streaming
/// callback one chunk at a time. Never fails, never retries — it exists to
/// make the tool-use loop and pipeline testable without a model.
pub struct EchoProvider {
    continuation: String,
    context_window: u32,
    eos_strings: Vec<String>,
}

impl EchoProvider {
    pub fn new(continuation: impl Into<String>, context_window: u32) -> Self {
        Self {
            continuation: continuation.into(),
            context_window,
            eos_strings: vec!["<|end|>".to_string(), "END_OF_TURN".to_string()],
        }
    }
}

impl Default for EchoProvider {
    fn default() -> Self {
        Self::new("Understood.", 8192)
    }
}

#[async_trait]
impl InferenceProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn context_window(&self) -> u32 {
        self.context_window
    }

    fn eos_strings(&self) -> &[String] {
        &self.eos_strings
    }

    async fn generate(
        &self,
        _prompt: &str,
        _history: Option<&str>,
        out_buffer: &mut String,
        stream_cb: Option<&mut (dyn for<'a> FnMut(&'a str) -> StreamEvent + Send)>,
        cancel: &CancelToken,
    ) -> Result<GenerationOutcome, AgentError> {
        if let Some(cb) = stream_cb {
            for word in self.continuation.split_inclusive(' ') {
                if cancel.is_cancelled() || cb(word) == StreamEvent::Cancel {
                    return Ok(GenerationOutcome::Cancelled);
                }
                out_buffer.push_str(word);
            }
        } else {
            out_buffer.push_str(&self.continuation);
        }
        Ok(GenerationOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generate_writes_the_canned_continuation() {
        let provider = EchoProvider::new("hello world", 4096);
        let mut buffer = String::new();
        let cancel = CancelToken::new();
        let outcome = provider
            .generate("ignored prompt", None, &mut buffer, None, &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, GenerationOutcome::Completed);
        assert_eq!(buffer, "hello world");
    }

    #[tokio::test]
    async fn streaming_callback_can_cancel_mid_generation() {
        let provider = EchoProvider::new("one two three four", 4096);
        let mut buffer = String::new();
        let cancel = CancelToken::new();
        let mut seen = 0;
        let mut cb = |_chunk: &str| {
            seen += 1;
            if seen >= 2 {
                StreamEvent::Cancel
            } else {
                StreamEvent::Continue
            }
        };
        let outcome = provider
            .generate("prompt", None, &mut buffer, Some(&mut cb), &cancel)
            .await
            .unwrap();
        assert_eq!(outcome, GenerationOutcome::Cancelled);
        assert!(buffer.len() < "one two three four".len());
    }
}
