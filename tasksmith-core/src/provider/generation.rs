//! The provider trait itself, its cancellation primitive, and the retry
//! wrapper around transient failures (`spec.md` §4.6, §6: "a pure
//! pointer-and-scalar ABI").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AgentError;

/// Cooperative cancellation handle threaded from the caller into the
/// streaming callback (`spec.md` §5: "a cancel token is threaded from the
/// UI to the stream callback").
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// What a streaming callback asks the generator to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Continue,
    Cancel,
}

/// Result of one `generate` call: whether it ran to completion or stopped
/// early on cancellation (`spec.md` §4.6: "returns ok=false" on
/// cancellation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed,
    Cancelled,
}

impl GenerationOutcome {
    pub fn ok(self) -> bool {
        matches!(self, GenerationOutcome::Completed)
    }
}

/// Opaque contract over a native local inference backend. Implementers
/// wrap whatever FFI or subprocess boundary the backend requires; this
/// trait itself only describes the ABI spec.md §6 calls for.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Context window in tokens, used by the prompt assembler's adaptive
    /// sizing (§4.5) and by compaction's 0.75× trigger (§4.7).
    fn context_window(&self) -> u32;

    /// Literal end-of-turn strings scanned in the already-produced text, a
    /// safety net alongside the model's native EOS id (`spec.md` §4.6).
    fn eos_strings(&self) -> &[String];

    /// Generate a continuation of `prompt` (with optional `history`
    /// rendered ahead of it by the caller), appending produced text to
    /// `out_buffer`. If `stream_cb` is supplied, each produced piece is
    /// delivered synchronously before the call returns; the callback's
    /// [`StreamEvent::Cancel`] return stops generation at the next token
    /// boundary, as does `cancel.is_cancelled()`. Must never emit more
    /// than `context_window - prompt_tokens` tokens.
    async fn generate(
        &self,
        prompt: &str,
        history: Option<&str>,
        out_buffer: &mut String,
        stream_cb: Option<&mut (dyn for<'a> FnMut(&'a str) -> StreamEvent + Send)>,
        cancel: &CancelToken,
    ) -> Result<GenerationOutcome, AgentError>;
}

/// Retry transient provider failures up to `max_retries` times with
/// `retry_delay` between attempts (`spec.md` §4.6).
pub async fn generate_with_retry(
    provider: &dyn InferenceProvider,
    prompt: &str,
    history: Option<&str>,
    out_buffer: &mut String,
    mut stream_cb: Option<&mut (dyn for<'a> FnMut(&'a str) -> StreamEvent + Send)>,
    cancel: &CancelToken,
    max_retries: u32,
    retry_delay: Duration,
) -> Result<GenerationOutcome, AgentError> {
    let mut attempt = 0;
    loop {
        out_buffer.clear();
        let result = match &mut stream_cb {
            Some(cb) => provider.generate(prompt, history, out_buffer, Some(&mut **cb), cancel).await,
            None => provider.generate(prompt, history, out_buffer, None, cancel).await,
        };
        match result {
            Ok(outcome) => return Ok(outcome),
            Err(AgentError::ProviderTransient(reason)) if attempt < max_retries => {
                attempt += 1;
                tracing::warn!(attempt, %reason, "provider generation failed transiently; retrying");
                tokio::time::sleep(retry_delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_reflects_cancellation() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cloned_cancel_token_shares_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
