//! Named error kinds for the hot path, per `spec.md` §7: "Errors are named,
//! not stringly-typed."

use thiserror::Error;

/// Every way a tool invocation can fail to produce a value, surfaced to the
/// model as the tool's output unless noted otherwise.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AgentError {
    #[error("tool '{0}' is not permitted at the current autonomy level")]
    LevelForbidden(String),

    #[error("rate budget exhausted: {0}")]
    RateExhausted(RateScope),

    #[error("path intersects a sensitive prefix: {0}")]
    SensitivePath(String),

    #[error("write cooldown still active: {0}ms remaining")]
    WriteCooldown(u64),

    #[error("command matched a forbidden pattern: {0}")]
    CommandForbidden(String),

    #[error("user denied the command: {0}")]
    CommandDenied(String),

    #[error("path is outside the allowed roots: {0}")]
    PathOutsideAllowed(String),

    #[error("shell command exceeded its timeout")]
    ShellTimeout,

    #[error("inference backend is unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("generation failed transiently: {0}")]
    ProviderTransient(String),

    #[error("failed to persist audit record: {0}")]
    AuditWriteFailed(String),

    #[error("tool '{0}' is not registered")]
    UnknownTool(String),

    #[error("tool input exceeds the maximum size for '{0}'")]
    InputTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Which budget was exhausted, for [`AgentError::RateExhausted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateScope {
    Prompt,
    Session,
}

impl std::fmt::Display for RateScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateScope::Prompt => write!(f, "prompt"),
            RateScope::Session => write!(f, "session"),
        }
    }
}

impl AgentError {
    /// Fatal errors abort the current command entirely (`spec.md` §7:
    /// "Fatal only at the initialisation boundary"); everything else is
    /// recoverable and returned to the model as the tool's output.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AgentError::ProviderUnavailable(_))
    }
}
