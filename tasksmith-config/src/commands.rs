//! Source lists consumed by the command-policy gate.
//!
//! This crate only holds the raw pattern lists; compiling them into a
//! prefix/regex matcher with the Forbidden > Prompt > Allow precedence
//! from `spec.md` §3/§4.2 is `tasksmith-core::policy::command_policy`'s job.

use serde::{Deserialize, Serialize};

/// A single rule in the command-policy engine: `(prefix, decision,
/// rationale)` per `spec.md` §3's `PolicyRule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandDecision {
    Allow,
    Prompt,
    Forbidden,
}

/// Raw allow/deny/prompt pattern lists, as read from config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    pub allow_list: Vec<String>,
    pub prompt_list: Vec<String>,
    pub deny_list: Vec<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            allow_list: default_observe_allowlist(),
            prompt_list: Vec::new(),
            deny_list: default_forbidden_list(),
        }
    }
}

/// Hardcoded read-only allowlist for Observe-mode shell access
/// (`spec.md` §4.2: "the Allow list is the only permitted path and is
/// hardcoded to read-only operations").
pub fn default_observe_allowlist() -> Vec<String> {
    vec![
        "ls".into(),
        "cat".into(),
        "df".into(),
        "ps".into(),
        "uname".into(),
        "systemctl status".into(),
        "journalctl".into(),
        "ip addr".into(),
        "ss".into(),
        "grep".into(),
        "find".into(),
    ]
}

/// Patterns that are always Forbidden regardless of autonomy level.
pub fn default_forbidden_list() -> Vec<String> {
    vec![
        "rm -rf /".into(),
        "mkfs".into(),
        "shutdown".into(),
        "reboot".into(),
        "dd of=/dev/".into(),
        "chmod -R 777 /".into(),
    ]
}
