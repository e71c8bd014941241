//! Command-policy gate: a prefix-match rule engine over three ordered
//! lists (`spec.md` §3's `PolicyRule`, §4.2's "Command-policy").
//!
//! The input command's first whitespace-separated token, plus the longest
//! matching contiguous prefix of later tokens, is tried against Forbidden,
//! then Prompt, then Allow; first hit wins, and Forbidden beats Prompt
//! beats Allow when prefixes tie in length.

use tasksmith_config::{CommandDecision, CommandsConfig};

/// The resolved decision for one command, plus the rationale surfaced to
/// the user (`spec.md` §4.2: "A decision carries a rationale string").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVerdict {
    pub decision: CommandDecision,
    pub rationale: String,
    pub matched_prefix: Option<String>,
}

/// Compiled view of a [`CommandsConfig`] used by the executor's command-
/// policy gate.
#[derive(Debug, Clone)]
pub struct CommandPolicyEngine {
    allow_prefixes: Vec<String>,
    prompt_prefixes: Vec<String>,
    deny_prefixes: Vec<String>,
}

impl CommandPolicyEngine {
    pub fn from_config(config: &CommandsConfig) -> Self {
        Self {
            allow_prefixes: normalized(&config.allow_list),
            prompt_prefixes: normalized(&config.prompt_list),
            deny_prefixes: normalized(&config.deny_list),
        }
    }

    /// Evaluate `command_text` against the three lists. At Observe, callers
    /// must additionally ensure only the hardcoded read-only allowlist is
    /// consulted (`spec.md` §4.2); this engine itself is level-agnostic and
    /// is constructed fresh with the appropriate `CommandsConfig` per call
    /// site.
    pub fn evaluate(&self, command_text: &str) -> PolicyVerdict {
        let cmd = command_text.trim();
        if cmd.is_empty() {
            return PolicyVerdict {
                decision: CommandDecision::Forbidden,
                rationale: "empty command".to_string(),
                matched_prefix: None,
            };
        }

        let deny_match = longest_matching_prefix(cmd, &self.deny_prefixes);
        let prompt_match = longest_matching_prefix(cmd, &self.prompt_prefixes);
        let allow_match = longest_matching_prefix(cmd, &self.allow_prefixes);

        // Forbidden beats Prompt beats Allow when prefix lengths tie;
        // pick whichever candidate list has the longest match, breaking
        // ties in that priority order.
        let candidates = [
            (CommandDecision::Forbidden, deny_match),
            (CommandDecision::Prompt, prompt_match),
            (CommandDecision::Allow, allow_match),
        ];

        let best = candidates
            .into_iter()
            .filter_map(|(decision, matched)| matched.map(|m| (decision, m)))
            .max_by_key(|(decision, matched)| {
                // Primary key: prefix length (longest wins). Secondary key:
                // decision priority (Forbidden > Prompt > Allow) so ties
                // resolve toward the stricter decision.
                let priority = match decision {
                    CommandDecision::Forbidden => 2,
                    CommandDecision::Prompt => 1,
                    CommandDecision::Allow => 0,
                };
                (matched.len(), priority)
            });

        match best {
            Some((decision, matched)) => PolicyVerdict {
                rationale: format!("matched {:?} prefix '{matched}'", decision),
                decision,
                matched_prefix: Some(matched),
            },
            None => PolicyVerdict {
                decision: CommandDecision::Forbidden,
                rationale: "no allow rule matched and no rules permit unmatched commands"
                    .to_string(),
                matched_prefix: None,
            },
        }
    }
}

fn normalized(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Among `prefixes`, return the longest one that is a prefix of `cmd` at a
/// token boundary (i.e. `cmd == prefix` or `cmd` starts with `prefix` and
/// the next character is whitespace).
fn longest_matching_prefix(cmd: &str, prefixes: &[String]) -> Option<String> {
    prefixes
        .iter()
        .filter(|prefix| matches_at_token_boundary(cmd, prefix))
        .max_by_key(|prefix| prefix.len())
        .cloned()
}

fn matches_at_token_boundary(cmd: &str, prefix: &str) -> bool {
    if !cmd.starts_with(prefix) {
        return false;
    }
    match cmd.as_bytes().get(prefix.len()) {
        None => true,
        Some(b) => b.is_ascii_whitespace(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(allow: &[&str], prompt: &[&str], deny: &[&str]) -> CommandsConfig {
        CommandsConfig {
            allow_list: allow.iter().map(|s| s.to_string()).collect(),
            prompt_list: prompt.iter().map(|s| s.to_string()).collect(),
            deny_list: deny.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn forbidden_beats_allow_on_exact_tie() {
        let engine = CommandPolicyEngine::from_config(&config(&["rm"], &[], &["rm"]));
        let verdict = engine.evaluate("rm file.txt");
        assert_eq!(verdict.decision, CommandDecision::Forbidden);
    }

    #[test]
    fn longest_prefix_wins_over_shorter_opposite_decision() {
        let engine = CommandPolicyEngine::from_config(&config(&["git push --dry-run"], &[], &["git push"]));
        let verdict = engine.evaluate("git push --dry-run origin main");
        assert_eq!(verdict.decision, CommandDecision::Allow);
    }

    #[test]
    fn unmatched_command_is_forbidden_by_default() {
        let engine = CommandPolicyEngine::from_config(&config(&["ls"], &[], &[]));
        let verdict = engine.evaluate("curl http://example.com");
        assert_eq!(verdict.decision, CommandDecision::Forbidden);
    }

    #[test]
    fn hardcoded_forbidden_patterns_are_blocked() {
        let engine = CommandPolicyEngine::from_config(&CommandsConfig::default());
        assert_eq!(
            engine.evaluate("rm -rf / --no-preserve-root").decision,
            CommandDecision::Forbidden
        );
        assert_eq!(engine.evaluate("shutdown now").decision, CommandDecision::Forbidden);
    }

    #[test]
    fn observe_allowlist_permits_read_only_commands() {
        let engine = CommandPolicyEngine::from_config(&CommandsConfig::default());
        assert_eq!(engine.evaluate("ls -la").decision, CommandDecision::Allow);
        assert_eq!(engine.evaluate("cat README.md").decision, CommandDecision::Allow);
    }

    #[test]
    fn prompt_matches_when_no_allow_or_deny_covers_it() {
        let engine = CommandPolicyEngine::from_config(&config(&[], &["git push"], &[]));
        assert_eq!(engine.evaluate("git push origin main").decision, CommandDecision::Prompt);
    }
}
