//! The eleven-stage execution pipeline (`spec.md` §4.1): the only path
//! from a model-originated tool call to an effect on the host.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

use tasksmith_config::autonomy::AutonomyHandle;
use tasksmith_config::{AutonomyLevel, CommandDecision, CommandsConfig, Limits};

use crate::audit::{AuditJournal, AuditStatus, PipelineStage, ToolCallAuditRecord};
use crate::error::{AgentError, RateScope};
use crate::policy::{CommandPolicyEngine, SensitivePathSet};
use crate::redact::redact;

use super::context::ExecutionContext;
use super::registry::ToolRegistry;

/// Approves or denies a command-policy `Prompt` decision. In a headless or
/// non-interactive context this should always deny, matching `spec.md`
/// §4.1 stage 7's "human-approval gate (... when standard input is a
/// terminal)".
pub type ApprovalCallback = Arc<dyn Fn(&str) -> bool + Send + Sync>;

struct Counters {
    per_prompt_calls: u32,
    per_session_calls: u32,
    session_write_bytes: u64,
    session_file_creates: u32,
    last_write_at: Option<Instant>,
}

impl Counters {
    fn new() -> Self {
        Self {
            per_prompt_calls: 0,
            per_session_calls: 0,
            session_write_bytes: 0,
            session_file_creates: 0,
            last_write_at: None,
        }
    }
}

/// Stage outcome for the three internal gates that can veto before the
/// handler runs, modeled as a tagged sum type rather than relying on
/// unwind-style control flow (`spec.md` §9's "exception-like flow"
/// redesign note).
enum GateOutcome {
    Continue,
    Refuse(AgentError, PipelineStage),
}

pub struct Executor {
    registry: AsyncMutex<ToolRegistry>,
    counters: AsyncMutex<Counters>,
    autonomy: AutonomyHandle,
    sensitive_paths: SensitivePathSet,
    observe_policy: CommandPolicyEngine,
    configured_policy: CommandPolicyEngine,
    limits: Limits,
    audit: AuditJournal,
    approval: Option<ApprovalCallback>,
    next_audit_id: AtomicU64,
}

impl Executor {
    pub fn new(
        autonomy: AutonomyHandle,
        commands_config: CommandsConfig,
        limits: Limits,
        audit: AuditJournal,
    ) -> Self {
        Self {
            registry: AsyncMutex::new(ToolRegistry::new(limits.registry_capacity)),
            counters: AsyncMutex::new(Counters::new()),
            autonomy,
            sensitive_paths: SensitivePathSet::new(),
            observe_policy: CommandPolicyEngine::from_config(&CommandsConfig::default()),
            configured_policy: CommandPolicyEngine::from_config(&commands_config),
            limits,
            audit,
            approval: None,
            next_audit_id: AtomicU64::new(0),
        }
    }

    pub fn with_approval_callback(mut self, callback: ApprovalCallback) -> Self {
        self.approval = Some(callback);
        self
    }

    pub async fn register(&self, descriptor: super::descriptor::ToolDescriptor) -> Result<(), AgentError> {
        self.registry.lock().await.register(descriptor)
    }

    pub async fn list_descriptions(&self) -> String {
        self.registry.lock().await.list_descriptions()
    }

    /// Reset the per-prompt call counter at the start of a new user turn;
    /// the per-session counters persist for the life of the process
    /// (`spec.md` §3).
    pub async fn reset_prompt_counter(&self) {
        self.counters.lock().await.per_prompt_calls = 0;
    }

    /// Runs the full pipeline for one tool invocation and returns its
    /// output, or the `AgentError` the model should see.
    pub async fn execute(&self, tool_name: &str, input: &str, session_id: &str) -> Result<String, AgentError> {
        let audit_id = self.next_audit_id.fetch_add(1, Ordering::SeqCst);
        let started_at = Instant::now();

        let outcome = self.run_pipeline(audit_id, tool_name, input, session_id).await;

        let duration_ms = started_at.elapsed().as_millis() as u64;
        let status = match &outcome {
            Ok(_) => AuditStatus::Ok,
            Err((_, Some(stage))) => AuditStatus::Refused(*stage),
            Err((err, None)) => AuditStatus::Error(err.to_string()),
        };
        let sanitised_output = outcome.as_ref().ok().map(|output| redact(output));

        let record = ToolCallAuditRecord {
            id: audit_id,
            conversation_id: session_id.to_string(),
            tool_name: tool_name.to_string(),
            sanitised_input: redact(input),
            sanitised_output,
            status,
            duration_ms,
            created_at: chrono::Utc::now(),
        };

        let result = outcome.map_err(|(err, _)| err);

        if let Err(audit_err) = self.audit.record(&record).await {
            warn!(%audit_err, "failed to persist audit record");
            return Err(AgentError::AuditWriteFailed(audit_err.to_string()));
        }

        result
    }

    /// Runs stages 1-10; stage 11 (audit finalisation) lives in
    /// [`Executor::execute`]. Returns the stage a refusal occurred at
    /// alongside the error, so the caller can build the audit row.
    async fn run_pipeline(
        &self,
        audit_id: u64,
        tool_name: &str,
        input: &str,
        session_id: &str,
    ) -> Result<String, (AgentError, Option<PipelineStage>)> {
        // Stage 1: existence & input validation.
        let registry = self.registry.lock().await;
        let descriptor = registry
            .get(tool_name)
            .ok_or_else(|| (AgentError::UnknownTool(tool_name.to_string()), Some(PipelineStage::Existence)))?
            .clone();
        if input.len() > descriptor.max_input_bytes {
            return Err((
                AgentError::InputTooLarge(tool_name.to_string()),
                Some(PipelineStage::Existence),
            ));
        }
        drop(registry);

        let autonomy = self.autonomy.get();

        // Stage 2: capability gate.
        if let GateOutcome::Refuse(err, stage) = self.capability_gate(&descriptor, autonomy.level) {
            return Err((err, Some(stage)));
        }

        // Stage 3: rate gate.
        let mut counters = self.counters.lock().await;
        if counters.per_prompt_calls >= autonomy.max_calls_per_prompt {
            return Err((
                AgentError::RateExhausted(RateScope::Prompt),
                Some(PipelineStage::Rate),
            ));
        }
        if counters.per_session_calls >= autonomy.max_calls_per_session {
            return Err((
                AgentError::RateExhausted(RateScope::Session),
                Some(PipelineStage::Rate),
            ));
        }
        counters.per_prompt_calls += 1;
        counters.per_session_calls += 1;
        drop(counters);

        // Stage 4: sensitive-path gate.
        for candidate in descriptor.candidate_paths(input) {
            let canonical = std::fs::canonicalize(&candidate).unwrap_or(candidate);
            if self.sensitive_paths.is_sensitive(&canonical) {
                self.rollback_rate_counters().await;
                return Err((
                    AgentError::SensitivePath(canonical.display().to_string()),
                    Some(PipelineStage::SensitivePath),
                ));
            }
        }

        // Stage 5: write-cooldown gate. `last_write_at` is advanced only
        // after the handler actually completes a write (below), so the
        // cooldown measures time since the previous write *finished*
        // (`spec.md` §8: "Wᵢ₊₁.start_ts − Wᵢ.end_ts ≥ write_cooldown").
        if descriptor.is_write {
            let counters = self.counters.lock().await;
            if let Some(last_write) = counters.last_write_at {
                let elapsed = last_write.elapsed();
                if elapsed < autonomy.write_cooldown {
                    drop(counters);
                    self.rollback_rate_counters().await;
                    let remaining = autonomy.write_cooldown.saturating_sub(elapsed);
                    return Err((
                        AgentError::WriteCooldown(remaining.as_millis() as u64),
                        Some(PipelineStage::WriteCooldown),
                    ));
                }
            }
        }

        // Stage 6 + 7: command-policy and human-approval gates (shell only).
        if descriptor.requires_command_policy() {
            let engine = if autonomy.level == AutonomyLevel::Observe {
                &self.observe_policy
            } else {
                &self.configured_policy
            };
            let verdict = engine.evaluate(input);
            match verdict.decision {
                CommandDecision::Forbidden => {
                    return Err((
                        AgentError::CommandForbidden(verdict.rationale),
                        Some(PipelineStage::CommandPolicy),
                    ));
                }
                CommandDecision::Prompt => {
                    let approved = self
                        .approval
                        .as_ref()
                        .map(|callback| callback(input))
                        .unwrap_or(false);
                    if !approved {
                        return Err((
                            AgentError::CommandDenied(input.to_string()),
                            Some(PipelineStage::HumanApproval),
                        ));
                    }
                }
                CommandDecision::Allow => {}
            }
        }

        // Stage 8: audit pre-record. A pending row is appended before the
        // handler runs so a crash mid-handler still leaves a trace; this
        // is best-effort and never blocks or fails the call on its own.
        let pending = ToolCallAuditRecord {
            id: audit_id,
            conversation_id: session_id.to_string(),
            tool_name: tool_name.to_string(),
            sanitised_input: redact(input),
            sanitised_output: None,
            status: AuditStatus::Pending,
            duration_ms: 0,
            created_at: chrono::Utc::now(),
        };
        if let Err(audit_err) = self.audit.record(&pending).await {
            warn!(%audit_err, "failed to persist pending audit record");
        }

        // Stage 9: handler invocation.
        let ctx = ExecutionContext {
            tool_name: tool_name.to_string(),
            session_id: session_id.to_string(),
            per_prompt_count: self.counters.lock().await.per_prompt_calls,
            per_session_count: self.counters.lock().await.per_session_calls,
        };
        let handler_result = descriptor.handler.call(input, &ctx).await;

        match handler_result {
            Ok(output) => {
                if descriptor.is_write {
                    let mut counters = self.counters.lock().await;
                    counters.session_write_bytes += output.len() as u64;
                    counters.session_file_creates += 1;
                    counters.last_write_at = Some(Instant::now());
                }
                // Stage 10: output sanitisation happens in `execute`, over
                // the returned string, ahead of persistence.
                Ok(output)
            }
            Err(err) => Err((err, None)),
        }
    }

    fn capability_gate(&self, descriptor: &super::descriptor::ToolDescriptor, level: AutonomyLevel) -> GateOutcome {
        use super::descriptor::ToolKind;
        let capabilities = level.capabilities();
        let permitted = match descriptor.kind {
            ToolKind::Read => capabilities.read,
            ToolKind::Write => capabilities.write,
            ToolKind::Git => capabilities.git,
            ToolKind::Shell => !matches!(capabilities.shell, tasksmith_config::autonomy::ShellAccess::None),
        };
        if permitted {
            GateOutcome::Continue
        } else {
            GateOutcome::Refuse(
                AgentError::LevelForbidden(descriptor.name.clone()),
                PipelineStage::Capability,
            )
        }
    }

    /// Undo the stage-3 counter increments on a later-stage refusal
    /// (`spec.md` §4.1: "counters are rolled back on stage-3 or stage-4
    /// refusal").
    async fn rollback_rate_counters(&self) {
        let mut counters = self.counters.lock().await;
        counters.per_prompt_calls = counters.per_prompt_calls.saturating_sub(1);
        counters.per_session_calls = counters.per_session_calls.saturating_sub(1);
    }

    pub async fn session_write_bytes(&self) -> u64 {
        self.counters.lock().await.session_write_bytes
    }

    pub async fn session_file_creates(&self) -> u32 {
        self.counters.lock().await.session_file_creates
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

impl super::descriptor::ToolDescriptor {
    /// Whether this tool's input must pass through the command-policy
    /// gate; true only for shell tools (`spec.md` §4.1 stage 6).
    pub fn requires_command_policy(&self) -> bool {
        self.kind == super::descriptor::ToolKind::Shell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditJournal;
    use crate::tools::descriptor::ToolDescriptor;
    use async_trait::async_trait;
    use tasksmith_config::{AutonomyConfig, AutonomyLevel};
    use tempfile::tempdir;

    struct EchoHandler;

    #[async_trait]
    impl super::super::descriptor::ToolHandler for EchoHandler {
        async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
            Ok(input.to_string())
        }
    }

    async fn executor_with(level: AutonomyLevel) -> (Executor, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let journal = AuditJournal::spawn(dir.path().join("audit.log"), 2 * 1024 * 1024, 3);
        let autonomy = AutonomyHandle::new(AutonomyConfig::new(level));
        let executor = Executor::new(autonomy, CommandsConfig::default(), Limits::default(), journal);
        (executor, dir)
    }

    #[tokio::test]
    async fn read_tool_allowed_under_observe() {
        let (executor, _dir) = executor_with(AutonomyLevel::Observe).await;
        executor
            .register(ToolDescriptor::new(
                "list_directory",
                "lists",
                super::super::descriptor::ToolKind::Read,
                false,
                1024,
                Arc::new(EchoHandler),
            ))
            .await
            .unwrap();
        let output = executor.execute("list_directory", ".", "session-1").await.unwrap();
        assert_eq!(output, ".");
    }

    #[tokio::test]
    async fn write_tool_refused_under_observe() {
        let (executor, _dir) = executor_with(AutonomyLevel::Observe).await;
        executor
            .register(ToolDescriptor::new(
                "write_file",
                "writes",
                super::super::descriptor::ToolKind::Write,
                true,
                1024,
                Arc::new(EchoHandler),
            ))
            .await
            .unwrap();
        let result = executor.execute("write_file", "payload", "session-1").await;
        assert!(matches!(result, Err(AgentError::LevelForbidden(_))));
    }

    #[tokio::test]
    async fn rate_exhaustion_refuses_third_call() {
        let dir = tempdir().unwrap();
        let journal = AuditJournal::spawn(dir.path().join("audit.log"), 2 * 1024 * 1024, 3);
        let mut config = AutonomyConfig::new(AutonomyLevel::Workspace);
        config.max_calls_per_prompt = 2;
        let autonomy = AutonomyHandle::new(config);
        let executor = Executor::new(autonomy, CommandsConfig::default(), Limits::default(), journal);
        executor
            .register(ToolDescriptor::new(
                "list_directory",
                "lists",
                super::super::descriptor::ToolKind::Read,
                false,
                1024,
                Arc::new(EchoHandler),
            ))
            .await
            .unwrap();
        executor.execute("list_directory", "a", "s").await.unwrap();
        executor.execute("list_directory", "b", "s").await.unwrap();
        let third = executor.execute("list_directory", "c", "s").await;
        assert!(matches!(third, Err(AgentError::RateExhausted(RateScope::Prompt))));
    }

    #[tokio::test]
    async fn unknown_tool_is_refused_at_existence_stage() {
        let (executor, _dir) = executor_with(AutonomyLevel::Full).await;
        let result = executor.execute("does_not_exist", "x", "s").await;
        assert!(matches!(result, Err(AgentError::UnknownTool(_))));
    }
}
