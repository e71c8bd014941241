//! `ToolCallAuditRecord` and the pipeline-stage/status vocabulary it uses.

use chrono::{DateTime, Utc};

/// Which gate in the executor's pipeline produced a refusal, for
/// `Refused(stage)` audit statuses (`spec.md` §3, §4.1, §8's "Audit
/// completeness" property).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Existence,
    Capability,
    Rate,
    SensitivePath,
    WriteCooldown,
    CommandPolicy,
    HumanApproval,
    Handler,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PipelineStage::Existence => "existence",
            PipelineStage::Capability => "capability",
            PipelineStage::Rate => "rate",
            PipelineStage::SensitivePath => "sensitive_path",
            PipelineStage::WriteCooldown => "write_cooldown",
            PipelineStage::CommandPolicy => "command_policy",
            PipelineStage::HumanApproval => "human_approval",
            PipelineStage::Handler => "handler",
        };
        write!(f, "{label}")
    }
}

/// Final status of one `execute(...)` call, per `spec.md` §8's "Audit
/// completeness" invariant: `{Ok, Refused(stage), Error(kind)}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditStatus {
    /// Written before the handler runs, so a crash mid-handler still
    /// leaves a trace (`spec.md` §4.1 stage 8, §8 "pre-record precedes the
    /// handler invocation so partial failures remain visible").
    Pending,
    Ok,
    Refused(PipelineStage),
    Error(String),
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditStatus::Pending => write!(f, "pending"),
            AuditStatus::Ok => write!(f, "ok"),
            AuditStatus::Refused(stage) => write!(f, "refused({stage})"),
            AuditStatus::Error(kind) => write!(f, "error({kind})"),
        }
    }
}

/// Severity recorded alongside each audit line, used the way the teacher's
/// `tracing` fields classify log lines (`spec.md` §6: "ISO-8601 timestamp,
/// level, component, message").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditLevel {
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditLevel::Info => write!(f, "INFO"),
            AuditLevel::Warn => write!(f, "WARN"),
            AuditLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// One row in the audit trail for a single `execute(...)` call.
#[derive(Debug, Clone)]
pub struct ToolCallAuditRecord {
    pub id: u64,
    pub conversation_id: String,
    pub tool_name: String,
    pub sanitised_input: String,
    pub sanitised_output: Option<String>,
    pub status: AuditStatus,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl ToolCallAuditRecord {
    /// Render as the single audit-journal line: ISO-8601 timestamp, level,
    /// component, message (`spec.md` §6).
    pub fn to_line(&self) -> String {
        let level = match &self.status {
            AuditStatus::Pending => AuditLevel::Info,
            AuditStatus::Ok => AuditLevel::Info,
            AuditStatus::Refused(_) => AuditLevel::Warn,
            AuditStatus::Error(_) => AuditLevel::Error,
        };
        format!(
            "{} {} tool_executor id={} conversation={} tool={} status={} duration_ms={} input={:?} output={:?}",
            self.created_at.to_rfc3339(),
            level,
            self.id,
            self.conversation_id,
            self.tool_name,
            self.status,
            self.duration_ms,
            self.sanitised_input,
            self.sanitised_output.as_deref().unwrap_or(""),
        )
    }
}
