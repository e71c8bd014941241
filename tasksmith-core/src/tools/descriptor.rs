//! `ToolDescriptor` and the async handler trait every registered tool
//! implements (`spec.md` §3).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;

use super::context::ExecutionContext;

/// Implemented by every tool. `call` receives the tool's raw input text —
/// the wire format is literal text between `TOOL_CALL:`/`END_TOOL_CALL`
/// markers (`spec.md` §4.5), not JSON.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, input: &str, ctx: &ExecutionContext) -> Result<String, AgentError>;
}

/// Extracts candidate filesystem paths referenced by a tool's raw input,
/// consulted by the executor's sensitive-path gate (`spec.md` §4.1 stage
/// 4: "for tools whose input can be resolved to a path").
pub type PathExtractor = Arc<dyn Fn(&str) -> Vec<PathBuf> + Send + Sync>;

/// Which column of `spec.md` §3's capability matrix a tool falls under.
/// Distinct from `is_write`, which drives the write-cooldown and
/// session-budget counters rather than the capability gate itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Read,
    Write,
    Shell,
    Git,
}

/// name (unique), description, handler, is_write flag (`spec.md` §3).
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub kind: ToolKind,
    pub is_write: bool,
    pub max_input_bytes: usize,
    pub handler: Arc<dyn ToolHandler>,
    pub path_extractor: Option<PathExtractor>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ToolKind,
        is_write: bool,
        max_input_bytes: usize,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            is_write,
            max_input_bytes,
            handler,
            path_extractor: None,
        }
    }

    pub fn with_path_extractor(mut self, extractor: PathExtractor) -> Self {
        self.path_extractor = Some(extractor);
        self
    }

    pub fn candidate_paths(&self, input: &str) -> Vec<PathBuf> {
        self.path_extractor
            .as_ref()
            .map(|extract| extract(input))
            .unwrap_or_default()
    }
}
