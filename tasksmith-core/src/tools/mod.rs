//! Tool registry, descriptor, executor, and the concrete tool handlers
//! (`spec.md` §3, §4.1, §4.2, §4.4).

mod bash;
mod context;
mod descriptor;
mod executor;
mod file_ops;
mod git;
mod path_validation;
mod registry;

pub use bash::BashTool;
pub use context::ExecutionContext;
pub use descriptor::{PathExtractor, ToolDescriptor, ToolHandler, ToolKind};
pub use executor::{ApprovalCallback, Executor};
pub use file_ops::{file_op_descriptors, FileOpsContext};
pub use git::GitTool;
pub use path_validation::PathGuard;
pub use registry::ToolRegistry;
