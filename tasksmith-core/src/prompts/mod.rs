//! System prompt assembly (`spec.md` §4.5): six sections, a level-dependent
//! rules table, adaptive sizing against the provider's context window, and
//! the bit-literal `TOOL_CALL:`/`END_TOOL_CALL` wire format the model is
//! instructed to use.

mod builder;
mod rules;
mod sections;
mod system_context;

pub use builder::SystemPromptBuilder;
pub use rules::rules_text_for;
pub use sections::{load_section_or_default, PromptSection};
pub use system_context::gather_system_context;
