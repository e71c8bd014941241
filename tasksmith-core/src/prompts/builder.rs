//! `SystemPromptBuilder`: assembles the six sections into one prompt,
//! adapting its verbosity to the provider's context window.

use tasksmith_config::AutonomyLevel;

use super::rules::rules_text_for;
use super::sections::PromptSection;

const COMPACT_THRESHOLD: u32 = 2048;
const FULL_THRESHOLD: u32 = 4096;

const DEFAULT_IDENTITY: &str =
    "You are the tasksmith agent, a local assistant that manages tasks on this host.";

const TOOL_CALL_FORMAT: &str = "TOOL_CALL: <tool_name>\n<tool input, zero or more lines>\nEND_TOOL_CALL";

const WORKED_EXAMPLE: &str = "Example:\nTOOL_CALL: list_directory\n.\nEND_TOOL_CALL";

/// Six section buffers, populated once per turn and rendered into the
/// system prompt text sent to the provider (`spec.md` §3, §4.5).
#[derive(Debug, Clone, Default)]
pub struct SystemPromptBuilder {
    identity: Option<String>,
    tools: Option<String>,
    skills: Option<String>,
    system_context: Option<String>,
    rules: Option<String>,
    project_context: Option<String>,
}

impl SystemPromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, text: impl Into<String>) -> Self {
        self.identity = Some(text.into());
        self
    }

    /// Pre-rendered tool catalog text (`spec.md` §6: "a line of the form
    /// `- <name>: <description>`"), owned by the tool registry.
    pub fn with_tool_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.tools = Some(catalog.into());
        self
    }

    pub fn with_skills(mut self, text: impl Into<String>) -> Self {
        self.skills = Some(text.into());
        self
    }

    pub fn with_system_context(mut self, text: impl Into<String>) -> Self {
        self.system_context = Some(text.into());
        self
    }

    pub fn with_level(mut self, level: AutonomyLevel) -> Self {
        self.rules = Some(rules_text_for(level).to_string());
        self
    }

    pub fn with_project_context(mut self, text: impl Into<String>) -> Self {
        self.project_context = Some(text.into());
        self
    }

    /// Render the assembled prompt. `context_window` drives adaptive
    /// sizing: at or below 2048 tokens the prompt omits the worked
    /// tool-call example and uses terser section bodies; at or above 4096
    /// it includes the full worked example (`spec.md` §4.5).
    pub fn build(&self, context_window: u32) -> String {
        let compact = context_window <= COMPACT_THRESHOLD;
        let full_example = context_window >= FULL_THRESHOLD;

        let mut out = String::new();
        self.push_section(&mut out, PromptSection::Identity, self.identity.as_deref().unwrap_or(DEFAULT_IDENTITY));
        self.push_section(&mut out, PromptSection::Tools, self.tools.as_deref().unwrap_or("(no tools registered)"));
        if !compact {
            self.push_section(&mut out, PromptSection::Skills, self.skills.as_deref().unwrap_or("(no skills)"));
        }
        self.push_section(
            &mut out,
            PromptSection::SystemContext,
            self.system_context.as_deref().unwrap_or("(system context unavailable)"),
        );
        self.push_section(&mut out, PromptSection::Rules, self.rules.as_deref().unwrap_or(rules_text_for(AutonomyLevel::Observe)));
        if !compact {
            self.push_section(
                &mut out,
                PromptSection::ProjectContext,
                self.project_context.as_deref().unwrap_or("(no project context)"),
            );
        }

        out.push_str("## Tool call format\n");
        out.push_str(TOOL_CALL_FORMAT);
        out.push('\n');
        if full_example {
            out.push_str(WORKED_EXAMPLE);
            out.push('\n');
        }

        out
    }

    fn push_section(&self, out: &mut String, section: PromptSection, body: &str) {
        out.push_str("## ");
        out.push_str(section.heading());
        out.push('\n');
        out.push_str(body.trim());
        out.push_str("\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_prompt_omits_skills_and_worked_example() {
        let builder = SystemPromptBuilder::new().with_level(AutonomyLevel::Observe);
        let prompt = builder.build(1024);
        assert!(!prompt.contains("## Skills"));
        assert!(!prompt.contains("Example:"));
        assert!(prompt.contains("TOOL_CALL:"));
    }

    #[test]
    fn full_prompt_includes_worked_example() {
        let builder = SystemPromptBuilder::new().with_level(AutonomyLevel::Workspace);
        let prompt = builder.build(8192);
        assert!(prompt.contains("## Skills"));
        assert!(prompt.contains("Example:"));
    }

    #[test]
    fn rules_section_reflects_autonomy_level() {
        let prompt = SystemPromptBuilder::new()
            .with_level(AutonomyLevel::Full)
            .build(8192);
        assert!(prompt.contains("full access"));
    }

    #[test]
    fn tool_call_format_is_bit_literal() {
        let prompt = SystemPromptBuilder::new().build(8192);
        assert!(prompt.contains("TOOL_CALL: <tool_name>\n<tool input, zero or more lines>\nEND_TOOL_CALL"));
    }
}
