//! The six prompt sections from `spec.md` §3's `SystemPromptBuilder`.

/// One of the six section buffers populated each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSection {
    Identity,
    Tools,
    Skills,
    SystemContext,
    Rules,
    ProjectContext,
}

impl PromptSection {
    pub fn heading(self) -> &'static str {
        match self {
            PromptSection::Identity => "Identity",
            PromptSection::Tools => "Tools",
            PromptSection::Skills => "Skills",
            PromptSection::SystemContext => "System Context",
            PromptSection::Rules => "Rules",
            PromptSection::ProjectContext => "Project Context",
        }
    }
}

/// Read a sub-workspace markdown section file if present, otherwise fall
/// back to `default_text` (`spec.md` §6: "sub-workspace with
/// identity/user/system/memory/heartbeat/system markdown files"; grounded
/// in the teacher's "on-disk override, built-in fallback" pairing).
pub fn load_section_or_default(workspace_root: &std::path::Path, file_name: &str, default_text: &str) -> String {
    let path = workspace_root.join(file_name);
    std::fs::read_to_string(&path)
        .ok()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| default_text.to_string())
}
