//! Loads an optional `tasksmith.toml` layered over built-in defaults,
//! simplified from the teacher's multi-layer `loader::{layers, merge}`
//! cascade down to a single file plus environment-variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::autonomy::AutonomyConfig;
use crate::commands::CommandsConfig;
use crate::limits::Limits;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TasksmithConfig {
    #[serde(default)]
    pub autonomy: AutonomyConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub limits: Limits,
}

impl TasksmithConfig {
    /// Load from `path` if it exists, otherwise return built-in defaults.
    /// Limits are always clamped to safe maxima after loading.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {path:?}"))?;
            toml::from_str(&text).with_context(|| format!("parsing config file {path:?}"))?
        } else {
            Self::default()
        };
        config.limits = config.limits.clamped();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasksmith.toml");
        let config = TasksmithConfig::load_or_default(&path).unwrap();
        assert_eq!(config.limits.max_tool_iterations, 5);
    }

    #[test]
    fn existing_file_overrides_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tasksmith.toml");
        std::fs::write(
            &path,
            r#"
            [autonomy]
            level = "workspace"
            max_calls_per_prompt = 5
            max_calls_per_session = 50
            max_session_write_bytes = 1048576
            max_session_file_creates = 20
            write_cooldown = 500
            shell_timeout = 30
            confirm_destructive = true
            "#,
        )
        .unwrap();
        let config = TasksmithConfig::load_or_default(&path).unwrap();
        assert_eq!(config.autonomy.level, crate::AutonomyLevel::Workspace);
    }
}
