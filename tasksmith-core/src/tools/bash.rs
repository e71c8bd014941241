//! Shell tool (`spec.md` §4.1 stage 9, §4.2, §4.3, §5): runs a command
//! through `/bin/sh -c`, under the kernel sandbox, killed on timeout.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tasksmith_config::autonomy::AutonomyHandle;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::error::AgentError;
use crate::redact::redact;
use crate::sandbox::SandboxManager;

use super::context::ExecutionContext;
use super::descriptor::ToolHandler;

/// Shell command execution tool. Input is the literal command line, taken
/// verbatim between `TOOL_CALL:`/`END_TOOL_CALL` markers.
pub struct BashTool {
    workspace_root: PathBuf,
    home_dir: PathBuf,
    autonomy: AutonomyHandle,
    sandbox: std::sync::Arc<SandboxManager>,
}

impl BashTool {
    pub fn new(
        workspace_root: PathBuf,
        home_dir: PathBuf,
        autonomy: AutonomyHandle,
        sandbox: std::sync::Arc<SandboxManager>,
    ) -> Self {
        Self {
            workspace_root,
            home_dir,
            autonomy,
            sandbox,
        }
    }
}

#[async_trait]
impl ToolHandler for BashTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let command_line = input.trim();
        if command_line.is_empty() {
            return Err(AgentError::Internal("shell: empty command".to_string()));
        }

        let config = self.autonomy.get();
        let writable_roots: Vec<PathBuf> = config
            .write_root(&self.workspace_root, &self.home_dir)
            .into_iter()
            .collect();
        let readable_roots = vec![self.workspace_root.clone()];
        let level = config.level;

        let sandbox = self.sandbox.clone();
        let mut command = Command::new("/bin/sh");
        command
            .arg("-c")
            .arg(command_line)
            .current_dir(&self.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            let readable = readable_roots.clone();
            let writable = writable_roots.clone();
            unsafe {
                command.pre_exec(move || {
                    sandbox
                        .apply_before_exec(level, &readable, &writable)
                        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
                });
            }
        }

        let child = command
            .spawn()
            .map_err(|e| AgentError::Internal(format!("failed to spawn shell: {e}")))?;

        let wait_result = timeout(config.shell_timeout, child.wait_with_output()).await;

        let output = match wait_result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(AgentError::Internal(format!("shell wait failed: {e}"))),
            Err(_) => {
                warn!(command = command_line, "shell command exceeded timeout, killing");
                return Err(AgentError::ShellTimeout);
            }
        };

        let mut rendered = String::new();
        rendered.push_str(&format!("exit_code={}\n", output.status.code().unwrap_or(-1)));
        rendered.push_str("-- stdout --\n");
        rendered.push_str(&String::from_utf8_lossy(&output.stdout));
        rendered.push_str("\n-- stderr --\n");
        rendered.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(redact(&rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksmith_config::{AutonomyConfig, AutonomyLevel};
    use tempfile::tempdir;

    fn bash_tool(level: AutonomyLevel) -> (BashTool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let autonomy = AutonomyHandle::new(AutonomyConfig::new(level));
        let tool = BashTool::new(
            dir.path().to_path_buf(),
            dir.path().to_path_buf(),
            autonomy,
            std::sync::Arc::new(SandboxManager::new()),
        );
        (tool, dir)
    }

    fn exec_ctx() -> ExecutionContext {
        ExecutionContext {
            tool_name: "shell".to_string(),
            session_id: "s1".to_string(),
            per_prompt_count: 0,
            per_session_count: 0,
        }
    }

    #[tokio::test]
    async fn echo_command_runs_and_captures_stdout() {
        let (tool, _dir) = bash_tool(AutonomyLevel::Full);
        let output = tool.call("echo hello", &exec_ctx()).await.unwrap();
        assert!(output.contains("hello"));
        assert!(output.contains("exit_code=0"));
    }

    #[tokio::test]
    async fn timeout_kills_the_child_and_reports_shell_timeout() {
        let (mut tool, _dir) = bash_tool(AutonomyLevel::Full);
        {
            let mut config = tool.autonomy.get();
            config.shell_timeout = std::time::Duration::from_millis(50);
            tool.autonomy = AutonomyHandle::new(config);
        }
        let result = tool.call("sleep 5", &exec_ctx()).await;
        assert!(matches!(result, Err(AgentError::ShellTimeout)));
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let (tool, _dir) = bash_tool(AutonomyLevel::Full);
        assert!(tool.call("   ", &exec_ctx()).await.is_err());
    }
}
