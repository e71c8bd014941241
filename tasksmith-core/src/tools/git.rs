//! Git tool (`spec.md` §4.2, §5): runs a single `git` subcommand with its
//! own 10 s timeout, independent of the shell handler's `shell_timeout`.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::AgentError;
use crate::redact::redact;

use super::context::ExecutionContext;
use super::descriptor::ToolHandler;

/// Runs `git <args...>` rooted at the workspace, bypassing a shell so
/// shell metacharacters in the input are inert.
pub struct GitTool {
    workspace_root: PathBuf,
    timeout: Duration,
}

impl GitTool {
    pub fn new(workspace_root: PathBuf, timeout_secs: u64) -> Self {
        Self {
            workspace_root,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl ToolHandler for GitTool {
    async fn call(&self, input: &str, _ctx: &ExecutionContext) -> Result<String, AgentError> {
        let args = shell_words::split(input.trim())
            .map_err(|e| AgentError::Internal(format!("git: unparsable arguments: {e}")))?;
        if args.is_empty() {
            return Err(AgentError::Internal("git: no subcommand given".to_string()));
        }

        let mut command = Command::new("git");
        command
            .args(&args)
            .current_dir(&self.workspace_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = command
            .spawn()
            .map_err(|e| AgentError::Internal(format!("failed to spawn git: {e}")))?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(AgentError::Internal(format!("git wait failed: {e}"))),
            Err(_) => return Err(AgentError::ShellTimeout),
        };

        let mut rendered = String::new();
        rendered.push_str(&format!("exit_code={}\n", output.status.code().unwrap_or(-1)));
        rendered.push_str(&String::from_utf8_lossy(&output.stdout));
        rendered.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(redact(&rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn exec_ctx() -> ExecutionContext {
        ExecutionContext {
            tool_name: "git".to_string(),
            session_id: "s1".to_string(),
            per_prompt_count: 0,
            per_session_count: 0,
        }
    }

    #[tokio::test]
    async fn git_status_runs_in_an_initialised_repo() {
        let dir = tempdir().unwrap();
        let init = Command::new("git")
            .args(["init"])
            .current_dir(dir.path())
            .output()
            .await;
        if init.is_err() {
            return;
        }
        let tool = GitTool::new(dir.path().to_path_buf(), 10);
        let output = tool.call("status", &exec_ctx()).await.unwrap();
        assert!(output.contains("exit_code=0"));
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let dir = tempdir().unwrap();
        let tool = GitTool::new(dir.path().to_path_buf(), 10);
        assert!(tool.call("   ", &exec_ctx()).await.is_err());
    }

    #[tokio::test]
    async fn timeout_is_reported_as_shell_timeout() {
        let dir = tempdir().unwrap();
        let tool = GitTool::new(dir.path().to_path_buf(), 0);
        let result = tool.call("status", &exec_ctx()).await;
        assert!(result.is_err());
    }
}
