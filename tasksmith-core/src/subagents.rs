//! Bounded pool of background subagent processes (`spec.md` §4.9): each
//! has a name and a command, runs with stdout/stderr redirected to a
//! per-subagent temp file, max 8 concurrent, max depth 1.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs::File;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::AgentError;

/// Lifecycle state of one subagent. `Pending` never actually surfaces
/// externally since `spawn` only returns after fork+exec succeeds or
/// fails, but it is kept for symmetry with `spec.md` §4.9's transition
/// table and as the value briefly held while the child is being spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubagentStatus {
    Pending,
    Running,
    Done,
    Failed,
    Killed,
}

/// One tracked background process.
pub struct SubagentRecord {
    pub id: u64,
    pub name: String,
    pub command: String,
    pub status: SubagentStatus,
    pub output_path: PathBuf,
    child: Option<Child>,
}

/// Snapshot returned by `list`/`poll`, decoupled from the live `Child`
/// handle so callers outside the manager's lock cannot reach it.
#[derive(Debug, Clone)]
pub struct SubagentInfo {
    pub id: u64,
    pub name: String,
    pub command: String,
    pub status: SubagentStatus,
}

pub struct SubagentManager {
    pool_capacity: usize,
    max_depth: u32,
    current_depth: u32,
    output_dir: PathBuf,
    next_id: AtomicU64,
    records: Mutex<HashMap<u64, SubagentRecord>>,
}

impl SubagentManager {
    pub fn new(pool_capacity: usize, max_depth: u32, current_depth: u32, output_dir: PathBuf) -> Self {
        Self {
            pool_capacity,
            max_depth,
            current_depth,
            output_dir,
            next_id: AtomicU64::new(1),
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Spawns `command` under a shell, provided the pool has room and the
    /// current agent is not itself already at the max subagent depth
    /// (`spec.md` §4.9: "a subagent is forbidden from spawning another").
    pub async fn spawn(&self, name: &str, command: &str) -> Result<u64, AgentError> {
        if self.current_depth >= self.max_depth {
            return Err(AgentError::Internal(
                "subagent depth limit exceeded: subagents cannot spawn subagents".to_string(),
            ));
        }
        let mut records = self.records.lock().await;
        if records.len() >= self.pool_capacity {
            return Err(AgentError::Internal("subagent pool is at capacity".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let output_path = self.output_dir.join(format!("subagent-{id}.log"));
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AgentError::Internal(format!("failed to prepare output dir: {e}")))?;
        let stdout_file = File::create(&output_path)
            .await
            .map_err(|e| AgentError::Internal(format!("failed to create output file: {e}")))?
            .into_std()
            .await;
        let stderr_file = stdout_file
            .try_clone()
            .map_err(|e| AgentError::Internal(format!("failed to clone output handle: {e}")))?;

        let spawn_result = Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file))
            .spawn();

        let (child, status) = match spawn_result {
            Ok(child) => (Some(child), SubagentStatus::Running),
            Err(e) => {
                warn!(name, error = %e, "subagent failed to spawn");
                (None, SubagentStatus::Failed)
            }
        };

        records.insert(
            id,
            SubagentRecord {
                id,
                name: name.to_string(),
                command: command.to_string(),
                status,
                output_path,
                child,
            },
        );
        Ok(id)
    }

    pub async fn list(&self) -> Vec<SubagentInfo> {
        let records = self.records.lock().await;
        records.values().map(snapshot).collect()
    }

    /// Non-blocking wait on every running child, updating terminal status
    /// in place (`spec.md` §4.9: "non-blocking wait on all children").
    pub async fn poll(&self) -> Vec<SubagentInfo> {
        let mut records = self.records.lock().await;
        for record in records.values_mut() {
            if record.status != SubagentStatus::Running {
                continue;
            }
            let Some(child) = record.child.as_mut() else {
                continue;
            };
            match child.try_wait() {
                Ok(Some(exit_status)) => {
                    record.status = if exit_status.success() {
                        SubagentStatus::Done
                    } else {
                        SubagentStatus::Failed
                    };
                    record.child = None;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(id = record.id, error = %e, "failed to poll subagent");
                }
            }
        }
        records.values().map(snapshot).collect()
    }

    pub async fn kill(&self, id: u64) -> Result<(), AgentError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&id)
            .ok_or_else(|| AgentError::Internal(format!("no such subagent: {id}")))?;
        if let Some(child) = record.child.as_mut() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        record.status = SubagentStatus::Killed;
        record.child = None;
        Ok(())
    }

    pub async fn kill_all(&self) {
        let ids: Vec<u64> = self.records.lock().await.keys().copied().collect();
        for id in ids {
            let _ = self.kill(id).await;
        }
    }

    /// Reads the subagent's output file. Only meaningful once the subagent
    /// reaches a terminal state; returns empty output otherwise.
    pub async fn read_output(&self, id: u64) -> Result<String, AgentError> {
        let path = {
            let records = self.records.lock().await;
            let record = records
                .get(&id)
                .ok_or_else(|| AgentError::Internal(format!("no such subagent: {id}")))?;
            record.output_path.clone()
        };
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AgentError::Internal(format!("failed to read subagent output: {e}")))
    }

    /// Drops the record and its output file, freeing the pool slot.
    /// Unread output is lost, matching `spec.md` §4.9.
    pub async fn free(&self, id: u64) {
        let mut records = self.records.lock().await;
        if let Some(record) = records.remove(&id) {
            let _ = tokio::fs::remove_file(&record.output_path).await;
        }
    }
}

fn snapshot(record: &SubagentRecord) -> SubagentInfo {
    SubagentInfo {
        id: record.id,
        name: record.name.clone(),
        command: record.command.clone(),
        status: record.status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn spawn_runs_and_poll_transitions_to_done() {
        let dir = tempdir().unwrap();
        let manager = SubagentManager::new(8, 1, 0, dir.path().to_path_buf());
        let id = manager.spawn("echoer", "echo hi").await.unwrap();

        let mut status = SubagentStatus::Running;
        for _ in 0..50 {
            let infos = manager.poll().await;
            status = infos.iter().find(|i| i.id == id).unwrap().status;
            if status != SubagentStatus::Running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(status, SubagentStatus::Done);

        let output = manager.read_output(id).await.unwrap();
        assert!(output.contains("hi"));
    }

    #[tokio::test]
    async fn depth_limit_forbids_spawning_at_max_depth() {
        let dir = tempdir().unwrap();
        let manager = SubagentManager::new(8, 1, 1, dir.path().to_path_buf());
        let result = manager.spawn("nested", "echo nope").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn pool_capacity_is_enforced() {
        let dir = tempdir().unwrap();
        let manager = SubagentManager::new(1, 1, 0, dir.path().to_path_buf());
        manager.spawn("first", "sleep 1").await.unwrap();
        let result = manager.spawn("second", "sleep 1").await;
        assert!(result.is_err());
        manager.kill_all().await;
    }

    #[tokio::test]
    async fn kill_transitions_to_killed() {
        let dir = tempdir().unwrap();
        let manager = SubagentManager::new(8, 1, 0, dir.path().to_path_buf());
        let id = manager.spawn("sleeper", "sleep 5").await.unwrap();
        manager.kill(id).await.unwrap();
        let infos = manager.list().await;
        assert_eq!(infos.iter().find(|i| i.id == id).unwrap().status, SubagentStatus::Killed);
    }

    #[tokio::test]
    async fn free_removes_record_and_output_file() {
        let dir = tempdir().unwrap();
        let manager = SubagentManager::new(8, 1, 0, dir.path().to_path_buf());
        let id = manager.spawn("freed", "echo bye").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        manager.poll().await;
        let path = dir.path().join(format!("subagent-{id}.log"));
        assert!(path.exists());
        manager.free(id).await;
        assert!(!path.exists());
    }
}
