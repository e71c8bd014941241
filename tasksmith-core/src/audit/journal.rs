//! Rotating, append-only audit journal backed by a bounded background
//! writer task, per `spec.md` §5: "the audit journal's file I/O may be
//! performed on a background writer with a bounded in-memory queue" and
//! §9: "never perform synchronous I/O inside the policy mutex."

use std::io::Write;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::error;

use crate::error::AgentError;

use super::record::ToolCallAuditRecord;

const CHANNEL_CAPACITY: usize = 256;

/// Handle to the audit journal. Cloning shares the same background writer
/// and underlying file.
#[derive(Clone)]
pub struct AuditJournal {
    sender: mpsc::Sender<String>,
}

impl AuditJournal {
    /// Open (or create) the journal at `path` and spawn its background
    /// writer, rotating at `rotation_bytes` and keeping `keep` previous
    /// files.
    pub fn spawn(path: PathBuf, rotation_bytes: u64, keep: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<String>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut writer = JournalWriter::new(path, rotation_bytes, keep);
            while let Some(line) = receiver.recv().await {
                if let Err(err) = writer.write_line(&line) {
                    error!(%err, "audit journal write failed");
                }
            }
        });

        Self { sender }
    }

    /// Enqueue a record for the background writer. Returns
    /// [`AgentError::AuditWriteFailed`] only if the channel itself is
    /// closed (writer task died), not for ordinary file I/O errors, which
    /// are logged by the writer instead so a transient disk issue never
    /// blocks tool execution.
    pub async fn record(&self, record: &ToolCallAuditRecord) -> Result<(), AgentError> {
        self.sender
            .send(record.to_line())
            .await
            .map_err(|_| AgentError::AuditWriteFailed("journal writer task is gone".to_string()))
    }

    /// Non-blocking variant for call sites that must not await (e.g. a
    /// synchronous stream callback, per `spec.md` §5's reentrancy rule).
    pub fn record_nowait(&self, record: &ToolCallAuditRecord) -> Result<(), AgentError> {
        self.sender
            .try_send(record.to_line())
            .map_err(|err| AgentError::AuditWriteFailed(err.to_string()))
    }
}

struct JournalWriter {
    path: PathBuf,
    rotation_bytes: u64,
    keep: usize,
    current_size: u64,
}

impl JournalWriter {
    fn new(path: PathBuf, rotation_bytes: u64, keep: usize) -> Self {
        let current_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self {
            path,
            rotation_bytes,
            keep,
            current_size,
        }
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        if self.current_size >= self.rotation_bytes {
            self.rotate()?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        self.current_size += line.len() as u64 + 1;
        Ok(())
    }

    /// Shift `journal.log.N` -> `journal.log.N+1` up to `keep`, drop the
    /// oldest, then move the current file to `journal.log.1`.
    fn rotate(&mut self) -> std::io::Result<()> {
        for index in (1..self.keep).rev() {
            let from = rotated_path(&self.path, index);
            let to = rotated_path(&self.path, index + 1);
            if from.exists() {
                std::fs::rename(&from, &to)?;
            }
        }
        let first = rotated_path(&self.path, 1);
        if self.path.exists() {
            std::fs::rename(&self.path, &first)?;
        }
        self.current_size = 0;
        Ok(())
    }
}

fn rotated_path(base: &Path, index: usize) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}
