//! Agent Memory: a file-backed key-value store keyed by
//! `(project_id, scope, key)`, consumed by the prompt assembler's
//! System Context / Project Context sections (`spec.md` §6).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::AgentError;

/// Which audience a memory entry is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryScope {
    System,
    User,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryDocument {
    entries: BTreeMap<String, String>,
}

impl MemoryDocument {
    fn compound_key(scope: MemoryScope, key: &str) -> String {
        let scope_tag = match scope {
            MemoryScope::System => "system",
            MemoryScope::User => "user",
        };
        format!("{scope_tag}:{key}")
    }
}

/// One project's memory document, persisted as a single JSON file under
/// the workspace's memory directory.
pub struct MemoryStore {
    root: PathBuf,
    documents: Mutex<BTreeMap<String, MemoryDocument>>,
}

impl MemoryStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            documents: Mutex::new(BTreeMap::new()),
        }
    }

    fn document_path(&self, project_id: &str) -> PathBuf {
        self.root.join(format!("{project_id}.json"))
    }

    async fn load_document(&self, project_id: &str) -> MemoryDocument {
        let path = self.document_path(project_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).unwrap_or_default(),
            Err(_) => MemoryDocument::default(),
        }
    }

    async fn persist(&self, project_id: &str, document: &MemoryDocument) -> Result<(), AgentError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AgentError::Internal(format!("failed to prepare memory dir: {e}")))?;
        let text = serde_json::to_string_pretty(document)
            .map_err(|e| AgentError::Internal(format!("failed to serialise memory: {e}")))?;
        tokio::fs::write(self.document_path(project_id), text)
            .await
            .map_err(|e| AgentError::Internal(format!("failed to persist memory: {e}")))
    }

    /// Writes through the carved-out path `spec.md` §4.2 describes: memory
    /// writes at Observe are append-only (an existing key under the same
    /// scope may not be overwritten); at Workspace and above, writes are
    /// unrestricted. Bypasses the executor's write-cooldown pipeline
    /// entirely, since memory is not a filesystem write tool.
    pub async fn set(
        &self,
        project_id: &str,
        scope: MemoryScope,
        key: &str,
        value: &str,
        append_only: bool,
    ) -> Result<(), AgentError> {
        let mut documents = self.documents.lock().await;
        let document = if let Some(doc) = documents.get(project_id) {
            MemoryDocument {
                entries: doc.entries.clone(),
            }
        } else {
            self.load_document(project_id).await
        };
        let mut document = document;
        let compound = MemoryDocument::compound_key(scope, key);
        if append_only && document.entries.contains_key(&compound) {
            return Err(AgentError::Internal(format!(
                "memory key '{key}' already exists and append-only writes are in effect"
            )));
        }
        document.entries.insert(compound, value.to_string());
        self.persist(project_id, &document).await?;
        documents.insert(project_id.to_string(), document);
        Ok(())
    }

    pub async fn get(&self, project_id: &str, scope: MemoryScope, key: &str) -> Option<String> {
        let mut documents = self.documents.lock().await;
        if !documents.contains_key(project_id) {
            let loaded = self.load_document(project_id).await;
            documents.insert(project_id.to_string(), loaded);
        }
        documents
            .get(project_id)
            .and_then(|doc| doc.entries.get(&MemoryDocument::compound_key(scope, key)))
            .cloned()
    }

    /// Renders every entry under `scope` as `key: value` lines, sorted by
    /// key, for inclusion in a prompt section.
    pub async fn render_scope(&self, project_id: &str, scope: MemoryScope) -> String {
        let mut documents = self.documents.lock().await;
        if !documents.contains_key(project_id) {
            let loaded = self.load_document(project_id).await;
            documents.insert(project_id.to_string(), loaded);
        }
        let prefix = match scope {
            MemoryScope::System => "system:",
            MemoryScope::User => "user:",
        };
        documents
            .get(project_id)
            .map(|doc| {
                doc.entries
                    .iter()
                    .filter_map(|(k, v)| k.strip_prefix(prefix).map(|bare| format!("{bare}: {v}")))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    }
}

/// Whether `append_only` should be forced for a given autonomy level, per
/// `spec.md` §4.2's carve-out.
pub fn append_only_for(level: tasksmith_config::AutonomyLevel) -> bool {
    level == tasksmith_config::AutonomyLevel::Observe
}

pub fn memory_dir_under(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".tasksmith").join("memory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(dir.path().to_path_buf());
        store.set("proj", MemoryScope::User, "focus", "refactor auth", false).await.unwrap();
        let value = store.get("proj", MemoryScope::User, "focus").await;
        assert_eq!(value.as_deref(), Some("refactor auth"));
    }

    #[tokio::test]
    async fn append_only_rejects_overwrite() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(dir.path().to_path_buf());
        store.set("proj", MemoryScope::System, "note", "first", true).await.unwrap();
        let result = store.set("proj", MemoryScope::System, "note", "second", true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unrestricted_write_overwrites_existing_key() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(dir.path().to_path_buf());
        store.set("proj", MemoryScope::System, "note", "first", false).await.unwrap();
        store.set("proj", MemoryScope::System, "note", "second", false).await.unwrap();
        let value = store.get("proj", MemoryScope::System, "note").await;
        assert_eq!(value.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn render_scope_lists_only_matching_scope() {
        let dir = tempdir().unwrap();
        let store = MemoryStore::new(dir.path().to_path_buf());
        store.set("proj", MemoryScope::User, "a", "1", false).await.unwrap();
        store.set("proj", MemoryScope::System, "b", "2", false).await.unwrap();
        let rendered = store.render_scope("proj", MemoryScope::User).await;
        assert_eq!(rendered, "a: 1");
    }

    #[tokio::test]
    async fn persists_across_store_instances() {
        let dir = tempdir().unwrap();
        {
            let store = MemoryStore::new(dir.path().to_path_buf());
            store.set("proj", MemoryScope::User, "k", "v", false).await.unwrap();
        }
        let store = MemoryStore::new(dir.path().to_path_buf());
        let value = store.get("proj", MemoryScope::User, "k").await;
        assert_eq!(value.as_deref(), Some("v"));
    }
}
