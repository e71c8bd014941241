//! Shared path validation for the filesystem tool suite (`spec.md` §4.4):
//! canonicalisation, NUL rejection, allowed-root containment, denied-glob
//! exclusion, and relative-path resolution against the workspace root.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::AgentError;
use crate::sandbox::is_under_any_root;

/// The roots and denied globs a [`PathGuard`] enforces, rebuilt whenever
/// the autonomy level changes (`spec.md` §4.1's `init(autonomy_config)`).
#[derive(Debug, Clone)]
pub struct PathGuard {
    workspace_root: PathBuf,
    allowed_roots: Vec<PathBuf>,
    denied_globs: Vec<Pattern>,
}

impl PathGuard {
    pub fn new(workspace_root: PathBuf, allowed_roots: Vec<PathBuf>, denied_globs: Vec<String>) -> Self {
        let denied_globs = denied_globs
            .iter()
            .filter_map(|raw| Pattern::new(raw).ok())
            .collect();
        Self {
            workspace_root,
            allowed_roots,
            denied_globs,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Resolve `input_path` (absolute or relative to the workspace root),
    /// canonicalise it, and check it against the allowed roots and denied
    /// globs. Does not require the path to exist — non-existent targets
    /// (e.g. `write_file` creating a new file) canonicalise their deepest
    /// existing ancestor instead.
    pub fn validate(&self, input_path: &str) -> Result<PathBuf, AgentError> {
        if input_path.contains('\0') {
            return Err(AgentError::PathOutsideAllowed(input_path.to_string()));
        }
        let raw = Path::new(input_path);
        let absolute = if raw.is_absolute() {
            raw.to_path_buf()
        } else {
            self.workspace_root.join(raw)
        };

        let canonical = canonicalise_best_effort(&absolute);

        if !is_under_any_root(&canonical, &self.allowed_roots) {
            return Err(AgentError::PathOutsideAllowed(canonical.display().to_string()));
        }
        let canonical_str = canonical.to_string_lossy();
        if self.denied_globs.iter().any(|pattern| pattern.matches(&canonical_str)) {
            return Err(AgentError::PathOutsideAllowed(canonical.display().to_string()));
        }
        Ok(canonical)
    }
}

/// Canonicalise `path`, walking up to the nearest existing ancestor if the
/// path itself does not exist yet, then re-appending the missing suffix.
fn canonicalise_best_effort(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }
    let mut existing = path.to_path_buf();
    let mut suffix = Vec::new();
    while !existing.exists() {
        match existing.file_name() {
            Some(name) => {
                suffix.push(name.to_os_string());
                existing = existing
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("/"));
            }
            None => break,
        }
    }
    let mut resolved = std::fs::canonicalize(&existing).unwrap_or(existing);
    for component in suffix.into_iter().rev() {
        resolved.push(component);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn relative_path_resolves_against_workspace_root() {
        let dir = tempdir().unwrap();
        let guard = PathGuard::new(dir.path().to_path_buf(), vec![dir.path().to_path_buf()], Vec::new());
        let resolved = guard.validate("notes.txt").unwrap();
        assert!(resolved.starts_with(std::fs::canonicalize(dir.path()).unwrap()));
    }

    #[test]
    fn path_outside_allowed_roots_is_rejected() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let guard = PathGuard::new(dir.path().to_path_buf(), vec![dir.path().to_path_buf()], Vec::new());
        let result = guard.validate(other.path().join("x.txt").to_str().unwrap());
        assert!(matches!(result, Err(AgentError::PathOutsideAllowed(_))));
    }

    #[test]
    fn nul_byte_is_rejected() {
        let dir = tempdir().unwrap();
        let guard = PathGuard::new(dir.path().to_path_buf(), vec![dir.path().to_path_buf()], Vec::new());
        assert!(guard.validate("bad\0path").is_err());
    }

    #[test]
    fn denied_glob_blocks_matching_path() {
        let dir = tempdir().unwrap();
        let canonical_dir = std::fs::canonicalize(dir.path()).unwrap();
        let glob_pattern = format!("{}/*.secret", canonical_dir.display());
        let guard = PathGuard::new(
            dir.path().to_path_buf(),
            vec![dir.path().to_path_buf()],
            vec![glob_pattern],
        );
        assert!(guard.validate("keys.secret").is_err());
    }
}
