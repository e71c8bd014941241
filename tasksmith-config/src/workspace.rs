//! Workspace root resolution (`spec.md` §6: "resolved from an environment
//! variable with a dotfile-directory fallback").

use std::path::PathBuf;

pub const WORKSPACE_ENV_VAR: &str = "TASKSMITH_WORKSPACE";
const DOTFILE_DIR_NAME: &str = ".tasksmith";

/// Resolve the workspace root: `$TASKSMITH_WORKSPACE` if set, otherwise
/// `~/.tasksmith`.
pub fn resolve_workspace_root() -> PathBuf {
    if let Ok(value) = std::env::var(WORKSPACE_ENV_VAR) {
        if !value.trim().is_empty() {
            return PathBuf::from(value);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DOTFILE_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn env_var_overrides_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var(WORKSPACE_ENV_VAR, "/tmp/example-workspace");
        }
        assert_eq!(
            resolve_workspace_root(),
            PathBuf::from("/tmp/example-workspace")
        );
        unsafe {
            std::env::remove_var(WORKSPACE_ENV_VAR);
        }
    }

    #[test]
    fn falls_back_to_dotfile_dir() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::remove_var(WORKSPACE_ENV_VAR);
        }
        let root = resolve_workspace_root();
        assert!(root.ends_with(DOTFILE_DIR_NAME));
    }
}
