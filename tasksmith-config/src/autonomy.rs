//! Autonomy levels and the capability matrix they imply.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ordered capability tier granted to the model.
///
/// Ordering matters: `spec.md`'s capability-monotonicity invariant requires
/// that anything permitted at a lower level stays permitted at every level
/// above it, so this type derives `PartialOrd`/`Ord` off declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    None,
    Observe,
    Workspace,
    Home,
    Full,
}

impl AutonomyLevel {
    /// Capability set implied by this level, per `spec.md` §3's table.
    pub fn capabilities(self) -> Capabilities {
        match self {
            AutonomyLevel::None => Capabilities {
                read: false,
                write: false,
                shell: ShellAccess::None,
                git: false,
                write_root: WriteRoot::None,
            },
            AutonomyLevel::Observe => Capabilities {
                read: true,
                write: false,
                shell: ShellAccess::AllowlistOnly,
                git: false,
                write_root: WriteRoot::None,
            },
            AutonomyLevel::Workspace => Capabilities {
                read: true,
                write: true,
                shell: ShellAccess::Full,
                git: true,
                write_root: WriteRoot::Workspace,
            },
            AutonomyLevel::Home => Capabilities {
                read: true,
                write: true,
                shell: ShellAccess::Full,
                git: true,
                write_root: WriteRoot::Home,
            },
            AutonomyLevel::Full => Capabilities {
                read: true,
                write: true,
                shell: ShellAccess::Full,
                git: true,
                write_root: WriteRoot::Anywhere,
            },
        }
    }
}

/// Shell access mode implied by an [`AutonomyLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAccess {
    None,
    AllowlistOnly,
    Full,
}

/// Where write tools are rooted at a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRoot {
    None,
    Workspace,
    Home,
    Anywhere,
}

/// The capability set a level implies; see `spec.md` §3's capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub read: bool,
    pub write: bool,
    pub shell: ShellAccess,
    pub git: bool,
    pub write_root: WriteRoot,
}

/// The active policy bundle consulted by the capability, rate, and
/// write-cooldown gates (`spec.md` §4.1 stages 2, 3, 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyConfig {
    pub level: AutonomyLevel,
    pub max_calls_per_prompt: u32,
    pub max_calls_per_session: u32,
    pub max_session_write_bytes: u64,
    pub max_session_file_creates: u32,
    #[serde(with = "duration_millis")]
    pub write_cooldown: Duration,
    #[serde(with = "duration_secs")]
    pub shell_timeout: Duration,
    pub confirm_destructive: bool,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            level: AutonomyLevel::Observe,
            max_calls_per_prompt: 5,
            max_calls_per_session: 50,
            max_session_write_bytes: 1024 * 1024,
            max_session_file_creates: 20,
            write_cooldown: Duration::from_millis(500),
            shell_timeout: Duration::from_secs(30),
            confirm_destructive: true,
        }
    }
}

impl AutonomyConfig {
    pub fn new(level: AutonomyLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.level.capabilities()
    }

    /// Resolve the absolute write root for this level, given the workspace
    /// root and the user's home directory. Returns `None` for
    /// [`AutonomyLevel::None`] and [`AutonomyLevel::Observe`], where no
    /// write tools are registered at all.
    pub fn write_root(&self, workspace_root: &PathBuf, home_dir: &PathBuf) -> Option<PathBuf> {
        match self.capabilities().write_root {
            WriteRoot::None => None,
            WriteRoot::Workspace => Some(workspace_root.clone()),
            WriteRoot::Home => Some(home_dir.clone()),
            WriteRoot::Anywhere => Some(PathBuf::from("/")),
        }
    }
}

/// Thread-safe holder for the active [`AutonomyConfig`], supporting the
/// "new instance, old one discarded atomically" session-override model
/// from `spec.md` §3.
#[derive(Clone)]
pub struct AutonomyHandle {
    inner: Arc<RwLock<AutonomyConfig>>,
}

impl AutonomyHandle {
    pub fn new(config: AutonomyConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn get(&self) -> AutonomyConfig {
        self.inner
            .read()
            .expect("autonomy lock poisoned")
            .clone()
    }

    /// Atomically swap in a new config, returning the previous one.
    pub fn supersede(&self, new_config: AutonomyConfig) -> AutonomyConfig {
        let mut guard = self.inner.write().expect("autonomy lock poisoned");
        std::mem::replace(&mut *guard, new_config)
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_matches_table() {
        assert!(AutonomyLevel::None < AutonomyLevel::Observe);
        assert!(AutonomyLevel::Observe < AutonomyLevel::Workspace);
        assert!(AutonomyLevel::Workspace < AutonomyLevel::Home);
        assert!(AutonomyLevel::Home < AutonomyLevel::Full);
    }

    #[test]
    fn capability_monotonicity_for_read() {
        // Everything from Observe upward can read; None cannot.
        assert!(!AutonomyLevel::None.capabilities().read);
        for level in [
            AutonomyLevel::Observe,
            AutonomyLevel::Workspace,
            AutonomyLevel::Home,
            AutonomyLevel::Full,
        ] {
            assert!(level.capabilities().read);
        }
    }

    #[test]
    fn capability_monotonicity_for_write() {
        for level in [AutonomyLevel::None, AutonomyLevel::Observe] {
            assert!(!level.capabilities().write);
        }
        for level in [AutonomyLevel::Workspace, AutonomyLevel::Home, AutonomyLevel::Full] {
            assert!(level.capabilities().write);
        }
    }

    #[test]
    fn supersede_returns_previous_and_swaps_atomically() {
        let handle = AutonomyHandle::new(AutonomyConfig::new(AutonomyLevel::Observe));
        let previous = handle.supersede(AutonomyConfig::new(AutonomyLevel::Full));
        assert_eq!(previous.level, AutonomyLevel::Observe);
        assert_eq!(handle.get().level, AutonomyLevel::Full);
    }

    #[test]
    fn default_budgets_match_spec() {
        let config = AutonomyConfig::default();
        assert_eq!(config.max_calls_per_prompt, 5);
        assert_eq!(config.max_calls_per_session, 50);
        assert_eq!(config.max_session_write_bytes, 1024 * 1024);
        assert_eq!(config.max_session_file_creates, 20);
        assert_eq!(config.write_cooldown, Duration::from_millis(500));
        assert_eq!(config.shell_timeout, Duration::from_secs(30));
    }
}
