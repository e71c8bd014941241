//! Composes the filesystem restriction and syscall filter into one
//! entry point, applied once per shell child just before `exec`.

use std::path::PathBuf;

use tasksmith_config::AutonomyLevel;
use tracing::warn;

use super::filesystem::{FilesystemRestriction, LandlockRestriction};
use super::syscalls::{SeccompSyscallFilter, SyscallFilter};
use super::Availability;

/// Availability of both sandbox mechanisms, probed once at agent start and
/// surfaced through a status-equivalent command (`spec.md` §4.3: "Their
/// availability is probed once at agent start and reported in the status
/// command").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxCapabilities {
    pub filesystem_restriction: Availability,
    pub syscall_filter: Availability,
}

impl SandboxCapabilities {
    pub fn fully_available(self) -> bool {
        self.filesystem_restriction == Availability::Available
            && self.syscall_filter == Availability::Available
    }
}

pub struct SandboxManager {
    filesystem: Box<dyn FilesystemRestriction>,
    syscalls: Box<dyn SyscallFilter>,
    capabilities: SandboxCapabilities,
}

impl Default for SandboxManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxManager {
    pub fn new() -> Self {
        let filesystem: Box<dyn FilesystemRestriction> = Box::new(LandlockRestriction);
        let syscalls: Box<dyn SyscallFilter> = Box::new(SeccompSyscallFilter);
        let capabilities = SandboxCapabilities {
            filesystem_restriction: filesystem.probe(),
            syscall_filter: syscalls.probe(),
        };
        Self {
            filesystem,
            syscalls,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> SandboxCapabilities {
        self.capabilities
    }

    /// Apply both restrictions in the child, just before `exec`. Neither
    /// mechanism has a real enforcement backend yet, so unavailability is
    /// advisory at every autonomy level: the command still runs, with a
    /// warning logged, rather than failing `spawn` outright.
    pub fn apply_before_exec(
        &self,
        _level: AutonomyLevel,
        readable_roots: &[PathBuf],
        writable_roots: &[PathBuf],
    ) -> Result<(), String> {
        if let Err(err) = self.filesystem.apply(readable_roots, writable_roots) {
            warn!(%err, "filesystem restriction unavailable; continuing advisory-only");
        }
        if let Err(err) = self.syscalls.install() {
            warn!(%err, "syscall filter unavailable; continuing advisory-only");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_reflect_probe_results() {
        let manager = SandboxManager::new();
        let caps = manager.capabilities();
        // Neither mechanism has a real enforcement backend yet, so both
        // probes report unavailable on every host.
        assert_eq!(caps.filesystem_restriction, Availability::Unavailable);
        assert_eq!(caps.syscall_filter, Availability::Unavailable);
        assert!(!caps.fully_available());
    }

    #[test]
    fn unavailable_mechanism_is_advisory_at_workspace_level() {
        let manager = SandboxManager::new();
        let result = manager.apply_before_exec(AutonomyLevel::Workspace, &[], &[]);
        assert!(result.is_ok());
    }

    #[test]
    fn unavailable_mechanism_is_advisory_at_full_level() {
        let manager = SandboxManager::new();
        let result = manager.apply_before_exec(AutonomyLevel::Full, &[], &[]);
        assert!(result.is_ok());
    }
}
