//! Kernel sandbox applied to every shell child, per `spec.md` §4.3.
//!
//! Two independent restrictions are applied from a single entry point
//! called just before `exec` in the child: a filesystem restriction (what
//! roots may be opened for write) and a syscall filter (a fixed deny list,
//! regardless of autonomy level). Each restriction is modeled as its own
//! trait so a platform lacking the underlying kernel mechanism can report
//! `Unavailable` and let the caller decide whether to downgrade, matching
//! the redesign note in `spec.md` §9.

mod filesystem;
mod manager;
mod syscalls;

pub use filesystem::{FilesystemRestriction, LandlockRestriction, is_under_any_root};
pub use manager::{SandboxCapabilities, SandboxManager};
pub use syscalls::{BLOCKED_SYSCALLS, SeccompSyscallFilter, SyscallFilter};

/// Whether a sandbox mechanism is usable on the current host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
}
