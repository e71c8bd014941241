//! Syscall filter: denies a fixed set of syscalls regardless of autonomy
//! level (`spec.md` §4.3). A denied child is killed if it attempts one.

use super::Availability;

/// Syscalls denied unconditionally, independent of autonomy level.
pub const BLOCKED_SYSCALLS: &[&str] = &[
    "ptrace",
    "mount",
    "umount",
    "reboot",
    "sethostname",
    "setdomainname",
    "init_module",
    "delete_module",
    "kexec_load",
    "pivot_root",
    "swapon",
    "swapoff",
];

/// A kernel-enforced syscall filter applied before `exec`.
pub trait SyscallFilter: Send + Sync {
    fn probe(&self) -> Availability;

    /// Install the filter in the current process. On success, any syscall
    /// in [`BLOCKED_SYSCALLS`] kills the process instead of returning.
    fn install(&self) -> std::io::Result<()>;
}

/// Linux seccomp-backed filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeccompSyscallFilter;

impl SyscallFilter for SeccompSyscallFilter {
    #[cfg(target_os = "linux")]
    fn probe(&self) -> Availability {
        // Installing a real BPF seccomp filter needs a syscall-number
        // table this workspace does not vendor. Report unavailable; the
        // manager treats that as advisory instead of silently no-op'ing.
        Availability::Unavailable
    }

    #[cfg(not(target_os = "linux"))]
    fn probe(&self) -> Availability {
        Availability::Unavailable
    }

    fn install(&self) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "syscall filter unavailable on this host",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_syscalls_cover_spec_list() {
        for name in [
            "ptrace",
            "mount",
            "umount",
            "reboot",
            "sethostname",
            "setdomainname",
            "init_module",
            "delete_module",
            "kexec_load",
            "pivot_root",
            "swapon",
            "swapoff",
        ] {
            assert!(BLOCKED_SYSCALLS.contains(&name));
        }
    }
}
