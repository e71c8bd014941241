//! Gathers the OS/kernel/host facts rendered into the prompt assembler's
//! System Context section (`spec.md` §4.5).

use std::path::Path;

/// Render a short, deterministic block of host facts: OS, architecture,
/// kernel release (Linux only, via `/proc/version`), and hostname.
pub fn gather_system_context() -> String {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    let kernel = read_kernel_release().unwrap_or_else(|| "unknown".to_string());
    let hostname = read_hostname().unwrap_or_else(|| "unknown".to_string());

    format!("os={os}\narch={arch}\nkernel={kernel}\nhostname={hostname}")
}

fn read_kernel_release() -> Option<String> {
    let text = std::fs::read_to_string(Path::new("/proc/version")).ok()?;
    text.split_whitespace().nth(2).map(str::to_string)
}

#[cfg(unix)]
fn read_hostname() -> Option<String> {
    let mut buf = vec![0u8; 256];
    let ret = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if ret != 0 {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Some(String::from_utf8_lossy(&buf[..len]).into_owned())
}

#[cfg(not(unix))]
fn read_hostname() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_block_contains_all_fields() {
        let context = gather_system_context();
        assert!(context.contains("os="));
        assert!(context.contains("arch="));
        assert!(context.contains("kernel="));
        assert!(context.contains("hostname="));
    }
}
