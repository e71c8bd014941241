//! Numeric limits and caps, gathered in one module per-concern the way the
//! teacher splits `constants::{execution, output_limits, memory, ...}`.

use serde::{Deserialize, Serialize};

/// Clamp-safe maxima so a malicious or malformed config can't disable a cap.
pub mod clamp {
    pub const MAX_READ_BYTES_CEILING: u64 = 64 * 1024 * 1024;
    pub const MAX_WRITE_BYTES_CEILING: u64 = 64 * 1024 * 1024;
    pub const MAX_SEARCH_DEPTH_CEILING: u32 = 64;
    pub const MAX_SEARCH_RESULTS_CEILING: u32 = 10_000;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    pub max_read_bytes: u64,
    pub max_write_bytes: u64,
    pub max_search_depth: u32,
    pub max_search_results: u32,
    pub max_tool_input_bytes: usize,
    pub max_tool_iterations: u32,
    pub registry_capacity: usize,
    pub subagent_pool_capacity: usize,
    pub subagent_max_depth: u32,
    pub audit_rotation_bytes: u64,
    pub audit_rotation_keep: usize,
    pub git_timeout_secs: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_read_bytes: 1024 * 1024,
            max_write_bytes: 5 * 1024 * 1024,
            max_search_depth: 10,
            max_search_results: 500,
            max_tool_input_bytes: 256 * 1024,
            max_tool_iterations: 5,
            registry_capacity: 64,
            subagent_pool_capacity: 8,
            subagent_max_depth: 1,
            audit_rotation_bytes: 2 * 1024 * 1024,
            audit_rotation_keep: 3,
            git_timeout_secs: 10,
        }
    }
}

impl Limits {
    /// Clamp all caps to safe maxima, per `spec.md` §4.4: "Caps are
    /// configurable but clamped to safe maxima."
    pub fn clamped(mut self) -> Self {
        self.max_read_bytes = self.max_read_bytes.min(clamp::MAX_READ_BYTES_CEILING);
        self.max_write_bytes = self.max_write_bytes.min(clamp::MAX_WRITE_BYTES_CEILING);
        self.max_search_depth = self.max_search_depth.min(clamp::MAX_SEARCH_DEPTH_CEILING);
        self.max_search_results = self
            .max_search_results
            .min(clamp::MAX_SEARCH_RESULTS_CEILING);
        self.max_tool_iterations = self.max_tool_iterations.min(5);
        self.registry_capacity = self.registry_capacity.min(64);
        self.subagent_pool_capacity = self.subagent_pool_capacity.min(8);
        self.subagent_max_depth = self.subagent_max_depth.min(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_caps_oversized_values() {
        let mut limits = Limits::default();
        limits.max_read_bytes = u64::MAX;
        limits.max_tool_iterations = 999;
        limits.subagent_pool_capacity = 999;
        let clamped = limits.clamped();
        assert_eq!(clamped.max_read_bytes, clamp::MAX_READ_BYTES_CEILING);
        assert_eq!(clamped.max_tool_iterations, 5);
        assert_eq!(clamped.subagent_pool_capacity, 8);
    }
}
