//! Autonomy-driven policy: the sensitive-path blocklist and the
//! command-policy prefix engine consulted by the executor's gates 2-6.

pub mod command_policy;
pub mod sensitive_paths;

pub use command_policy::CommandPolicyEngine;
pub use sensitive_paths::SensitivePathSet;
