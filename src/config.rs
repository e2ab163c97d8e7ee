//! Executor configuration

use std::path::PathBuf;
use std::time::Duration;

/// Privilege elevation policy, applied uniformly to privileged commands.
///
/// One decision for the whole run: either privileged commands are prefixed
/// with `sudo -n`, or the process is assumed to already run as root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeMode {
    Sudo,
    Root,
}

/// Bounded retry with fixed backoff for network-dependent steps.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Configuration for the install executor.
///
/// Everything the engine needs is passed in here explicitly; there is no
/// process-wide state.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub privilege: PrivilegeMode,
    pub retry: RetryPolicy,
    /// Append-only action log. `None` disables audit logging.
    pub audit_log: Option<PathBuf>,
    /// Shell profile files that receive idempotent environment appends.
    pub profile_paths: Vec<PathBuf>,
    /// Home directory used for `{home}` template substitution.
    /// Resolved from the environment when `None`.
    pub home_dir: Option<PathBuf>,
    pub color: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            privilege: PrivilegeMode::Sudo,
            retry: RetryPolicy::default(),
            audit_log: None,
            profile_paths: crate::profile::ProfileWriter::default_paths(),
            home_dir: None,
            color: true,
        }
    }
}
