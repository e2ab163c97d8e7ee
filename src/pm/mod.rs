//! Package manager implementations
//!
//! One implementation per manager, selected from the resolved platform.
//! Every command is an explicit argument vector routed through the shared
//! runner; mutations are privileged, queries are not.

use async_trait::async_trait;

use crate::error::PackageManagerError;
use crate::platform::{Platform, RhelManager};
use crate::process::{CommandOutput, Runner};

#[async_trait]
pub trait PackageManager: Send + Sync {
    fn manager(&self) -> &'static str;

    /// Refresh the package index. Evaluated once per run as a precondition
    /// for any install; failure is fatal to the run.
    async fn refresh_index(&self) -> Result<(), PackageManagerError>;

    /// Install a package, optionally pinned to a version using the
    /// manager's native pin spelling.
    async fn install(&self, name: &str, version: Option<&str>)
        -> Result<(), PackageManagerError>;

    async fn remove(&self, name: &str) -> Result<(), PackageManagerError>;

    /// Version recorded by the package database, if the package is
    /// installed.
    async fn installed_version(&self, name: &str)
        -> Result<Option<String>, PackageManagerError>;
}

/// Map a platform to its package manager. `Unknown` maps to none; callers
/// must treat that as "manual" rather than guessing a command.
pub fn for_platform(platform: Platform, runner: Runner) -> Option<Box<dyn PackageManager>> {
    match platform {
        Platform::DebianLike => Some(Box::new(apt::Apt::new(runner))),
        Platform::RhelLike(RhelManager::Dnf) => Some(Box::new(dnf::Dnf::new(runner))),
        Platform::RhelLike(RhelManager::Yum) => Some(Box::new(yum::Yum::new(runner))),
        Platform::MacHomebrew => Some(Box::new(brew::Brew::new(runner))),
        Platform::Unknown => None,
    }
}

/// Trimmed stdout of a successful query, `None` for empty or failed.
fn query_stdout(output: &CommandOutput) -> Option<String> {
    if !output.success() {
        return None;
    }
    let value = output.stdout.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub mod apt;
pub mod brew;
pub mod dnf;
pub mod yum;

pub use apt::Apt;
pub use brew::Brew;
pub use dnf::Dnf;
pub use yum::Yum;
