//! Error kinds for provisioning runs
//!
//! Two families: `FatalError` aborts the whole run, `ToolError` is scoped to
//! the single tool being processed and is captured into that tool's outcome.

use thiserror::Error;

use crate::fetch::FetchError;
use crate::platform::Platform;
use crate::process::ProcessError;
use crate::profile::ProfileError;

/// Errors fatal to an entire run.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("no supported package manager on this host (platform: {platform})")]
    UnsupportedPlatform { platform: Platform },

    #[error("package index refresh failed: {0}")]
    IndexRefresh(#[source] PackageManagerError),
}

/// Errors scoped to one tool. Never abort the batch; they become that
/// tool's `Failed` outcome.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    #[error("unknown choice {choice:?} for {tool}")]
    UnknownChoice { tool: String, choice: String },

    #[error("{tool} has no install method for platform {platform}")]
    NotAvailable { tool: String, platform: Platform },

    #[error("{tool} has no release metadata source to resolve a version from")]
    NoVersionSource { tool: String },

    #[error("step `{step}` failed: {detail}")]
    CommandFailed { step: String, detail: String },

    #[error("{tool} not found after install")]
    PresenceCheckFailed { tool: String },

    #[error(transparent)]
    Download(#[from] FetchError),

    #[error(transparent)]
    PackageManager(#[from] PackageManagerError),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Package manager command failures, with the manager and package named.
#[derive(Debug, Error)]
pub enum PackageManagerError {
    #[error("{manager} index refresh failed: {detail}")]
    RefreshFailed {
        manager: &'static str,
        detail: String,
    },

    #[error("{manager} failed to install {package}: {detail}")]
    InstallFailed {
        manager: &'static str,
        package: String,
        detail: String,
    },

    #[error("{manager} failed to remove {package}: {detail}")]
    RemovalFailed {
        manager: &'static str,
        package: String,
        detail: String,
    },

    #[error(transparent)]
    Process(#[from] ProcessError),
}
