//! Host platform detection
//!
//! The platform is resolved once at startup and read-only afterwards.
//! Detection fails closed: a host with no recognized package manager
//! resolves to `Unknown`, never an error.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RhelManager {
    Yum,
    Dnf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    DebianLike,
    RhelLike(RhelManager),
    MacHomebrew,
    Unknown,
}

impl Platform {
    /// Name of the package manager this platform uses, if any.
    pub fn package_manager_name(&self) -> Option<&'static str> {
        match self {
            Platform::DebianLike => Some("apt"),
            Platform::RhelLike(RhelManager::Dnf) => Some("dnf"),
            Platform::RhelLike(RhelManager::Yum) => Some("yum"),
            Platform::MacHomebrew => Some("brew"),
            Platform::Unknown => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::DebianLike => write!(f, "debian-like (apt)"),
            Platform::RhelLike(RhelManager::Dnf) => write!(f, "rhel-like (dnf)"),
            Platform::RhelLike(RhelManager::Yum) => write!(f, "rhel-like (yum)"),
            Platform::MacHomebrew => write!(f, "macos (homebrew)"),
            Platform::Unknown => write!(f, "unknown"),
        }
    }
}

/// Host inspection points used by detection, injectable for tests.
pub trait HostProbe {
    fn is_macos(&self) -> bool;
    fn os_release(&self) -> Option<String>;
    fn binary_on_path(&self, name: &str) -> bool;
}

/// Probe backed by the running host.
pub struct SystemProbe;

impl HostProbe for SystemProbe {
    fn is_macos(&self) -> bool {
        cfg!(target_os = "macos")
    }

    fn os_release(&self) -> Option<String> {
        std::fs::read_to_string("/etc/os-release").ok()
    }

    fn binary_on_path(&self, name: &str) -> bool {
        which::which(name).is_ok()
    }
}

/// Resolve the platform of the running host.
pub fn resolve() -> Platform {
    let platform = resolve_from(&SystemProbe);
    tracing::info!(%platform, "resolved host platform");
    platform
}

/// Detection core: a pure function of the probed environment.
///
/// Order: OS marker first, then `/etc/os-release` identifiers, then
/// package-manager binaries on PATH. `dnf` wins over `yum` when both exist.
pub fn resolve_from(probe: &dyn HostProbe) -> Platform {
    if probe.is_macos() {
        return if probe.binary_on_path("brew") {
            Platform::MacHomebrew
        } else {
            Platform::Unknown
        };
    }

    if let Some(contents) = probe.os_release() {
        if os_release_matches(&contents, &["debian", "ubuntu"]) {
            return Platform::DebianLike;
        }
        if os_release_matches(&contents, &["rhel", "redhat", "centos", "fedora", "rocky", "almalinux"]) {
            return Platform::RhelLike(preferred_rhel_manager(probe));
        }
    }

    // os-release absent or inconclusive, fall back to binaries on PATH
    if probe.binary_on_path("apt-get") {
        return Platform::DebianLike;
    }
    if probe.binary_on_path("dnf") || probe.binary_on_path("yum") {
        return Platform::RhelLike(preferred_rhel_manager(probe));
    }

    Platform::Unknown
}

fn preferred_rhel_manager(probe: &dyn HostProbe) -> RhelManager {
    if probe.binary_on_path("dnf") {
        RhelManager::Dnf
    } else {
        RhelManager::Yum
    }
}

/// Match the `ID=` and `ID_LIKE=` fields against known identifiers.
fn os_release_matches(contents: &str, ids: &[&str]) -> bool {
    contents
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("ID=")
                .or_else(|| line.strip_prefix("ID_LIKE="))
        })
        .flat_map(|value| value.trim_matches('"').split_whitespace())
        .any(|token| ids.contains(&token))
}
