//! Homebrew for macOS
//!
//! Homebrew refuses to run as root, so none of its commands are marked
//! privileged regardless of the configured privilege mode.

use async_trait::async_trait;

use crate::error::PackageManagerError;
use crate::pm::PackageManager;
use crate::process::{CommandSpec, Runner};

pub struct Brew {
    runner: Runner,
}

impl Brew {
    pub fn new(runner: Runner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl PackageManager for Brew {
    fn manager(&self) -> &'static str {
        "brew"
    }

    async fn refresh_index(&self) -> Result<(), PackageManagerError> {
        let output = self.runner.run(&CommandSpec::new("brew", ["update"])).await?;
        if output.success() {
            Ok(())
        } else {
            Err(PackageManagerError::RefreshFailed {
                manager: self.manager(),
                detail: output.failure_detail(),
            })
        }
    }

    async fn install(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<(), PackageManagerError> {
        // brew pins through versioned formulae, `name@version`
        let package = match version {
            Some(version) => format!("{name}@{version}"),
            None => name.to_string(),
        };
        let output = self
            .runner
            .run(&CommandSpec::new("brew", ["install", &package]))
            .await?;
        if output.success() {
            Ok(())
        } else {
            Err(PackageManagerError::InstallFailed {
                manager: self.manager(),
                package,
                detail: output.failure_detail(),
            })
        }
    }

    async fn remove(&self, name: &str) -> Result<(), PackageManagerError> {
        let output = self
            .runner
            .run(&CommandSpec::new("brew", ["uninstall", name]))
            .await?;
        if output.success() {
            Ok(())
        } else {
            Err(PackageManagerError::RemovalFailed {
                manager: self.manager(),
                package: name.to_string(),
                detail: output.failure_detail(),
            })
        }
    }

    async fn installed_version(
        &self,
        name: &str,
    ) -> Result<Option<String>, PackageManagerError> {
        let output = self
            .runner
            .run(&CommandSpec::new("brew", ["list", "--versions", name]))
            .await?;
        if !output.success() {
            return Ok(None);
        }
        // output is `name version [older versions...]`
        Ok(output
            .stdout
            .split_whitespace()
            .nth(1)
            .map(str::to_string))
    }
}
