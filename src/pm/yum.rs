//! YUM for older RHEL-family systems

use async_trait::async_trait;

use crate::error::PackageManagerError;
use crate::pm::{query_stdout, PackageManager};
use crate::process::{CommandSpec, Runner};

pub struct Yum {
    runner: Runner,
}

impl Yum {
    pub fn new(runner: Runner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl PackageManager for Yum {
    fn manager(&self) -> &'static str {
        "yum"
    }

    async fn refresh_index(&self) -> Result<(), PackageManagerError> {
        let output = self
            .runner
            .run(&CommandSpec::new("yum", ["makecache", "-y"]).privileged())
            .await?;
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
        // yum pins with `name-version`
        let package = match version {
            Some(version) => format!("{name}-{version}"),
            None => name.to_string(),
        };
        let output = self
            .runner
            .run(&CommandSpec::new("yum", ["install", "-y", &package]).privileged())
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
            .run(&CommandSpec::new("yum", ["remove", "-y", name]).privileged())
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
            .run(&CommandSpec::new(
                "rpm",
                ["-q", "--qf", "%{VERSION}", name],
            ))
            .await?;
        Ok(query_stdout(&output))
    }
}
