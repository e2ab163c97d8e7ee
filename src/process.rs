//! Structured subprocess invocation
//!
//! Commands are always explicit argument vectors; nothing in this crate
//! builds a command line by string concatenation.

use thiserror::Error;
use tokio::process::Command;

use crate::config::PrivilegeMode;

/// One external command: program, arguments, and whether it needs root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub privileged: bool,
}

impl CommandSpec {
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            privileged: false,
        }
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    /// Shell-quoted rendering, used for logs and failure reporting only.
    pub fn display(&self) -> String {
        let mut tokens = Vec::with_capacity(self.args.len() + 1);
        tokens.push(self.program.clone());
        tokens.extend(self.args.iter().cloned());
        shell_words::join(&tokens)
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Compact context for a failed step: the last stderr line when there is
    /// one, the exit code otherwise.
    pub fn failure_detail(&self) -> String {
        match self.stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => format!("{} (exit code {})", line.trim(), self.exit_code),
            None => format!("exit code {}", self.exit_code),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

impl ProcessError {
    /// True when the program itself was not found on PATH.
    pub fn is_not_found(&self) -> bool {
        match self {
            ProcessError::Spawn { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
        }
    }
}

/// Runs commands, applying the configured privilege policy.
#[derive(Debug, Clone)]
pub struct Runner {
    privilege: PrivilegeMode,
}

impl Runner {
    pub fn new(privilege: PrivilegeMode) -> Self {
        Self { privilege }
    }

    fn effective(&self, spec: &CommandSpec) -> (String, Vec<String>) {
        if spec.privileged && self.privilege == PrivilegeMode::Sudo {
            let mut args = Vec::with_capacity(spec.args.len() + 2);
            args.push("-n".to_string());
            args.push(spec.program.clone());
            args.extend(spec.args.iter().cloned());
            ("sudo".to_string(), args)
        } else {
            (spec.program.clone(), spec.args.clone())
        }
    }

    /// Execute a command to completion, capturing exit status and output.
    /// A non-zero exit is not an error here; callers decide what it means.
    pub async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        let (program, args) = self.effective(spec);
        tracing::debug!(command = %spec.display(), privileged = spec.privileged, "running command");

        let output = Command::new(&program)
            .args(&args)
            .output()
            .await
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.success() {
            tracing::debug!(
                command = %spec.display(),
                exit_code = result.exit_code,
                "command exited non-zero"
            );
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sudo_mode_prefixes_privileged_commands() {
        let runner = Runner::new(PrivilegeMode::Sudo);
        let spec = CommandSpec::new("apt-get", ["update"]).privileged();
        let (program, args) = runner.effective(&spec);
        assert_eq!(program, "sudo");
        assert_eq!(args, vec!["-n", "apt-get", "update"]);
    }

    #[test]
    fn root_mode_never_prefixes() {
        let runner = Runner::new(PrivilegeMode::Root);
        let spec = CommandSpec::new("apt-get", ["update"]).privileged();
        let (program, args) = runner.effective(&spec);
        assert_eq!(program, "apt-get");
        assert_eq!(args, vec!["update"]);
    }

    #[test]
    fn unprivileged_commands_run_as_is_under_sudo_mode() {
        let runner = Runner::new(PrivilegeMode::Sudo);
        let spec = CommandSpec::new("git", ["--version"]);
        let (program, args) = runner.effective(&spec);
        assert_eq!(program, "git");
        assert_eq!(args, vec!["--version"]);
    }

    #[tokio::test]
    async fn captures_exit_code_and_output() {
        let runner = Runner::new(PrivilegeMode::Root);
        let out = runner
            .run(&CommandSpec::new("echo", ["hello"]))
            .await
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");

        let out = runner.run(&CommandSpec::new("false", [] as [&str; 0])).await.unwrap();
        assert!(!out.success());
    }

    #[tokio::test]
    async fn missing_binary_reports_not_found() {
        let runner = Runner::new(PrivilegeMode::Root);
        let err = runner
            .run(&CommandSpec::new("rigup-no-such-binary", [] as [&str; 0]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
