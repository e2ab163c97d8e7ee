//! Append-only action log
//!
//! One line per action: UTC timestamp, action name, details. The file is
//! never rotated or truncated here.

use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one action record. A log write failure is reported but never
    /// fails the action it records.
    pub fn record(&self, action: &str, details: &str) {
        let line = format!(
            "{}\t{}\t{}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            action,
            details
        );

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));

        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write audit log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn records_accumulate_without_truncation() {
        let dir = tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("actions.log"));

        log.record("install", "git");
        log.record("profile-append", "export FOO=1");

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("install\tgit"));
        assert!(lines[1].contains("profile-append"));

        // a second logger on the same path keeps appending
        let again = AuditLog::new(log.path().clone());
        again.record("remove", "go");
        let contents = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.lines().count(), 3);
    }
}
