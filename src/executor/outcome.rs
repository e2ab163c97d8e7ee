//! Per-tool outcomes and the run report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of attempting one tool. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstallOutcome {
    /// The presence check succeeded and no conflicting version was
    /// requested; nothing was mutated.
    AlreadyPresent { version: Option<String> },
    Installed { version: Option<String> },
    Failed { reason: String },
    Skipped { reason: String },
}

impl InstallOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, InstallOutcome::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            InstallOutcome::AlreadyPresent { .. } => "present",
            InstallOutcome::Installed { .. } => "installed",
            InstallOutcome::Failed { .. } => "failed",
            InstallOutcome::Skipped { .. } => "skipped",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolReport {
    pub tool: String,
    pub outcome: InstallOutcome,
    pub duration: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub present: usize,
    pub installed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn tally(reports: &[ToolReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };
        for report in reports {
            match report.outcome {
                InstallOutcome::AlreadyPresent { .. } => summary.present += 1,
                InstallOutcome::Installed { .. } => summary.installed += 1,
                InstallOutcome::Failed { .. } => summary.failed += 1,
                InstallOutcome::Skipped { .. } => summary.skipped += 1,
            }
        }
        summary
    }
}

/// Everything that happened in one run, in request order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub platform: String,
    pub outcomes: Vec<ToolReport>,
    pub summary: RunSummary,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.summary.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(tool: &str, outcome: InstallOutcome) -> ToolReport {
        ToolReport {
            tool: tool.to_string(),
            outcome,
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn tally_counts_every_variant() {
        let reports = vec![
            report("git", InstallOutcome::AlreadyPresent { version: Some("2.43.0".into()) }),
            report("go", InstallOutcome::Installed { version: Some("1.21.5".into()) }),
            report("jq", InstallOutcome::Failed { reason: "apt broke".into() }),
            report("zsh", InstallOutcome::Skipped { reason: "declined by user".into() }),
            report("tmux", InstallOutcome::Installed { version: None }),
        ];
        let summary = RunSummary::tally(&reports);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.present, 1);
        assert_eq!(summary.installed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn failed_outcome_fails_the_run() {
        let outcomes = vec![report("jq", InstallOutcome::Failed { reason: "x".into() })];
        let run = RunReport {
            run_id: "test".into(),
            platform: "debian-like (apt)".into(),
            summary: RunSummary::tally(&outcomes),
            outcomes,
            started: Utc::now(),
            finished: Utc::now(),
        };
        assert!(!run.success());
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(InstallOutcome::Installed {
            version: Some("1.21.5".to_string()),
        })
        .unwrap();
        assert_eq!(json["status"], "installed");
        assert_eq!(json["version"], "1.21.5");
    }
}
