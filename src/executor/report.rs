//! Human-readable status output

use crate::executor::outcome::{InstallOutcome, RunReport};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Prints the one-line status per tool as it completes, and the end-of-run
/// summary.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    color: bool,
}

impl StatusReporter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    pub fn tool_complete(&self, tool: &str, outcome: &InstallOutcome) {
        match outcome {
            InstallOutcome::AlreadyPresent { version } => {
                println!(
                    "  {} {tool} already present{}",
                    self.paint(GREEN, "✓"),
                    format_version(version)
                );
            }
            InstallOutcome::Installed { version } => {
                println!(
                    "  {} {tool} installed{}",
                    self.paint(GREEN, "✓"),
                    format_version(version)
                );
            }
            InstallOutcome::Failed { reason } => {
                println!("  {} {tool} failed: {reason}", self.paint(RED, "✗"));
            }
            InstallOutcome::Skipped { reason } => {
                println!("  {} {tool} skipped ({reason})", self.paint(YELLOW, "-"));
            }
        }
    }

    pub fn summary(&self, report: &RunReport) {
        println!();
        println!("Provisioning summary ({})", report.platform);
        println!("=====================================");
        for entry in &report.outcomes {
            self.tool_complete(&entry.tool, &entry.outcome);
        }
        println!();
        let s = &report.summary;
        println!(
            "{} tools: {} present, {} installed, {} failed, {} skipped",
            s.total, s.present, s.installed, s.failed, s.skipped
        );
        let elapsed = report.finished - report.started;
        println!("completed in {}.{:03}s", elapsed.num_seconds(), elapsed.num_milliseconds().rem_euclid(1000));
    }
}

fn format_version(version: &Option<String>) -> String {
    match version {
        Some(version) => format!(" ({version})"),
        None => String::new(),
    }
}
