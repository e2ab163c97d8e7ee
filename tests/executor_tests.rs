//! Integration tests for the install executor
//!
//! Tools here are real command sequences against a temp directory, so the
//! engine's decisions are observed end to end: probe, install, verify.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

use rigup::error::FatalError;
use rigup::tools::{
    Category, CommandTemplate, InstallMethod, PackageNames, PresenceCheck, ToolCatalog,
    ToolOption, ToolSpec,
};
use rigup::{
    Executor, ExecutorConfig, InstallOutcome, InstallRequest, Platform, PrivilegeMode, RetryPolicy,
};

fn test_config(dir: &TempDir) -> ExecutorConfig {
    ExecutorConfig {
        privilege: PrivilegeMode::Root,
        retry: RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(1),
        },
        audit_log: Some(dir.path().join("actions.log")),
        profile_paths: vec![dir.path().join(".bashrc")],
        home_dir: Some(dir.path().to_path_buf()),
        color: false,
    }
}

fn executor(dir: &TempDir) -> Executor {
    Executor::new(Platform::Unknown, test_config(dir))
}

/// A tool whose installation is a marker file in the temp dir.
fn marker_tool(dir: &Path, name: &str) -> ToolSpec {
    let marker = dir.join(format!("{name}.installed"));
    let marker = marker.display();
    ToolSpec::new(
        name,
        Category::SystemTools,
        "test tool",
        PresenceCheck::new(&format!("test -e {marker}")).unwrap(),
        InstallMethod::Steps(vec![
            CommandTemplate::parse(&format!("touch {marker}")).unwrap()
        ]),
    )
}

fn catalog_of(specs: Vec<ToolSpec>) -> ToolCatalog {
    let mut catalog = ToolCatalog::new();
    for spec in specs {
        catalog.register(spec).unwrap();
    }
    catalog
}

fn audit_lines(dir: &TempDir, action: &str) -> usize {
    let needle = format!("\t{action}\t");
    fs::read_to_string(dir.path().join("actions.log"))
        .unwrap_or_default()
        .lines()
        .filter(|line| line.contains(&needle))
        .count()
}

#[tokio::test]
async fn installs_then_reports_already_present_without_mutating_again() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog_of(vec![marker_tool(dir.path(), "alpha")]);
    let mut executor = executor(&dir);
    let requests = [InstallRequest::new("alpha")];

    let report = executor.run(&catalog, &requests).await.unwrap();
    assert!(matches!(
        report.outcomes[0].outcome,
        InstallOutcome::Installed { .. }
    ));
    assert_eq!(audit_lines(&dir, "install"), 1);

    let report = executor.run(&catalog, &requests).await.unwrap();
    assert!(matches!(
        report.outcomes[0].outcome,
        InstallOutcome::AlreadyPresent { .. }
    ));
    // the second run performed no mutating action
    assert_eq!(audit_lines(&dir, "install"), 1);
    assert!(report.success());
}

#[tokio::test]
async fn one_failing_tool_does_not_disturb_the_rest_of_the_batch() {
    let dir = TempDir::new().unwrap();
    let broken = ToolSpec::new(
        "broken",
        Category::SystemTools,
        "always fails",
        PresenceCheck::new(&format!("test -e {}/never-created", dir.path().display())).unwrap(),
        InstallMethod::Steps(vec![CommandTemplate::parse("false").unwrap()]),
    );
    let catalog = catalog_of(vec![
        marker_tool(dir.path(), "alpha"),
        broken,
        marker_tool(dir.path(), "gamma"),
    ]);
    let mut executor = executor(&dir);

    let requests = [
        InstallRequest::new("alpha"),
        InstallRequest::new("broken"),
        InstallRequest::new("gamma"),
    ];
    let report = executor.run(&catalog, &requests).await.unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert!(matches!(
        report.outcomes[0].outcome,
        InstallOutcome::Installed { .. }
    ));
    match &report.outcomes[1].outcome {
        InstallOutcome::Failed { reason } => assert!(reason.contains("false"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(
        report.outcomes[2].outcome,
        InstallOutcome::Installed { .. }
    ));
    assert_eq!(report.summary.failed, 1);
    assert!(!report.success());
}

#[tokio::test]
async fn declined_requests_are_skipped_before_any_action() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog_of(vec![marker_tool(dir.path(), "alpha")]);
    let mut executor = executor(&dir);

    let report = executor
        .run(&catalog, &[InstallRequest::new("alpha").declined()])
        .await
        .unwrap();

    assert!(matches!(
        report.outcomes[0].outcome,
        InstallOutcome::Skipped { .. }
    ));
    assert!(!dir.path().join("alpha.installed").exists());
    assert_eq!(report.summary.skipped, 1);
    assert!(report.success());
}

/// A tool whose "installed version" lives in a file, written by a fake
/// installer script so `{version}` substitution is observable.
fn versioned_tool(dir: &Path) -> ToolSpec {
    let version_file = dir.join("toolchain.version");
    let script = dir.join("fake-install.sh");
    fs::write(&script, "#!/bin/sh\nprintf 'go%s\\n' \"$1\" > \"$2\"\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    ToolSpec::new(
        "toolchain",
        Category::Ebpf,
        "fake versioned toolchain",
        PresenceCheck::new(&format!("cat {}", version_file.display())).unwrap(),
        InstallMethod::Steps(vec![CommandTemplate::parse(&format!(
            "{} {{version}} {}",
            script.display(),
            version_file.display()
        ))
        .unwrap()]),
    )
    .with_uninstall(vec![CommandTemplate::parse(&format!(
        "rm -f {}",
        version_file.display()
    ))
    .unwrap()])
    .with_default_version("1.21.3")
}

#[tokio::test]
async fn version_mismatch_removes_then_reinstalls() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog_of(vec![versioned_tool(dir.path())]);
    let mut executor = executor(&dir);

    fs::write(dir.path().join("toolchain.version"), "go1.21.3\n").unwrap();

    let report = executor
        .run(
            &catalog,
            &[InstallRequest::new("toolchain").with_version("1.21.5")],
        )
        .await
        .unwrap();

    assert_eq!(
        report.outcomes[0].outcome,
        InstallOutcome::Installed {
            version: Some("1.21.5".to_string())
        }
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("toolchain.version")).unwrap(),
        "go1.21.5\n"
    );
    assert_eq!(audit_lines(&dir, "remove"), 1);
}

#[tokio::test]
async fn equivalent_version_spellings_are_not_a_mismatch() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog_of(vec![versioned_tool(dir.path())]);
    let mut executor = executor(&dir);

    fs::write(dir.path().join("toolchain.version"), "go1.21.3\n").unwrap();

    // tag-prefixed spelling of the installed version: no removal, no install
    let report = executor
        .run(
            &catalog,
            &[InstallRequest::new("toolchain").with_version("go1.21.3")],
        )
        .await
        .unwrap();

    assert_eq!(
        report.outcomes[0].outcome,
        InstallOutcome::AlreadyPresent {
            version: Some("1.21.3".to_string())
        }
    );
    assert_eq!(audit_lines(&dir, "remove"), 0);
    assert_eq!(audit_lines(&dir, "install"), 0);
}

#[tokio::test]
async fn fresh_install_uses_the_default_version() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog_of(vec![versioned_tool(dir.path())]);
    let mut executor = executor(&dir);

    let report = executor
        .run(&catalog, &[InstallRequest::new("toolchain")])
        .await
        .unwrap();

    assert_eq!(
        report.outcomes[0].outcome,
        InstallOutcome::Installed {
            version: Some("1.21.3".to_string())
        }
    );
}

#[tokio::test]
async fn profile_lines_and_chosen_option_apply_once() {
    let dir = TempDir::new().unwrap();
    let extra_marker = dir.path().join("extra.installed");
    let spec = marker_tool(dir.path(), "shelly")
        .with_profile_line("export RIGUP_TEST=1")
        .with_option(ToolOption {
            name: "extra".to_string(),
            steps: vec![CommandTemplate::parse(&format!(
                "touch {}",
                extra_marker.display()
            ))
            .unwrap()],
            profile_lines: vec!["export RIGUP_EXTRA=1".to_string()],
        });
    let catalog = catalog_of(vec![spec]);
    let mut executor = executor(&dir);

    let requests = [InstallRequest::new("shelly").with_choice("extra")];
    let report = executor.run(&catalog, &requests).await.unwrap();
    assert!(matches!(
        report.outcomes[0].outcome,
        InstallOutcome::Installed { .. }
    ));
    assert!(extra_marker.exists());

    let rc = fs::read_to_string(dir.path().join(".bashrc")).unwrap();
    assert!(rc.contains("export RIGUP_TEST=1"));
    assert!(rc.contains("export RIGUP_EXTRA=1"));

    // second run: already present, profiles untouched
    let report = executor.run(&catalog, &requests).await.unwrap();
    assert!(matches!(
        report.outcomes[0].outcome,
        InstallOutcome::AlreadyPresent { .. }
    ));
    let rc_again = fs::read_to_string(dir.path().join(".bashrc")).unwrap();
    assert_eq!(rc, rc_again);
    assert_eq!(rc_again.matches("RIGUP_TEST").count(), 1);
}

#[tokio::test]
async fn unknown_choice_fails_only_that_tool() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog_of(vec![marker_tool(dir.path(), "alpha")]);
    let mut executor = executor(&dir);

    let report = executor
        .run(&catalog, &[InstallRequest::new("alpha").with_choice("nope")])
        .await
        .unwrap();

    match &report.outcomes[0].outcome {
        InstallOutcome::Failed { reason } => {
            assert!(reason.contains("unknown choice"), "{reason}")
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_tool_fails_and_the_summary_stays_complete() {
    let dir = TempDir::new().unwrap();
    let catalog = catalog_of(vec![marker_tool(dir.path(), "alpha")]);
    let mut executor = executor(&dir);

    let report = executor
        .run(
            &catalog,
            &[InstallRequest::new("alpha"), InstallRequest::new("ghost")],
        )
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert!(matches!(
        report.outcomes[1].outcome,
        InstallOutcome::Failed { .. }
    ));
    assert_eq!(report.summary.total, 2);
    assert_eq!(report.summary.failed, 1);
}

#[tokio::test]
async fn install_that_leaves_no_trace_is_a_presence_check_failure() {
    let dir = TempDir::new().unwrap();
    let hollow = ToolSpec::new(
        "hollow",
        Category::SystemTools,
        "install succeeds but produces nothing",
        PresenceCheck::new(&format!("test -e {}/never-created", dir.path().display())).unwrap(),
        InstallMethod::Steps(vec![CommandTemplate::parse("true").unwrap()]),
    );
    let catalog = catalog_of(vec![hollow]);
    let mut executor = executor(&dir);

    let report = executor
        .run(&catalog, &[InstallRequest::new("hollow")])
        .await
        .unwrap();

    match &report.outcomes[0].outcome {
        InstallOutcome::Failed { reason } => {
            assert!(reason.contains("not found after install"), "{reason}")
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn system_package_on_an_unknown_platform_is_fatal() {
    let dir = TempDir::new().unwrap();
    let packaged = ToolSpec::new(
        "packaged",
        Category::SystemTools,
        "needs a package manager",
        PresenceCheck::new(&format!("test -e {}/never-created", dir.path().display())).unwrap(),
        InstallMethod::SystemPackage(PackageNames::same("packaged")),
    );
    let catalog = catalog_of(vec![packaged]);
    let mut executor = executor(&dir);

    let err = executor
        .run(&catalog, &[InstallRequest::new("packaged")])
        .await
        .unwrap_err();
    assert!(matches!(err, FatalError::UnsupportedPlatform { .. }));
}
