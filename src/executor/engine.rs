//! The install decision engine
//!
//! One tool at a time, in request order: probe, decide, act, verify. A
//! failed tool never aborts the batch; the two fatal preconditions
//! (unsupported platform when a system package is needed, failed index
//! refresh) abort the run before mutating anything further.

use chrono::Utc;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::config::ExecutorConfig;
use crate::error::{FatalError, PackageManagerError, ToolError};
use crate::executor::outcome::{InstallOutcome, RunReport, RunSummary, ToolReport};
use crate::executor::report::StatusReporter;
use crate::fetch::{FetchError, VersionFetcher};
use crate::platform::Platform;
use crate::pm::{self, PackageManager};
use crate::process::Runner;
use crate::profile::{ProfileError, ProfileWriter};
use crate::tools::{
    normalize_version, CommandTemplate, InstallMethod, Presence, RenderVars, ToolCatalog, ToolSpec,
};

/// What the caller wants done for one tool. Interactive decisions (version,
/// sub-choice, declining) are resolved before this reaches the engine.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub tool: String,
    /// `latest` resolves through the tool's release metadata source.
    pub version: Option<String>,
    pub choice: Option<String>,
    pub declined: bool,
}

impl InstallRequest {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            version: None,
            choice: None,
            declined: false,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn with_choice(mut self, choice: &str) -> Self {
        self.choice = Some(choice.to_string());
        self
    }

    pub fn declined(mut self) -> Self {
        self.declined = true;
        self
    }
}

/// Internal split between run-fatal and tool-scoped failures.
enum EnsureError {
    Fatal(FatalError),
    Tool(ToolError),
}

impl From<FatalError> for EnsureError {
    fn from(e: FatalError) -> Self {
        EnsureError::Fatal(e)
    }
}

impl From<ToolError> for EnsureError {
    fn from(e: ToolError) -> Self {
        EnsureError::Tool(e)
    }
}

impl From<PackageManagerError> for EnsureError {
    fn from(e: PackageManagerError) -> Self {
        EnsureError::Tool(e.into())
    }
}

impl From<FetchError> for EnsureError {
    fn from(e: FetchError) -> Self {
        EnsureError::Tool(e.into())
    }
}

impl From<ProfileError> for EnsureError {
    fn from(e: ProfileError) -> Self {
        EnsureError::Tool(e.into())
    }
}

pub struct Executor {
    platform: Platform,
    runner: Runner,
    pm: Option<Box<dyn PackageManager>>,
    fetcher: VersionFetcher,
    profiles: ProfileWriter,
    audit_log: Option<AuditLog>,
    reporter: StatusReporter,
    home: String,
    index_refreshed: bool,
}

impl Executor {
    pub fn new(platform: Platform, config: ExecutorConfig) -> Self {
        let runner = Runner::new(config.privilege);
        let pm = pm::for_platform(platform, runner.clone());
        let home = config
            .home_dir
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/"))
            .to_string_lossy()
            .into_owned();

        Self {
            platform,
            pm,
            fetcher: VersionFetcher::new(config.retry.clone()),
            profiles: ProfileWriter::new(config.profile_paths.clone()),
            audit_log: config.audit_log.clone().map(AuditLog::new),
            reporter: StatusReporter::new(config.color),
            home,
            index_refreshed: false,
            runner,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Process a batch of requests sequentially, one outcome per request.
    pub async fn run(
        &mut self,
        catalog: &ToolCatalog,
        requests: &[InstallRequest],
    ) -> Result<RunReport, FatalError> {
        let run_id = Uuid::new_v4().to_string();
        let started = Utc::now();
        tracing::info!(
            run_id = %run_id,
            platform = %self.platform,
            tools = requests.len(),
            "starting provisioning run"
        );

        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            let begin = Instant::now();
            let outcome = match catalog.get(&request.tool) {
                Some(spec) => self.ensure(spec, request).await?,
                None => InstallOutcome::Failed {
                    reason: ToolError::UnknownTool {
                        name: request.tool.clone(),
                    }
                    .to_string(),
                },
            };
            self.audit("outcome", &format!("{} {}", request.tool, outcome.label()));
            self.reporter.tool_complete(&request.tool, &outcome);
            outcomes.push(ToolReport {
                tool: request.tool.clone(),
                outcome,
                duration: begin.elapsed(),
            });
        }

        let summary = RunSummary::tally(&outcomes);
        tracing::info!(
            run_id = %run_id,
            present = summary.present,
            installed = summary.installed,
            failed = summary.failed,
            skipped = summary.skipped,
            "provisioning run finished"
        );

        Ok(RunReport {
            run_id,
            platform: self.platform.to_string(),
            outcomes,
            summary,
            started,
            finished: Utc::now(),
        })
    }

    /// Decide and act for a single tool. Tool-scoped failures become a
    /// `Failed` outcome; only fatal preconditions surface as errors.
    pub async fn ensure(
        &mut self,
        spec: &ToolSpec,
        request: &InstallRequest,
    ) -> Result<InstallOutcome, FatalError> {
        if request.declined {
            return Ok(InstallOutcome::Skipped {
                reason: "declined by user".to_string(),
            });
        }

        match self.try_ensure(spec, request).await {
            Ok(outcome) => Ok(outcome),
            Err(EnsureError::Tool(error)) => {
                tracing::error!(tool = %spec.name, %error, "tool provisioning failed");
                Ok(InstallOutcome::Failed {
                    reason: error.to_string(),
                })
            }
            Err(EnsureError::Fatal(fatal)) => Err(fatal),
        }
    }

    /// Presence check only; used by status queries. Never mutates.
    pub async fn probe(&self, spec: &ToolSpec) -> Result<Presence, ToolError> {
        spec.presence
            .run(&self.runner, self.vars())
            .await
            .map_err(|e| ToolError::CommandFailed {
                step: spec.presence.step_name(),
                detail: e.to_string(),
            })
    }

    async fn try_ensure(
        &mut self,
        spec: &ToolSpec,
        request: &InstallRequest,
    ) -> Result<InstallOutcome, EnsureError> {
        // `latest` is a specific version request, so it must resolve before
        // the presence comparison
        let requested = match request.version.as_deref() {
            Some("latest") => Some(self.resolve_latest(spec).await?),
            Some(version) => Some(normalize_version(version).to_string()),
            None => None,
        };

        let presence = self.probe(spec).await?;

        if let Presence::Present { version } = presence {
            match &requested {
                None => return Ok(InstallOutcome::AlreadyPresent { version }),
                Some(want) if version.as_deref() == Some(want.as_str()) => {
                    return Ok(InstallOutcome::AlreadyPresent { version });
                }
                Some(want) => {
                    // last version wins: the existing installation goes away
                    // before the requested one lands
                    tracing::info!(
                        tool = %spec.name,
                        installed = version.as_deref().unwrap_or("unknown"),
                        requested = %want,
                        "replacing installed version"
                    );
                    self.remove(spec).await?;
                }
            }
        }

        let version = match requested {
            Some(version) => Some(version),
            None => self.version_for_install(spec).await?,
        };

        self.install(spec, request, version.as_deref()).await?;

        match self.probe(spec).await? {
            Presence::Present { version: observed } => {
                self.apply_profile_lines(spec, request)?;
                let version = match observed {
                    Some(observed) => Some(observed),
                    None => self.recorded_package_version(spec).await.or(version),
                };
                Ok(InstallOutcome::Installed { version })
            }
            Presence::Absent => Err(ToolError::PresenceCheckFailed {
                tool: spec.name.clone(),
            }
            .into()),
        }
    }

    fn vars(&self) -> RenderVars<'_> {
        RenderVars {
            version: None,
            home: &self.home,
        }
    }

    fn require_pm(&self) -> Result<&dyn PackageManager, EnsureError> {
        self.pm
            .as_deref()
            .ok_or(EnsureError::Fatal(FatalError::UnsupportedPlatform {
                platform: self.platform,
            }))
    }

    /// The once-per-run index refresh, evaluated lazily so an all-present
    /// run performs no mutating action at all.
    async fn ensure_index(&mut self) -> Result<(), EnsureError> {
        if self.index_refreshed {
            return Ok(());
        }
        let pm = self.require_pm()?;
        let manager = pm.manager();
        pm.refresh_index()
            .await
            .map_err(|e| EnsureError::Fatal(FatalError::IndexRefresh(e)))?;
        self.index_refreshed = true;
        self.audit("refresh-index", manager);
        Ok(())
    }

    async fn resolve_latest(&self, spec: &ToolSpec) -> Result<String, EnsureError> {
        let url = spec
            .latest_url
            .as_deref()
            .ok_or_else(|| ToolError::NoVersionSource {
                tool: spec.name.clone(),
            })?;
        let raw = self.fetcher.latest_version(url).await?;
        Ok(normalize_version(&raw).to_string())
    }

    /// Version to substitute when none was requested: a pinned default if
    /// the spec carries one, otherwise the latest release, but only for
    /// install methods that reference a version at all.
    async fn version_for_install(&self, spec: &ToolSpec) -> Result<Option<String>, EnsureError> {
        if !spec.install.needs_version() {
            return Ok(None);
        }
        if let Some(default) = &spec.default_version {
            return Ok(Some(normalize_version(default).to_string()));
        }
        Ok(Some(self.resolve_latest(spec).await?))
    }

    async fn install(
        &mut self,
        spec: &ToolSpec,
        request: &InstallRequest,
        version: Option<&str>,
    ) -> Result<(), EnsureError> {
        match &spec.install {
            InstallMethod::SystemPackage(names) => {
                self.require_pm()?;
                let package = names
                    .for_platform(self.platform)
                    .ok_or_else(|| ToolError::NotAvailable {
                        tool: spec.name.clone(),
                        platform: self.platform,
                    })?
                    .to_string();
                self.ensure_index().await?;
                let pm = self.require_pm()?;
                pm.install(&package, version).await?;
                self.audit("install", &format!("{} via {}", spec.name, package));
            }
            InstallMethod::Steps(steps) => {
                self.run_steps(steps, version).await?;
                self.audit(
                    "install",
                    &match version {
                        Some(version) => format!("{} {}", spec.name, version),
                        None => spec.name.clone(),
                    },
                );
            }
        }

        if let Some(choice) = &request.choice {
            let option = spec.option(choice).ok_or_else(|| ToolError::UnknownChoice {
                tool: spec.name.clone(),
                choice: choice.clone(),
            })?;
            self.run_steps(&option.steps, version).await?;
            self.audit("configure", &format!("{} option {}", spec.name, option.name));
        }

        Ok(())
    }

    async fn remove(&mut self, spec: &ToolSpec) -> Result<(), EnsureError> {
        match &spec.install {
            InstallMethod::SystemPackage(names) => {
                let pm = self.require_pm()?;
                let package = names
                    .for_platform(self.platform)
                    .ok_or_else(|| ToolError::NotAvailable {
                        tool: spec.name.clone(),
                        platform: self.platform,
                    })?;
                pm.remove(package).await?;
            }
            InstallMethod::Steps(_) => {
                if spec.uninstall.is_empty() {
                    tracing::debug!(
                        tool = %spec.name,
                        "no uninstall steps, installing over the existing version"
                    );
                    return Ok(());
                }
                self.run_steps(&spec.uninstall, None).await?;
            }
        }
        self.audit("remove", &spec.name);
        Ok(())
    }

    async fn run_steps(
        &self,
        steps: &[CommandTemplate],
        version: Option<&str>,
    ) -> Result<(), EnsureError> {
        for step in steps {
            let command = step.render(RenderVars {
                version,
                home: &self.home,
            });
            let output = self
                .runner
                .run(&command)
                .await
                .map_err(|e| ToolError::CommandFailed {
                    step: step.display(),
                    detail: e.to_string(),
                })?;
            if !output.success() {
                return Err(ToolError::CommandFailed {
                    step: step.display(),
                    detail: output.failure_detail(),
                }
                .into());
            }
        }
        Ok(())
    }

    fn apply_profile_lines(
        &self,
        spec: &ToolSpec,
        request: &InstallRequest,
    ) -> Result<(), EnsureError> {
        let choice_lines = request
            .choice
            .as_deref()
            .and_then(|choice| spec.option(choice))
            .map(|option| option.profile_lines.as_slice())
            .unwrap_or_default();

        for line in spec.profile_lines.iter().chain(choice_lines) {
            if self.profiles.ensure_line(line)? {
                self.audit("profile-append", line);
            }
        }
        Ok(())
    }

    async fn recorded_package_version(&self, spec: &ToolSpec) -> Option<String> {
        let InstallMethod::SystemPackage(names) = &spec.install else {
            return None;
        };
        let pm = self.pm.as_deref()?;
        let package = names.for_platform(self.platform)?;
        pm.installed_version(package)
            .await
            .ok()
            .flatten()
            .map(|v| normalize_version(&v).to_string())
    }

    fn audit(&self, action: &str, details: &str) {
        if let Some(log) = &self.audit_log {
            log.record(action, details);
        }
    }
}
