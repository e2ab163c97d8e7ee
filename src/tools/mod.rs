//! Tool descriptors and the catalog
//!
//! A `ToolSpec` describes how to check for and install one tool across
//! platforms. The presence check is mandatory by construction; a tool
//! without one could not participate in idempotent skip logic.

use clap::ValueEnum;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::platform::Platform;
use crate::process::{CommandSpec, ProcessError, Runner};

pub mod catalog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    SystemTools,
    Python,
    Ebpf,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::SystemTools => write!(f, "system-tools"),
            Category::Python => write!(f, "python"),
            Category::Ebpf => write!(f, "ebpf"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid command template `{template}`: {detail}")]
    InvalidTemplate { template: String, detail: String },

    #[error("invalid version pattern `{pattern}`: {detail}")]
    InvalidPattern { pattern: String, detail: String },

    #[error("duplicate tool: {name}")]
    DuplicateTool { name: String },
}

/// Values substituted into command templates at render time.
#[derive(Debug, Clone, Copy)]
pub struct RenderVars<'a> {
    pub version: Option<&'a str>,
    pub home: &'a str,
}

/// One command in a tool's install/uninstall/probe sequence. Authored as a
/// single string, split once with shell-word rules; `{version}` and `{home}`
/// placeholders substitute per token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    argv: Vec<String>,
    privileged: bool,
}

impl CommandTemplate {
    pub fn parse(template: &str) -> Result<Self, CatalogError> {
        let argv = shell_words::split(template).map_err(|e| CatalogError::InvalidTemplate {
            template: template.to_string(),
            detail: e.to_string(),
        })?;
        if argv.is_empty() {
            return Err(CatalogError::InvalidTemplate {
                template: template.to_string(),
                detail: "empty command".to_string(),
            });
        }
        Ok(Self {
            argv,
            privileged: false,
        })
    }

    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    pub fn references_version(&self) -> bool {
        self.argv.iter().any(|token| token.contains("{version}"))
    }

    pub fn render(&self, vars: RenderVars<'_>) -> CommandSpec {
        let argv: Vec<String> = self
            .argv
            .iter()
            .map(|token| {
                let token = token.replace("{home}", vars.home);
                match vars.version {
                    Some(version) => token.replace("{version}", version),
                    None => token,
                }
            })
            .collect();
        let mut spec = CommandSpec::new(argv[0].clone(), argv[1..].to_vec());
        if self.privileged {
            spec = spec.privileged();
        }
        spec
    }

    /// Unrendered form, used as the step identity in failure reports.
    pub fn display(&self) -> String {
        shell_words::join(&self.argv)
    }
}

static DEFAULT_VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+[0-9A-Za-z.\-]*)").expect("default version pattern"));

/// Result of a presence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Present { version: Option<String> },
    Absent,
}

/// Command that reports whether a tool is installed and, ideally, its
/// version.
#[derive(Debug, Clone)]
pub struct PresenceCheck {
    probe: CommandTemplate,
    version_pattern: Option<Regex>,
}

impl PresenceCheck {
    pub fn new(template: &str) -> Result<Self, CatalogError> {
        Ok(Self {
            probe: CommandTemplate::parse(template)?,
            version_pattern: None,
        })
    }

    pub fn with_version_pattern(mut self, pattern: &str) -> Result<Self, CatalogError> {
        let regex = Regex::new(pattern).map_err(|e| CatalogError::InvalidPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })?;
        self.version_pattern = Some(regex);
        Ok(self)
    }

    pub fn step_name(&self) -> String {
        self.probe.display()
    }

    /// Run the probe. A missing probe binary means the tool is absent, not
    /// an error.
    pub async fn run(
        &self,
        runner: &Runner,
        vars: RenderVars<'_>,
    ) -> Result<Presence, ProcessError> {
        let spec = self.probe.render(RenderVars {
            version: None,
            ..vars
        });
        let output = match runner.run(&spec).await {
            Ok(output) => output,
            Err(e) if e.is_not_found() => return Ok(Presence::Absent),
            Err(e) => return Err(e),
        };

        if !output.success() {
            return Ok(Presence::Absent);
        }

        let pattern = self
            .version_pattern
            .as_ref()
            .unwrap_or(&DEFAULT_VERSION_PATTERN);
        // some tools print their version banner to stderr
        let version = pattern
            .captures(&output.stdout)
            .or_else(|| pattern.captures(&output.stderr))
            .and_then(|caps| caps.get(1))
            .map(|m| normalize_version(m.as_str()).to_string());

        Ok(Presence::Present { version })
    }
}

/// Strip known tag prefixes so equivalent version spellings compare equal
/// (`go1.21.3` and `v1.21.3` both read as `1.21.3`).
pub fn normalize_version(raw: &str) -> &str {
    let raw = raw.trim();
    for prefix in ["go", "v"] {
        if let Some(rest) = raw.strip_prefix(prefix) {
            if rest.starts_with(|c: char| c.is_ascii_digit()) {
                return rest;
            }
        }
    }
    raw
}

/// Package name per platform family. `None` means the tool cannot be
/// installed from that platform's package manager.
#[derive(Debug, Clone, Default)]
pub struct PackageNames {
    pub debian: Option<String>,
    pub rhel: Option<String>,
    pub homebrew: Option<String>,
}

impl PackageNames {
    /// The common case: the package has the same name everywhere.
    pub fn same(name: &str) -> Self {
        Self {
            debian: Some(name.to_string()),
            rhel: Some(name.to_string()),
            homebrew: Some(name.to_string()),
        }
    }

    pub fn for_platform(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::DebianLike => self.debian.as_deref(),
            Platform::RhelLike(_) => self.rhel.as_deref(),
            Platform::MacHomebrew => self.homebrew.as_deref(),
            Platform::Unknown => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum InstallMethod {
    /// Installed through the platform package manager.
    SystemPackage(PackageNames),
    /// Ordered command steps, for tools outside the package ecosystems
    /// (toolchain tarballs, git checkouts).
    Steps(Vec<CommandTemplate>),
}

impl InstallMethod {
    pub fn needs_version(&self) -> bool {
        match self {
            InstallMethod::SystemPackage(_) => false,
            InstallMethod::Steps(steps) => steps.iter().any(CommandTemplate::references_version),
        }
    }
}

/// A pre-resolved sub-choice (e.g. which zsh plugin to set up). The engine
/// never prompts; the caller supplies the chosen option name.
#[derive(Debug, Clone)]
pub struct ToolOption {
    pub name: String,
    pub steps: Vec<CommandTemplate>,
    pub profile_lines: Vec<String>,
}

/// Static descriptor of how to check for and install one tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub category: Category,
    pub summary: String,
    pub presence: PresenceCheck,
    pub install: InstallMethod,
    pub uninstall: Vec<CommandTemplate>,
    pub latest_url: Option<String>,
    pub default_version: Option<String>,
    pub profile_lines: Vec<String>,
    pub options: Vec<ToolOption>,
}

impl ToolSpec {
    pub fn new(
        name: &str,
        category: Category,
        summary: &str,
        presence: PresenceCheck,
        install: InstallMethod,
    ) -> Self {
        Self {
            name: name.to_string(),
            category,
            summary: summary.to_string(),
            presence,
            install,
            uninstall: Vec::new(),
            latest_url: None,
            default_version: None,
            profile_lines: Vec::new(),
            options: Vec::new(),
        }
    }

    pub fn with_uninstall(mut self, steps: Vec<CommandTemplate>) -> Self {
        self.uninstall = steps;
        self
    }

    pub fn with_latest_url(mut self, url: &str) -> Self {
        self.latest_url = Some(url.to_string());
        self
    }

    pub fn with_default_version(mut self, version: &str) -> Self {
        self.default_version = Some(version.to_string());
        self
    }

    pub fn with_profile_line(mut self, line: &str) -> Self {
        self.profile_lines.push(line.to_string());
        self
    }

    pub fn with_option(mut self, option: ToolOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn option(&self, name: &str) -> Option<&ToolOption> {
        self.options.iter().find(|o| o.name == name)
    }
}

/// Registry of tool descriptors, keyed by name.
pub struct ToolCatalog {
    tools: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The catalog shipped with the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        catalog::builtin()
    }

    pub fn register(&mut self, spec: ToolSpec) -> Result<(), CatalogError> {
        if self.index.contains_key(&spec.name) {
            return Err(CatalogError::DuplicateTool { name: spec.name });
        }
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(spec);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter().filter(move |t| t.category == category)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}
