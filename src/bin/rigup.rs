use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use rigup::tools::{Category, Presence, ToolCatalog};
use rigup::{Executor, ExecutorConfig, InstallRequest, PrivilegeMode, StatusReporter};

#[derive(Parser)]
#[command(name = "rigup")]
#[command(about = "Idempotent developer workstation provisioning")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored status output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install tools, skipping anything already present
    Install {
        /// Tools to install, in order
        tools: Vec<String>,

        /// Install every tool in a category
        #[arg(short, long, value_enum)]
        category: Option<Category>,

        /// Pin a version for a single requested tool; `latest` resolves
        /// the tool's release metadata
        #[arg(long)]
        pin: Option<String>,

        /// Pre-resolved sub-choice as tool=option (e.g. zsh=oh-my-zsh)
        #[arg(long)]
        choice: Vec<String>,

        /// Mark tools as declined; they are reported as skipped
        #[arg(long)]
        decline: Vec<String>,

        /// Assume the process already runs as root instead of using sudo
        #[arg(long)]
        as_root: bool,

        /// Append-only action log path (default: ~/.rigup.log)
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Print the run report as JSON after the summary
        #[arg(long)]
        json: bool,
    },

    /// Report which catalog tools are installed; reads state, never mutates
    Status {
        /// Limit to one category
        #[arg(short, long, value_enum)]
        category: Option<Category>,
    },

    /// List the tool catalog
    List {
        /// Limit to one category
        #[arg(short, long, value_enum)]
        category: Option<Category>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Install {
            tools,
            category,
            pin,
            choice,
            decline,
            as_root,
            log_file,
            json,
        } => {
            run_install(
                tools, category, pin, choice, decline, as_root, log_file, json,
                !cli.no_color,
            )
            .await
        }
        Commands::Status { category } => run_status(category).await,
        Commands::List { category } => run_list(category),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_install(
    tools: Vec<String>,
    category: Option<Category>,
    pin: Option<String>,
    choice: Vec<String>,
    decline: Vec<String>,
    as_root: bool,
    log_file: Option<PathBuf>,
    json: bool,
    color: bool,
) -> Result<()> {
    let catalog = ToolCatalog::builtin()?;

    let mut names: Vec<String> = Vec::new();
    if let Some(category) = category {
        names.extend(catalog.in_category(category).map(|spec| spec.name.clone()));
    }
    for tool in tools {
        if !names.contains(&tool) {
            names.push(tool);
        }
    }
    if names.is_empty() {
        bail!("nothing to install: name tools or pass --category");
    }

    if pin.is_some() && names.len() != 1 {
        bail!("--pin applies to exactly one requested tool");
    }

    let choices = parse_choices(&choice)?;
    let declined: HashSet<&str> = decline.iter().map(String::as_str).collect();

    let requests: Vec<InstallRequest> = names
        .iter()
        .map(|name| {
            let mut request = InstallRequest::new(name);
            if let Some(pin) = &pin {
                request = request.with_version(pin);
            }
            if let Some(option) = choices.get(name.as_str()) {
                request = request.with_choice(option);
            }
            if declined.contains(name.as_str()) {
                request = request.declined();
            }
            request
        })
        .collect();

    let config = ExecutorConfig {
        privilege: if as_root {
            PrivilegeMode::Root
        } else {
            PrivilegeMode::Sudo
        },
        audit_log: log_file.or_else(|| dirs::home_dir().map(|home| home.join(".rigup.log"))),
        color,
        ..ExecutorConfig::default()
    };

    let platform = rigup::platform::resolve();
    let mut executor = Executor::new(platform, config);

    println!("Provisioning {} tool(s) on {platform}", requests.len());
    let report = executor
        .run(&catalog, &requests)
        .await
        .context("provisioning run aborted")?;

    StatusReporter::new(color).summary(&report);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_status(category: Option<Category>) -> Result<()> {
    let catalog = ToolCatalog::builtin()?;
    let platform = rigup::platform::resolve();
    let executor = Executor::new(platform, ExecutorConfig::default());

    println!("Tool status on {platform}");
    println!("=====================================");
    for spec in catalog.iter() {
        if category.is_some_and(|c| c != spec.category) {
            continue;
        }
        match executor.probe(spec).await {
            Ok(Presence::Present { version }) => match version {
                Some(version) => println!("  ✓ {} {}", spec.name, version),
                None => println!("  ✓ {}", spec.name),
            },
            Ok(Presence::Absent) => println!("  - {} (not installed)", spec.name),
            Err(error) => println!("  ? {} ({error})", spec.name),
        }
    }
    Ok(())
}

fn run_list(category: Option<Category>) -> Result<()> {
    let catalog = ToolCatalog::builtin()?;
    for group in [Category::SystemTools, Category::Python, Category::Ebpf] {
        if category.is_some_and(|c| c != group) {
            continue;
        }
        println!("{group}:");
        for spec in catalog.in_category(group) {
            println!("  {:<12} {}", spec.name, spec.summary);
            for option in &spec.options {
                println!("  {:<12}   option: {}", "", option.name);
            }
        }
        println!();
    }
    Ok(())
}

fn parse_choices(raw: &[String]) -> Result<HashMap<&str, &str>> {
    let mut choices = HashMap::new();
    for entry in raw {
        let (tool, option) = entry
            .split_once('=')
            .with_context(|| format!("invalid --choice `{entry}`, expected tool=option"))?;
        choices.insert(tool, option);
    }
    Ok(choices)
}
