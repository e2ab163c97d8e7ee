//! Built-in tool catalog
//!
//! The command strings here are external-ecosystem facts (package names,
//! download URLs, probe invocations); the engine treats them as opaque
//! templates.

use crate::tools::{
    CatalogError, Category, CommandTemplate, InstallMethod, PackageNames, PresenceCheck,
    ToolCatalog, ToolOption, ToolSpec,
};

fn package(names: PackageNames) -> InstallMethod {
    InstallMethod::SystemPackage(names)
}

fn simple_package(
    name: &str,
    category: Category,
    summary: &str,
    probe: &str,
) -> Result<ToolSpec, CatalogError> {
    Ok(ToolSpec::new(
        name,
        category,
        summary,
        PresenceCheck::new(probe)?,
        package(PackageNames::same(name)),
    ))
}

pub fn builtin() -> Result<ToolCatalog, CatalogError> {
    let mut catalog = ToolCatalog::new();

    // -- system tools ------------------------------------------------------

    catalog.register(simple_package(
        "git",
        Category::SystemTools,
        "Distributed version control",
        "git --version",
    )?)?;

    catalog.register(simple_package(
        "curl",
        Category::SystemTools,
        "URL transfer client",
        "curl --version",
    )?)?;

    catalog.register(simple_package(
        "wget",
        Category::SystemTools,
        "Non-interactive network downloader",
        "wget --version",
    )?)?;

    catalog.register(simple_package(
        "jq",
        Category::SystemTools,
        "Command-line JSON processor",
        "jq --version",
    )?)?;

    catalog.register(simple_package(
        "htop",
        Category::SystemTools,
        "Interactive process viewer",
        "htop --version",
    )?)?;

    catalog.register(simple_package(
        "tmux",
        Category::SystemTools,
        "Terminal multiplexer",
        "tmux -V",
    )?)?;

    catalog.register(
        ToolSpec::new(
            "zsh",
            Category::SystemTools,
            "Z shell with optional plugin setup",
            PresenceCheck::new("zsh --version")?,
            package(PackageNames::same("zsh")),
        )
        .with_option(ToolOption {
            name: "oh-my-zsh".to_string(),
            steps: vec![CommandTemplate::parse(
                "git clone --depth 1 https://github.com/ohmyzsh/ohmyzsh.git {home}/.oh-my-zsh",
            )?],
            profile_lines: vec![r#"export ZSH="$HOME/.oh-my-zsh""#.to_string()],
        })
        .with_option(ToolOption {
            name: "zsh-autosuggestions".to_string(),
            steps: vec![CommandTemplate::parse(
                "git clone --depth 1 https://github.com/zsh-users/zsh-autosuggestions.git {home}/.zsh/zsh-autosuggestions",
            )?],
            profile_lines: vec![
                r#"source "$HOME/.zsh/zsh-autosuggestions/zsh-autosuggestions.zsh""#.to_string(),
            ],
        }),
    )?;

    catalog.register(ToolSpec::new(
        "docker",
        Category::SystemTools,
        "Container runtime",
        PresenceCheck::new("docker --version")?,
        package(PackageNames {
            debian: Some("docker.io".to_string()),
            rhel: Some("docker".to_string()),
            homebrew: Some("docker".to_string()),
        }),
    ))?;

    catalog.register(
        ToolSpec::new(
            "kubectl",
            Category::SystemTools,
            "Kubernetes command-line client",
            PresenceCheck::new("kubectl version --client")?,
            InstallMethod::Steps(vec![
                CommandTemplate::parse(
                    "curl -fsSLo /usr/local/bin/kubectl https://dl.k8s.io/release/v{version}/bin/linux/amd64/kubectl",
                )?
                .privileged(),
                CommandTemplate::parse("chmod 0755 /usr/local/bin/kubectl")?.privileged(),
            ]),
        )
        .with_uninstall(vec![
            CommandTemplate::parse("rm -f /usr/local/bin/kubectl")?.privileged(),
        ])
        .with_latest_url("https://dl.k8s.io/release/stable.txt"),
    )?;

    // -- python ------------------------------------------------------------

    catalog.register(
        ToolSpec::new(
            "pyenv",
            Category::Python,
            "Python version manager",
            PresenceCheck::new("{home}/.pyenv/bin/pyenv --version")?,
            InstallMethod::Steps(vec![CommandTemplate::parse(
                "git clone --depth 1 https://github.com/pyenv/pyenv.git {home}/.pyenv",
            )?]),
        )
        .with_uninstall(vec![CommandTemplate::parse("rm -rf {home}/.pyenv")?])
        .with_profile_line(r#"export PYENV_ROOT="$HOME/.pyenv""#)
        .with_profile_line(r#"export PATH="$PYENV_ROOT/bin:$PATH""#)
        .with_profile_line(r#"eval "$(pyenv init -)""#),
    )?;

    catalog.register(ToolSpec::new(
        "pip",
        Category::Python,
        "Python package installer",
        PresenceCheck::new("pip3 --version")?,
        package(PackageNames {
            debian: Some("python3-pip".to_string()),
            rhel: Some("python3-pip".to_string()),
            // macOS python ships pip alongside the interpreter
            homebrew: None,
        }),
    ))?;

    // -- ebpf --------------------------------------------------------------

    catalog.register(
        ToolSpec::new(
            "go",
            Category::Ebpf,
            "Go toolchain, required for eBPF program scaffolding",
            PresenceCheck::new("/usr/local/go/bin/go version")?,
            InstallMethod::Steps(vec![
                CommandTemplate::parse(
                    "curl -fsSLo /tmp/go{version}.linux-amd64.tar.gz https://go.dev/dl/go{version}.linux-amd64.tar.gz",
                )?,
                CommandTemplate::parse("rm -rf /usr/local/go")?.privileged(),
                CommandTemplate::parse(
                    "tar -C /usr/local -xzf /tmp/go{version}.linux-amd64.tar.gz",
                )?
                .privileged(),
            ]),
        )
        .with_uninstall(vec![CommandTemplate::parse("rm -rf /usr/local/go")?.privileged()])
        .with_latest_url("https://go.dev/VERSION?m=text")
        .with_profile_line(r#"export PATH="$PATH:/usr/local/go/bin""#),
    )?;

    catalog.register(ToolSpec::new(
        "clang",
        Category::Ebpf,
        "C compiler used to build eBPF objects",
        PresenceCheck::new("clang --version")?,
        package(PackageNames {
            debian: Some("clang".to_string()),
            rhel: Some("clang".to_string()),
            homebrew: Some("llvm".to_string()),
        }),
    ))?;

    catalog.register(ToolSpec::new(
        "bpftool",
        Category::Ebpf,
        "BPF object inspection and loading",
        PresenceCheck::new("bpftool version")?,
        package(PackageNames {
            debian: Some("bpftool".to_string()),
            rhel: Some("bpftool".to_string()),
            homebrew: None,
        }),
    ))?;

    catalog.register(ToolSpec::new(
        "libbpf",
        Category::Ebpf,
        "BPF loader library headers",
        PresenceCheck::new("pkg-config --modversion libbpf")?,
        package(PackageNames {
            debian: Some("libbpf-dev".to_string()),
            rhel: Some("libbpf-devel".to_string()),
            homebrew: None,
        }),
    ))?;

    Ok(catalog)
}
