use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result, bail},
    clap::Subcommand,
    portalbot_config::{PortalbotConfig, Severity},
    secrecy::Secret,
};

use crate::portal_commands;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (password redacted).
    Show,
    /// Validate the configuration and report errors/warnings.
    Check,
    /// Write a documented default config file.
    Init {
        /// Portal login URL to put in the file.
        #[arg(long, default_value = "https://portal.example.com/login")]
        url: String,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config(action: ConfigAction, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => show(path),
        ConfigAction::Check => check(path),
        ConfigAction::Init { url, force } => init(path, &url, force),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const REDACTED: &str = "********";

fn redacted(mut config: PortalbotConfig) -> PortalbotConfig {
    if config.credentials.password.is_some() {
        config.credentials.password = Some(Secret::new(REDACTED.into()));
    }
    config
}

fn show(path: Option<&Path>) -> Result<()> {
    let config = redacted(portal_commands::load(path)?);
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn check(path: Option<&Path>) -> Result<()> {
    match path
        .map(Path::to_path_buf)
        .or_else(portalbot_config::find_config_file)
    {
        Some(file) => eprintln!("Checking {}\n", file.display()),
        None => eprintln!("No config file found; checking defaults.\n"),
    }

    let config = portal_commands::load(path)?;
    let result = portalbot_config::validate(&config);

    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if !result.diagnostics.is_empty() {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn init_target(path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    let dir = portalbot_config::config_dir().context("could not determine config directory")?;
    Ok(dir.join("portalbot.toml"))
}

fn init(path: Option<&Path>, url: &str, force: bool) -> Result<()> {
    let target = init_target(path)?;
    if target.extension().and_then(|e| e.to_str()) != Some("toml") {
        bail!("the template is TOML; use a .toml path");
    }
    if target.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            target.display()
        );
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    std::fs::write(&target, portalbot_config::default_config_template(url))
        .with_context(|| format!("writing {}", target.display()))?;
    println!("Config written to: {}", target.display());
    Ok(())
}
