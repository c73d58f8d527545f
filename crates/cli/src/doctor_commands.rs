//! `portalbot doctor`: config validation, credential and browser checks.
//!
//! Prints a report with `[ok]`, `[warn]`, `[fail]`, `[skip]`, or `[info]`
//! per item and exits non-zero when anything failed.

use std::path::Path;

use {
    anyhow::Result,
    portalbot_browser::{BrowserConfig, SessionManager, SessionProvider, detect},
    portalbot_config::{PortalbotConfig, Severity},
};

use crate::portal_commands::{self, CredentialOverrides};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Skip,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Skip => DIM,
            Self::Info => CYAN,
        }
    }
}

struct Section {
    title: String,
    items: Vec<(Status, String)>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push((status, message.into()));
    }

    fn has(&self, status: Status) -> bool {
        self.items.iter().any(|(s, _)| *s == status)
    }
}

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for (status, message) in &section.items {
            eprintln!("  [{}{}{RESET}]  {message}", status.color(), status.label());
            match status {
                Status::Fail => errors += 1,
                Status::Warn => warnings += 1,
                _ => {},
            }
        }
        eprintln!();
    }

    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub async fn handle_doctor(
    path: Option<&Path>,
    overrides: &CredentialOverrides,
    probe: bool,
) -> Result<()> {
    eprintln!("{BOLD}portalbot doctor{RESET}");
    eprintln!("{BOLD}================{RESET}\n");

    let mut config = portal_commands::load(path)?;
    overrides.apply(&mut config);

    let mut sections = vec![
        check_config(path, &config),
        check_credentials(&config),
        check_browser(&config),
    ];

    let ready = !sections.iter().any(|s| s.has(Status::Fail));
    sections.push(if !probe {
        skipped_probe("pass --probe to open the portal login page")
    } else if !ready {
        skipped_probe("fix the failures above first")
    } else {
        probe_portal(&config).await
    });

    let (errors, warnings) = print_report(&sections);
    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ── Checks ──────────────────────────────────────────────────────────────────

fn check_config(path: Option<&Path>, config: &PortalbotConfig) -> Section {
    let label = path
        .map(Path::to_path_buf)
        .or_else(portalbot_config::find_config_file)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".into());
    let mut section = Section::new(format!("Config ({label})"));

    let result = portalbot_config::validate(config);
    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "No issues found");
    }
    for d in &result.diagnostics {
        let status = match d.severity {
            Severity::Error => Status::Fail,
            Severity::Warning => Status::Warn,
        };
        section.push(status, format!("{}: {}", d.path, d.message));
    }
    section
}

fn check_credentials(config: &PortalbotConfig) -> Section {
    let mut section = Section::new("Credentials");
    let creds = &config.credentials;

    match creds.username.as_deref().filter(|u| !u.is_empty()) {
        Some(username) => section.push(Status::Ok, format!("username: {username}")),
        None => section.push(Status::Fail, "username not set (PORTALBOT_USERNAME)"),
    }
    if creds.is_complete() {
        section.push(Status::Ok, "password set");
    } else if creds.password.is_none() {
        section.push(Status::Fail, "password not set (PORTALBOT_PASSWORD)");
    } else {
        section.push(Status::Fail, "password is empty");
    }
    section
}

fn check_browser(config: &PortalbotConfig) -> Section {
    let mut section = Section::new("Browser");

    match detect::locate_browser(config.browser.chrome_path.as_deref()) {
        Ok(path) => section.push(Status::Ok, format!("found {}", path.display())),
        Err(e) => section.push(Status::Fail, e.to_string()),
    }

    let mode = if config.browser.headless {
        "headless"
    } else {
        "headful"
    };
    section.push(
        Status::Info,
        format!(
            "{mode}, {}x{}, up to {} parallel session(s)",
            config.browser.viewport_width,
            config.browser.viewport_height,
            config.sessions.max_parallel_sessions
        ),
    );
    section
}

fn skipped_probe(reason: &str) -> Section {
    let mut section = Section::new("Portal");
    section.push(Status::Skip, reason);
    section
}

async fn probe_portal(config: &PortalbotConfig) -> Section {
    let mut section = Section::new(format!("Portal ({})", config.portal.url));
    let manager = SessionManager::new(BrowserConfig::from(&config.browser));

    let session = match manager.acquire().await {
        Ok(session) => session,
        Err(e) => {
            section.push(Status::Fail, format!("browser launch: {e}"));
            return section;
        },
    };
    section.push(Status::Ok, "browser launched");

    match session.access().navigate(&config.portal.url).await {
        Ok(()) => match session.access().current_title().await {
            Ok(title) => section.push(Status::Ok, format!("login page loaded: \"{title}\"")),
            Err(e) => section.push(Status::Warn, format!("page title unreadable: {e}")),
        },
        Err(e) => section.push(Status::Fail, format!("navigation: {e}")),
    }

    session.release().await;
    section
}
