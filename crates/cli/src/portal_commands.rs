//! `details`, `allocate` and `batch`: run the engine against the live portal.

use std::{path::Path, sync::Arc};

use {
    anyhow::{Context, Result, bail},
    portalbot_browser::{BrowserConfig, SessionManager},
    portalbot_config::{PortalbotConfig, Severity},
    portalbot_engine::{BatchMode, Credentials, PortalResult, PortalService},
    secrecy::Secret,
    tracing::warn,
};

/// Credentials given on the command line or through `PORTALBOT_*` env vars.
#[derive(Default)]
pub struct CredentialOverrides {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialOverrides {
    pub fn apply(&self, config: &mut PortalbotConfig) {
        if let Some(ref username) = self.username {
            config.credentials.username = Some(username.clone());
        }
        if let Some(ref password) = self.password {
            config.credentials.password = Some(Secret::new(password.clone()));
        }
    }
}

/// Load the explicit config file, or discover one, then apply env overrides.
pub fn load(path: Option<&Path>) -> Result<PortalbotConfig> {
    let config = match path {
        Some(path) => portalbot_config::load_config(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => portalbot_config::discover_and_load(),
    };
    Ok(portalbot_config::apply_env_overrides(config))
}

/// Reject configs that cannot drive a session and extract the credentials.
fn runnable(config: &PortalbotConfig) -> Result<Credentials> {
    let result = portalbot_config::validate(config);
    if result.has_errors() {
        let errors: Vec<String> = result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| format!("{}: {}", d.path, d.message))
            .collect();
        bail!(
            "invalid configuration ({}); run `portalbot config check`",
            errors.join("; ")
        );
    }

    match Credentials::from_config(&config.credentials) {
        Some(credentials) => Ok(credentials),
        None => bail!(
            "portal credentials missing: pass --username/--password or set \
             PORTALBOT_USERNAME/PORTALBOT_PASSWORD"
        ),
    }
}

fn prepare(
    path: Option<&Path>,
    overrides: CredentialOverrides,
) -> Result<(Arc<PortalService>, Credentials)> {
    let mut config = load(path)?;
    overrides.apply(&mut config);
    let credentials = runnable(&config)?;

    let manager = SessionManager::new(BrowserConfig::from(&config.browser));
    let service = Arc::new(PortalService::from_config(Arc::new(manager), &config));
    cancel_on_interrupt(&service);
    Ok((service, credentials))
}

/// Ctrl-C cancels running sessions; each still releases its browser.
fn cancel_on_interrupt(service: &Arc<PortalService>) {
    let service = Arc::clone(service);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling sessions");
            service.shutdown();
        }
    });
}

fn print_result(result: &PortalResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

pub async fn details(path: Option<&Path>, overrides: CredentialOverrides, id: &str) -> Result<()> {
    let (service, credentials) = prepare(path, overrides)?;
    let result = service.get_work_order_details(id, &credentials).await;
    print_result(&result)
}

pub async fn allocate(path: Option<&Path>, overrides: CredentialOverrides, id: &str) -> Result<()> {
    let (service, credentials) = prepare(path, overrides)?;
    let result = service.allocate_work_order(id, &credentials).await;
    print_result(&result)
}

pub async fn batch(
    path: Option<&Path>,
    overrides: CredentialOverrides,
    ids: &[String],
    allocate: bool,
) -> Result<()> {
    let (service, credentials) = prepare(path, overrides)?;
    let mode = if allocate {
        BatchMode::Allocate
    } else {
        BatchMode::Details
    };

    let items = service.process_batch(ids, &credentials, mode).await;
    let failed = items.iter().filter(|i| !i.result.success).count();
    for item in &items {
        println!("{}", serde_json::to_string(item)?);
    }

    if failed > 0 {
        eprintln!("{failed} of {} work order(s) failed", items.len());
        std::process::exit(1);
    }
    Ok(())
}
