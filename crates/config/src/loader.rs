use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    thiserror::Error,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::PortalbotConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "portalbot.toml",
    "portalbot.yaml",
    "portalbot.yml",
    "portalbot.json",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: .{0}")]
    UnsupportedFormat(String),
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<PortalbotConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./portalbot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/portalbot/portalbot.{toml,yaml,yml,json}` (user-global)
///
/// Returns `PortalbotConfig::default()` if no config file is found or the
/// file cannot be parsed.
pub fn discover_and_load() -> PortalbotConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    PortalbotConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/portalbot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "portalbot").map(|d| d.config_dir().to_path_buf())
}

/// Apply `PORTALBOT_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: PortalbotConfig) -> PortalbotConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    mut config: PortalbotConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> PortalbotConfig {
    if let Some(url) = lookup("PORTALBOT_PORTAL_URL") {
        config.portal.url = url;
    }
    if let Some(raw) = lookup("PORTALBOT_HEADLESS") {
        match parse_bool(&raw) {
            Some(headless) => config.browser.headless = headless,
            None => warn!(value = %raw, "ignoring invalid PORTALBOT_HEADLESS"),
        }
    }
    if let Some(username) = lookup("PORTALBOT_USERNAME") {
        config.credentials.username = Some(username);
    }
    if let Some(password) = lookup("PORTALBOT_PASSWORD") {
        config.credentials.password = Some(Secret::new(password));
    }
    if let Some(raw) = lookup("PORTALBOT_MAX_PARALLEL_SESSIONS") {
        match raw.trim().parse::<usize>() {
            Ok(n) => config.sessions.max_parallel_sessions = n,
            Err(e) => {
                warn!(value = %raw, error = %e, "ignoring invalid PORTALBOT_MAX_PARALLEL_SESSIONS")
            },
        }
    }
    config
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<PortalbotConfig, ConfigError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}
