//! Browser launch configuration.

use {
    serde::{Deserialize, Serialize},
    std::time::Duration,
};

use crate::error::BrowserError;

/// Browser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Fixed viewport width.
    pub viewport_width: u32,
    /// Fixed viewport height.
    pub viewport_height: u32,
    /// Default element wait in milliseconds.
    pub default_timeout_ms: u64,
    /// Navigation (and CDP request) timeout in milliseconds.
    pub navigation_timeout_ms: u64,
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    /// User agent string (uses default if not set).
    pub user_agent: Option<String>,
    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self::from(&portalbot_config::BrowserConfig::default())
    }
}

impl From<&portalbot_config::BrowserConfig> for BrowserConfig {
    fn from(cfg: &portalbot_config::BrowserConfig) -> Self {
        Self {
            headless: cfg.headless,
            viewport_width: cfg.viewport_width,
            viewport_height: cfg.viewport_height,
            default_timeout_ms: cfg.default_timeout_ms,
            navigation_timeout_ms: cfg.navigation_timeout_ms,
            chrome_path: cfg.chrome_path.clone(),
            user_agent: cfg.user_agent.clone(),
            chrome_args: cfg.chrome_args.clone(),
        }
    }
}

impl BrowserConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// Validate a URL before attempting navigation. Only http/https is allowed.
pub fn validate_url(url: &str) -> Result<url::Url, BrowserError> {
    if url.trim().is_empty() {
        return Err(BrowserError::InvalidAction(
            "URL cannot be empty".to_string(),
        ));
    }

    let parsed = url::Url::parse(url).map_err(|e| {
        BrowserError::InvalidAction(format!("invalid URL '{}': {}", truncate_url(url), e))
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(BrowserError::InvalidAction(format!(
            "unsupported URL scheme '{scheme}', only http/https allowed"
        ))),
    }
}

/// Truncate a URL for error messages.
fn truncate_url(url: &str) -> String {
    match url.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &url[..idx]),
        None => url.to_string(),
    }
}
