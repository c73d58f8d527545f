//! Configuration validation.
//!
//! Checks value ranges and cross-field consistency of a parsed
//! [`PortalbotConfig`], and reports settings that are legal but risky.

use secrecy::ExposeSecret;

use crate::schema::PortalbotConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "adaptive.growth_factor"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.push(Severity::Error, path, message);
    }

    fn warning(&mut self, path: &str, message: impl Into<String>) {
        self.push(Severity::Warning, path, message);
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Validate a parsed configuration.
pub fn validate(config: &PortalbotConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_portal(config, &mut result);
    check_timeouts(config, &mut result);

    if config.retry.max_retries == 0 {
        result.error("retry.max_retries", "must allow at least one attempt");
    }
    if config.retry.backoff_factor < 1.0 {
        result.error(
            "retry.backoff_factor",
            format!("{} would shorten delays between attempts", config.retry.backoff_factor),
        );
    }

    if config.sessions.max_parallel_sessions == 0 {
        result.error("sessions.max_parallel_sessions", "must be at least 1");
    }
    if config.sessions.session_deadline_ms == 0 {
        result.error("sessions.session_deadline_ms", "must be greater than zero");
    }

    if !config.browser.headless {
        result.warning(
            "browser.headless",
            "headful mode opens a visible window per session",
        );
    }

    if config
        .credentials
        .password
        .as_ref()
        .is_some_and(|p| !p.expose_secret().is_empty())
    {
        result.warning(
            "credentials.password",
            "password resolved from config; prefer ${PORTALBOT_PASSWORD} or the env override",
        );
    }

    result
}

fn check_portal(config: &PortalbotConfig, result: &mut ValidationResult) {
    let url = config.portal.url.trim();
    if url.is_empty() {
        result.error("portal.url", "portal login URL is not set");
        return;
    }

    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {},
        Ok(parsed) => result.error(
            "portal.url",
            format!("unsupported scheme '{}', only http/https allowed", parsed.scheme()),
        ),
        Err(e) => result.error("portal.url", format!("invalid URL: {e}")),
    }

    if config.portal.login_title_marker.trim().is_empty() {
        result.error(
            "portal.login_title_marker",
            "an empty marker would accept any page as logged in",
        );
    }
}

fn check_timeouts(config: &PortalbotConfig, result: &mut ValidationResult) {
    let adaptive = &config.adaptive;

    if adaptive.min_timeout_ms == 0 {
        result.error("adaptive.min_timeout_ms", "must be greater than zero");
    }
    if adaptive.min_timeout_ms > adaptive.max_timeout_ms {
        result.error(
            "adaptive.min_timeout_ms",
            format!(
                "min ({}) exceeds max ({})",
                adaptive.min_timeout_ms, adaptive.max_timeout_ms
            ),
        );
    }
    if adaptive.growth_factor <= 1.0 {
        result.error("adaptive.growth_factor", "must be greater than 1.0");
    }
    if !(adaptive.decay_factor > 0.0 && adaptive.decay_factor < 1.0) {
        result.error("adaptive.decay_factor", "must be between 0.0 and 1.0 (exclusive)");
    }
    if adaptive.success_threshold == 0 {
        result.error("adaptive.success_threshold", "must be at least 1");
    }

    if config.portal.field_timeout_ms == 0 {
        result.error(
            "portal.field_timeout_ms",
            "must be greater than zero or every detail field reads as missing",
        );
    }

    let default = config.browser.default_timeout_ms;
    if default < adaptive.min_timeout_ms || default > adaptive.max_timeout_ms {
        result.warning(
            "browser.default_timeout_ms",
            format!(
                "{default}ms is outside the adaptive range and will be clamped to [{}, {}]",
                adaptive.min_timeout_ms, adaptive.max_timeout_ms
            ),
        );
    }
}
