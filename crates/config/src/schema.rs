/// Config schema types (portal, browser, retry, adaptive waits, sessions).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalbotConfig {
    pub portal: PortalConfig,
    pub browser: BrowserConfig,
    pub retry: RetryConfig,
    pub adaptive: AdaptiveConfig,
    pub sessions: SessionsConfig,
    pub credentials: CredentialsConfig,
}

/// The work-order portal being automated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Login page URL.
    pub url: String,
    /// Substring the page title must contain once login succeeded.
    pub login_title_marker: String,
    /// How long to wait for the identity check after submitting credentials.
    pub login_timeout_ms: u64,
    /// How long to wait for a result row before reporting "not found".
    pub search_timeout_ms: u64,
    /// Single wait for a detail field before it is reported missing.
    pub field_timeout_ms: u64,
    /// Label that starts the coordinates line inside the description.
    pub coordinate_prefix: String,
    pub selectors: PortalSelectors,
    pub fields: DetailLabels,
    pub transition: TransitionLabels,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            login_title_marker: "Work Order Management".into(),
            login_timeout_ms: 20_000,
            search_timeout_ms: 15_000,
            field_timeout_ms: 3_000,
            coordinate_prefix: "PDO Coordenadas".into(),
            selectors: PortalSelectors::default(),
            fields: DetailLabels::default(),
            transition: TransitionLabels::default(),
        }
    }
}

/// CSS selectors for the fixed controls of the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSelectors {
    pub username_field: String,
    pub password_field: String,
    pub login_button: String,
    pub search_field: String,
    pub search_button: String,
    /// Table holding the search results.
    pub results_table: String,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            username_field: "input[name='username']".into(),
            password_field: "input[name='password']".into(),
            login_button: "button[type='submit']".into(),
            search_field: "input[name='search']".into(),
            search_button: "button[name='searchButton']".into(),
            results_table: "table.results".into(),
        }
    }
}

/// Visible labels of the detail-view fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailLabels {
    pub description: String,
    pub fiber_color: String,
    pub slid: String,
    pub address: String,
    pub network_owner: String,
    pub primary_port: String,
    pub scheduled_date: String,
    pub intervention_state: String,
    /// Context-menu command that opens the detail view.
    pub view_detail: String,
    /// Control that closes the detail view.
    pub close_detail: String,
}

impl Default for DetailLabels {
    fn default() -> Self {
        Self {
            description: "Description".into(),
            fiber_color: "Fiber Color".into(),
            slid: "SLID".into(),
            address: "Address".into(),
            network_owner: "Network Owner".into(),
            primary_port: "Primary Port".into(),
            scheduled_date: "Scheduled Date".into(),
            intervention_state: "Intervention State".into(),
            view_detail: "View Detail".into(),
            close_detail: "Close".into(),
        }
    }
}

/// Labels of the controls clicked, in order, to allocate a work order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionLabels {
    pub auto_allocation: String,
    pub evolve: String,
    pub confirm: String,
    pub acknowledge: String,
}

impl Default for TransitionLabels {
    fn default() -> Self {
        Self {
            auto_allocation: "Advance Auto-Allocation".into(),
            evolve: "Evolve Work Order".into(),
            confirm: "Yes".into(),
            acknowledge: "OK".into(),
        }
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Starting wait bound for element lookups.
    pub default_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    pub user_agent: Option<String>,
    #[serde(default)]
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            default_timeout_ms: 10_000,
            navigation_timeout_ms: 30_000,
            chrome_path: None,
            user_agent: None,
            chrome_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per UI operation, the first one included.
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 500,
            backoff_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    pub min_timeout_ms: u64,
    pub max_timeout_ms: u64,
    pub growth_factor: f64,
    pub decay_factor: f64,
    /// Consecutive successes needed before the timeout shrinks.
    pub success_threshold: u32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            min_timeout_ms: 2_000,
            max_timeout_ms: 30_000,
            growth_factor: 1.5,
            decay_factor: 0.8,
            success_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub max_parallel_sessions: usize,
    /// Overall deadline for one session, login to release.
    pub session_deadline_ms: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_parallel_sessions: 4,
            session_deadline_ms: 180_000,
        }
    }
}

/// Portal credentials. Usually supplied through `${ENV}` substitution or
/// the `PORTALBOT_USERNAME` / `PORTALBOT_PASSWORD` overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    #[serde(
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub password: Option<Secret<String>>,
}

impl CredentialsConfig {
    /// Whether both halves of the credential pair are present.
    pub fn is_complete(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self
                .password
                .as_ref()
                .is_some_and(|p| !p.expose_secret().is_empty())
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let cfg = PortalbotConfig::default();
        assert!(cfg.browser.headless);
        assert_eq!(cfg.retry.max_retries, 3);
        assert!(cfg.adaptive.min_timeout_ms <= cfg.browser.default_timeout_ms);
        assert!(cfg.browser.default_timeout_ms <= cfg.adaptive.max_timeout_ms);
        assert_eq!(cfg.portal.coordinate_prefix, "PDO Coordenadas");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: PortalbotConfig = toml::from_str(
            r#"
            [portal]
            url = "https://portal.example.com/login"

            [sessions]
            max_parallel_sessions = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.portal.url, "https://portal.example.com/login");
        assert_eq!(cfg.portal.transition.confirm, "Yes");
        assert_eq!(cfg.sessions.max_parallel_sessions, 2);
        assert_eq!(cfg.sessions.session_deadline_ms, 180_000);
    }

    #[test]
    fn credentials_completeness() {
        let mut creds = CredentialsConfig::default();
        assert!(!creds.is_complete());
        creds.username = Some("tecnico".into());
        assert!(!creds.is_complete());
        creds.password = Some(Secret::new("segredo".into()));
        assert!(creds.is_complete());
    }

    #[test]
    fn debug_output_redacts_password() {
        let creds = CredentialsConfig {
            username: Some("tecnico".into()),
            password: Some(Secret::new("segredo".into())),
        };
        assert!(!format!("{creds:?}").contains("segredo"));
    }
}
