//! Configuration loading, validation, and env substitution.
//!
//! Config files: `portalbot.toml`, `portalbot.yaml`, or `portalbot.json`
//! Searched in `./` then `~/.config/portalbot/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in all
//! string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{
        ConfigError, apply_env_overrides, config_dir, discover_and_load, find_config_file,
        load_config,
    },
    schema::{
        AdaptiveConfig, BrowserConfig, CredentialsConfig, DetailLabels, PortalConfig,
        PortalSelectors, PortalbotConfig, RetryConfig, SessionsConfig, TransitionLabels,
    },
    template::default_config_template,
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
