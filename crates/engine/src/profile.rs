//! Logical selectors for one portal deployment, derived from `[portal]` config.

use std::time::Duration;

use {
    portalbot_browser::Selector,
    portalbot_config::{PortalConfig, TransitionLabels},
};

use crate::model::DetailField;

#[derive(Debug, Clone)]
pub struct PortalProfile {
    config: PortalConfig,
}

impl PortalProfile {
    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn login_title_marker(&self) -> &str {
        &self.config.login_title_marker
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.config.login_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.config.search_timeout_ms)
    }

    /// Wait for one detail field before it counts as missing.
    pub fn field_timeout(&self) -> Duration {
        Duration::from_millis(self.config.field_timeout_ms)
    }

    pub fn coordinate_prefix(&self) -> &str {
        &self.config.coordinate_prefix
    }

    pub fn transition_labels(&self) -> &TransitionLabels {
        &self.config.transition
    }

    pub fn username_field(&self) -> Selector {
        Selector::css(&self.config.selectors.username_field)
    }

    pub fn password_field(&self) -> Selector {
        Selector::css(&self.config.selectors.password_field)
    }

    pub fn login_button(&self) -> Selector {
        Selector::css(&self.config.selectors.login_button)
    }

    pub fn search_field(&self) -> Selector {
        Selector::css(&self.config.selectors.search_field)
    }

    pub fn search_button(&self) -> Selector {
        Selector::css(&self.config.selectors.search_button)
    }

    /// The results-table row mentioning `id`.
    pub fn result_row(&self, id: &str) -> Selector {
        Selector::row(&self.config.selectors.results_table, id)
    }

    pub fn view_detail(&self) -> Selector {
        Selector::clickable(&self.config.fields.view_detail)
    }

    pub fn close_detail(&self) -> Selector {
        Selector::clickable(&self.config.fields.close_detail)
    }

    pub fn detail_field(&self, field: DetailField) -> Selector {
        let labels = &self.config.fields;
        let label = match field {
            DetailField::Description => &labels.description,
            DetailField::FiberColor => &labels.fiber_color,
            DetailField::Slid => &labels.slid,
            DetailField::Address => &labels.address,
            DetailField::NetworkOwner => &labels.network_owner,
            DetailField::PrimaryPort => &labels.primary_port,
            DetailField::ScheduledDate => &labels.scheduled_date,
            DetailField::InterventionState => &labels.intervention_state,
        };
        Selector::field(label)
    }
}

impl Default for PortalProfile {
    fn default() -> Self {
        Self::new(PortalConfig::default())
    }
}
