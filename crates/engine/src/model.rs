//! Work-order snapshots and the structured results handed to callers.

use std::fmt;

use {
    chrono::{DateTime, Utc},
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

/// Status of a work order as displayed by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkOrderStatus {
    InProgress,
    Allocated,
    JobStart,
    JobClosed,
    PendingInvoicing,
    Unknown,
}

/// Keywords that mark a cell as the status cell, checked as substrings of
/// the normalized cell text.
pub(crate) const STATUS_KEYWORDS: &[&str] = &[
    "IN PROGRESS",
    "ALLOCATED",
    "JOB START",
    "JOB CLOSED",
    "PENDING_INVOICING",
    "JOB",
    "PROGRESS",
    "CLOSED",
    "PENDENTE",
];

impl WorkOrderStatus {
    /// Map a displayed status label to a status.
    ///
    /// Exact labels win. Otherwise the most specific substring decides:
    /// invoicing/pending, then closed, then job start, then allocated, then
    /// progress. A bare `JOB` with none of those qualifiers stays `Unknown`.
    pub fn from_label(label: &str) -> Self {
        let text = normalize(label);

        match text.as_str() {
            "IN PROGRESS" | "IN_PROGRESS" => return Self::InProgress,
            "ALLOCATED" => return Self::Allocated,
            "JOB START" | "JOB_START" => return Self::JobStart,
            "JOB CLOSED" | "JOB_CLOSED" => return Self::JobClosed,
            "PENDING_INVOICING" | "PENDING INVOICING" => return Self::PendingInvoicing,
            _ => {},
        }

        if text.contains("PENDING_INVOICING")
            || text.contains("PENDING INVOICING")
            || text.contains("PENDENTE")
        {
            Self::PendingInvoicing
        } else if text.contains("CLOSED") {
            Self::JobClosed
        } else if text.contains("JOB START") || text.contains("JOB_START") {
            Self::JobStart
        } else if text.contains("ALLOCATED") {
            Self::Allocated
        } else if text.contains("PROGRESS") {
            Self::InProgress
        } else {
            Self::Unknown
        }
    }

    /// Whether a cell's text carries any status keyword.
    pub fn is_status_text(label: &str) -> bool {
        let text = normalize(label);
        !text.is_empty() && STATUS_KEYWORDS.iter().any(|k| text.contains(k))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Allocated => "ALLOCATED",
            Self::JobStart => "JOB_START",
            Self::JobClosed => "JOB_CLOSED",
            Self::PendingInvoicing => "PENDING_INVOICING",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_uppercase()
}

/// Latitude/longitude pair scraped from the description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Named detail-view fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailField {
    Description,
    FiberColor,
    Slid,
    Address,
    NetworkOwner,
    PrimaryPort,
    ScheduledDate,
    InterventionState,
}

impl DetailField {
    pub const ALL: [Self; 8] = [
        Self::Description,
        Self::FiberColor,
        Self::Slid,
        Self::Address,
        Self::NetworkOwner,
        Self::PrimaryPort,
        Self::ScheduledDate,
        Self::InterventionState,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::FiberColor => "fiber_color",
            Self::Slid => "slid",
            Self::Address => "address",
            Self::NetworkOwner => "network_owner",
            Self::PrimaryPort => "primary_port",
            Self::ScheduledDate => "scheduled_date",
            Self::InterventionState => "intervention_state",
        }
    }
}

impl fmt::Display for DetailField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of one portal record. A new fetch yields a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: String,
    pub status: WorkOrderStatus,
    /// Raw cell text the status was derived from.
    pub status_label: String,
    pub description: String,
    pub fiber_color: String,
    pub slid: String,
    pub address: String,
    pub network_owner: String,
    pub primary_port: String,
    pub scheduled_date: String,
    pub intervention_state: String,
    pub coordinates: Option<Coordinates>,
    pub fetched_at: DateTime<Utc>,
}

impl WorkOrder {
    pub fn new(id: impl Into<String>, status: WorkOrderStatus, status_label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status,
            status_label: status_label.into(),
            description: String::new(),
            fiber_color: String::new(),
            slid: String::new(),
            address: String::new(),
            network_owner: String::new(),
            primary_port: String::new(),
            scheduled_date: String::new(),
            intervention_state: String::new(),
            coordinates: None,
            fetched_at: Utc::now(),
        }
    }

    pub fn field(&self, field: DetailField) -> &str {
        match field {
            DetailField::Description => &self.description,
            DetailField::FiberColor => &self.fiber_color,
            DetailField::Slid => &self.slid,
            DetailField::Address => &self.address,
            DetailField::NetworkOwner => &self.network_owner,
            DetailField::PrimaryPort => &self.primary_port,
            DetailField::ScheduledDate => &self.scheduled_date,
            DetailField::InterventionState => &self.intervention_state,
        }
    }

    pub(crate) fn set_field(&mut self, field: DetailField, value: String) {
        let slot = match field {
            DetailField::Description => &mut self.description,
            DetailField::FiberColor => &mut self.fiber_color,
            DetailField::Slid => &mut self.slid,
            DetailField::Address => &mut self.address,
            DetailField::NetworkOwner => &mut self.network_owner,
            DetailField::PrimaryPort => &mut self.primary_port,
            DetailField::ScheduledDate => &mut self.scheduled_date,
            DetailField::InterventionState => &mut self.intervention_state,
        };
        *slot = value;
    }
}

/// Portal login for one technician.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password.into()),
        }
    }

    /// Build from config, if both username and password are present.
    pub fn from_config(cfg: &portalbot_config::CredentialsConfig) -> Option<Self> {
        if !cfg.is_complete() {
            return None;
        }
        Some(Self {
            username: cfg.username.clone()?,
            password: cfg.password.clone()?,
        })
    }
}

/// Outcome of a public engine operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalResult {
    pub success: bool,
    pub message: String,
    pub data: Option<WorkOrder>,
}

impl PortalResult {
    pub fn success(message: impl Into<String>, data: WorkOrder) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Failure that still carries the best snapshot available.
    pub fn failure_with(message: impl Into<String>, data: WorkOrder) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn not_found(id: &str) -> Self {
        Self::failure(format!("Ordem de trabalho {id} não encontrada"))
    }
}
