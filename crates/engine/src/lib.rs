//! Work-order portal automation: login, search, detail extraction and the
//! allocation workflow, driven through any [`portalbot_browser::AccessLayer`].
//!
//! [`PortalService`] is the entry point. It opens one session per request,
//! bounded by `max_parallel_sessions`, and always answers with a
//! [`PortalResult`].

pub mod adaptive;
pub mod auth;
pub mod cache;
pub mod driver;
pub mod error;
pub mod extract;
pub mod locator;
pub mod model;
pub mod profile;
pub mod retry;
pub mod service;
pub mod transition;

pub use {
    adaptive::AdaptiveTimeout,
    cache::{CacheStats, ElementCache, ResultCache},
    driver::SessionDriver,
    error::EngineError,
    extract::parse_coordinates,
    model::{Coordinates, Credentials, DetailField, PortalResult, WorkOrder, WorkOrderStatus},
    profile::PortalProfile,
    retry::{RetryPolicy, with_retry},
    service::{BatchItem, BatchMode, PortalService, ServiceSettings},
    transition::{AllocationStep, Stage, TransitionOutcome},
};
