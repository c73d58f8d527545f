//! Chromium automation primitives for the work-order portal.
//!
//! The engine talks to the page only through [`AccessLayer`]; this crate
//! provides the chromiumoxide-backed implementation and the
//! [`SessionManager`] that launches one isolated browser per session.
//!
//! # Example
//!
//! ```ignore
//! use portalbot_browser::{BrowserConfig, SessionManager, SessionProvider, Selector};
//!
//! let manager = SessionManager::new(BrowserConfig::default());
//! let session = manager.acquire().await?;
//! session.access().navigate("https://portal.example.com/login").await?;
//! let title = session.access().current_title().await?;
//! session.release().await;
//! ```

pub mod access;
pub mod cdp;
pub mod detect;
pub mod error;
pub mod selector;
pub mod session;
pub mod types;

pub use {
    access::{AccessLayer, BrowserSession, ElementHandle, SessionProvider},
    cdp::CdpAccessLayer,
    error::BrowserError,
    selector::Selector,
    session::SessionManager,
    types::BrowserConfig,
};
