//! Browser error types.

use thiserror::Error;

/// Errors that can occur during browser operations.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser not available: {0}")]
    BrowserNotAvailable(String),

    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("stale element: {0}")]
    StaleElement(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("JavaScript evaluation failed: {0}")]
    JsEvalFailed(String),

    #[error("browser closed unexpectedly")]
    BrowserClosed,

    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("invalid action: {0}")]
    InvalidAction(String),
}

impl BrowserError {
    /// Failures that may clear up if the same operation is attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::StaleElement(_))
    }

    /// Failures that mean the browser itself is gone or never started.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BrowserNotAvailable(_)
                | Self::LaunchFailed(_)
                | Self::BrowserClosed
                | Self::ConnectionClosed(_)
        )
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        let msg = err.to_string();
        if msg.contains("AlreadyClosed") || msg.contains("ConnectionClosed") {
            BrowserError::ConnectionClosed(msg)
        } else if msg.to_ascii_lowercase().contains("timeout") {
            BrowserError::Timeout(msg)
        } else {
            BrowserError::Cdp(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_disjoint() {
        let cases = [
            BrowserError::Timeout("wait".into()),
            BrowserError::StaleElement("row".into()),
            BrowserError::LaunchFailed("no chrome".into()),
            BrowserError::ConnectionClosed("ws".into()),
            BrowserError::InvalidSelector("".into()),
            BrowserError::Cdp("boom".into()),
        ];
        for err in &cases {
            assert!(!(err.is_transient() && err.is_fatal()), "{err}");
        }
        assert!(cases[0].is_transient());
        assert!(cases[1].is_transient());
        assert!(cases[2].is_fatal());
        assert!(cases[3].is_fatal());
        assert!(!cases[4].is_transient() && !cases[4].is_fatal());
    }

    #[test]
    fn page_level_failures_are_neither_transient_nor_fatal() {
        for err in [
            BrowserError::Cdp("Execution context was destroyed".into()),
            BrowserError::NavigationFailed("net::ERR_ABORTED".into()),
            BrowserError::JsEvalFailed("TypeError".into()),
        ] {
            assert!(!err.is_transient() && !err.is_fatal(), "{err}");
        }
    }
}
