use portalbot_browser::BrowserError;

/// Errors raised while driving a portal session.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error("operation cancelled")]
    Cancelled,

    #[error("session deadline of {0}ms exceeded")]
    DeadlineExceeded(u64),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    /// Errors that end the session: the browser is gone or the run was cut short.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Browser(e) => e.is_fatal(),
            Self::Cancelled | Self::DeadlineExceeded(_) => true,
            Self::InvalidInput(_) => false,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Browser(e) if e.is_transient())
    }
}
