//! Sequential, cancellable UI operations for one session.
//!
//! A [`SessionDriver`] wraps an [`AccessLayer`] with the session's adaptive
//! timeout, retry policy, element cache and cancellation token. Every
//! workflow step goes through it; `&mut self` keeps operations strictly
//! ordered within the session.

use std::{future::Future, time::Duration};

use {
    portalbot_browser::{AccessLayer, BrowserError, ElementHandle, Selector},
    tokio::time::Instant,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use crate::{
    adaptive::AdaptiveTimeout,
    cache::ElementCache,
    error::EngineError,
    retry::{RetryPolicy, with_retry},
};

const TITLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Race a backend call against the session's cancellation token.
async fn guard<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, BrowserError>>,
) -> Result<T, EngineError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(EngineError::Cancelled),
        result = fut => result.map_err(EngineError::from),
    }
}

pub struct SessionDriver<'a> {
    access: &'a dyn AccessLayer,
    session_id: String,
    timeout: AdaptiveTimeout,
    retry: RetryPolicy,
    elements: ElementCache,
    cancel: CancellationToken,
}

impl<'a> SessionDriver<'a> {
    pub fn new(
        access: &'a dyn AccessLayer,
        session_id: impl Into<String>,
        timeout: AdaptiveTimeout,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            access,
            session_id: session_id.into(),
            timeout,
            retry,
            elements: ElementCache::new(),
            cancel,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn timeout(&self) -> &AdaptiveTimeout {
        &self.timeout
    }

    pub fn elements(&self) -> &ElementCache {
        &self.elements
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn navigate(&mut self, url: &str) -> Result<(), EngineError> {
        let access = self.access;
        let cancel = &self.cancel;
        with_retry(&self.retry, &mut self.timeout, cancel, "navigate", |_| {
            guard(cancel, access.navigate(url))
        })
        .await?;
        // Everything resolved on the previous page is gone.
        self.elements.clear();
        Ok(())
    }

    /// Resolve `selector`, reusing the cached handle while it is still attached.
    pub async fn locate(&mut self, selector: &Selector) -> Result<ElementHandle, EngineError> {
        if let Some(handle) = self.elements.get(selector) {
            match guard(&self.cancel, self.access.is_attached(&handle)).await {
                Ok(true) => {
                    self.timeout.record_success();
                    return Ok(handle);
                },
                Ok(false) => {
                    debug!(session_id = %self.session_id, selector = %selector, "cached element went stale");
                },
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(session_id = %self.session_id, selector = %selector, error = %e, "staleness probe failed");
                },
            }
            self.elements.invalidate(selector);
        }

        let access = self.access;
        let cancel = &self.cancel;
        let handle = with_retry(&self.retry, &mut self.timeout, cancel, "locate", |timeout| {
            guard(cancel, access.wait_for_selector(selector, timeout))
        })
        .await?;

        self.elements.insert(handle.clone());
        Ok(handle)
    }

    /// Single wait for an element that may legitimately be absent.
    ///
    /// A timeout yields `None`; nothing is retried and the adaptive timeout
    /// is left alone.
    pub async fn probe(
        &mut self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<ElementHandle>, EngineError> {
        match guard(&self.cancel, self.access.wait_for_selector(selector, timeout)).await {
            Ok(handle) => {
                self.elements.insert(handle.clone());
                Ok(Some(handle))
            },
            Err(EngineError::Browser(BrowserError::Timeout(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn fill(&mut self, selector: &Selector, text: &str) -> Result<(), EngineError> {
        self.locate(selector).await?;
        match guard(&self.cancel, self.access.fill(selector, text)).await {
            Err(e) if e.is_transient() => {
                self.elements.invalidate(selector);
                self.locate(selector).await?;
                guard(&self.cancel, self.access.fill(selector, text)).await
            },
            other => other,
        }
    }

    /// Locate (with retries) and click once. Clicks change portal state and
    /// are never repeated automatically.
    ///
    /// The locate step already fed the adaptive timeout; only a failed click
    /// adds another outcome.
    pub async fn click(&mut self, selector: &Selector) -> Result<(), EngineError> {
        self.locate(selector).await?;
        let result = guard(&self.cancel, self.access.click(selector)).await;
        self.settle_click(selector, result)
    }

    pub async fn right_click(&mut self, selector: &Selector) -> Result<(), EngineError> {
        self.locate(selector).await?;
        let result = guard(&self.cancel, self.access.right_click(selector)).await;
        self.settle_click(selector, result)
    }

    fn settle_click(
        &mut self,
        selector: &Selector,
        result: Result<(), EngineError>,
    ) -> Result<(), EngineError> {
        if result.is_err() {
            self.timeout.record_failure();
            self.elements.invalidate(selector);
        }
        result
    }

    pub async fn read_text(&mut self, selector: &Selector) -> Result<String, EngineError> {
        let handle = self.locate(selector).await?;
        match guard(&self.cancel, self.access.read_text(&handle)).await {
            Err(e) if e.is_transient() => {
                self.elements.invalidate(selector);
                let handle = self.locate(selector).await?;
                guard(&self.cancel, self.access.read_text(&handle)).await
            },
            other => other,
        }
    }

    /// Read a form control that may be absent from the page.
    ///
    /// One bounded wait and one read: `Ok(None)` when the element never
    /// shows up or detaches before it could be read. The value attribute
    /// wins over the text. Retries and the adaptive timeout stay out of it.
    pub async fn read_optional(
        &mut self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<String>, EngineError> {
        let Some(handle) = self.probe(selector, timeout).await? else {
            return Ok(None);
        };

        let value = match guard(&self.cancel, self.access.read_attribute(&handle, "value")).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => guard(&self.cancel, self.access.read_text(&handle)).await,
            Err(e) => Err(e),
        };

        match value {
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(e) if e.is_transient() => {
                self.elements.invalidate(selector);
                debug!(session_id = %self.session_id, selector = %selector, error = %e, "element detached before it was read");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    pub async fn read_cells(&mut self, selector: &Selector) -> Result<Vec<String>, EngineError> {
        let handle = self.locate(selector).await?;
        match guard(&self.cancel, self.access.read_cells(&handle)).await {
            Err(e) if e.is_transient() => {
                self.elements.invalidate(selector);
                let handle = self.locate(selector).await?;
                guard(&self.cancel, self.access.read_cells(&handle)).await
            },
            other => other,
        }
    }

    pub async fn title(&self) -> Result<String, EngineError> {
        guard(&self.cancel, self.access.current_title()).await
    }

    pub async fn page_content(&self) -> Result<String, EngineError> {
        guard(&self.cancel, self.access.page_content()).await
    }

    /// Poll the page title until it contains `marker`. Returns `false` on timeout.
    ///
    /// A title that cannot be read mid-navigation counts as not there yet;
    /// only fatal errors and cancellation end the wait early.
    pub async fn wait_for_title(
        &mut self,
        marker: &str,
        timeout: Duration,
    ) -> Result<bool, EngineError> {
        let deadline = Instant::now() + timeout;
        let mut last_title = String::new();
        loop {
            match self.title().await {
                Ok(title) if title.contains(marker) => {
                    self.timeout.record_success();
                    return Ok(true);
                },
                Ok(title) => last_title = title,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(session_id = %self.session_id, error = %e, "page title unavailable");
                },
            }
            if Instant::now() >= deadline {
                self.timeout.record_failure();
                debug!(session_id = %self.session_id, title = %last_title, marker, "title condition not met");
                return Ok(false);
            }
            tokio::select! {
                () = self.cancel.cancelled() => return Err(EngineError::Cancelled),
                () = tokio::time::sleep(TITLE_POLL_INTERVAL) => {},
            }
        }
    }
}
