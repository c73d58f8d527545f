//! The UI access capability the engine drives, and the session seam around it.

use std::time::Duration;

use async_trait::async_trait;

use crate::{error::BrowserError, selector::Selector};

/// A resolved element, valid until the page re-renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    ref_: u32,
    selector: Selector,
}

impl ElementHandle {
    pub fn new(ref_: u32, selector: Selector) -> Self {
        Self { ref_, selector }
    }

    /// Backend-assigned reference number.
    pub fn ref_id(&self) -> u32 {
        self.ref_
    }

    /// The selector this handle was resolved from.
    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// Element-level operations on one page.
///
/// Calls on a single implementation are never issued concurrently; the
/// engine awaits each one before the next.
#[async_trait]
pub trait AccessLayer: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Replace the content of an editable element with `text`.
    async fn fill(&self, selector: &Selector, text: &str) -> Result<(), BrowserError>;

    async fn click(&self, selector: &Selector) -> Result<(), BrowserError>;

    async fn right_click(&self, selector: &Selector) -> Result<(), BrowserError>;

    /// Wait until `selector` matches, or fail with [`BrowserError::Timeout`].
    async fn wait_for_selector(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError>;

    async fn read_text(&self, handle: &ElementHandle) -> Result<String, BrowserError>;

    /// Read an attribute; `value` reads the live form value.
    async fn read_attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Text of each cell of a table row, in document order.
    async fn read_cells(&self, row: &ElementHandle) -> Result<Vec<String>, BrowserError>;

    /// Staleness probe: whether the element is still in the document.
    async fn is_attached(&self, handle: &ElementHandle) -> Result<bool, BrowserError>;

    async fn current_title(&self) -> Result<String, BrowserError>;

    async fn page_content(&self) -> Result<String, BrowserError>;
}

/// One isolated browsing context.
#[async_trait]
pub trait BrowserSession: Send {
    fn id(&self) -> &str;

    fn access(&self) -> &dyn AccessLayer;

    /// Tear down the page, the context, and any backing process.
    async fn release(self: Box<Self>);
}

/// Opens isolated sessions.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}
