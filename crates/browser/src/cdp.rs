//! [`AccessLayer`] over a chromiumoxide page.
//!
//! Selectors are resolved in-page by a small script that tags the matched
//! element with a `data-portalbot-ref` number; handles carry that number, so
//! a re-rendered element simply stops resolving and reads as stale.

use std::time::Duration;

use {
    async_trait::async_trait,
    chromiumoxide::{
        Page,
        cdp::browser_protocol::input::{
            DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
            DispatchMouseEventType, MouseButton,
        },
    },
    serde::{Deserialize, de::DeserializeOwned},
    tokio::time::{Instant, sleep},
    tracing::debug,
};

use crate::{
    access::{AccessLayer, ElementHandle},
    error::BrowserError,
    selector::Selector,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Resolves a selector spec (`__SPEC__`) to a ref number, 0 when nothing matches.
const RESOLVE_JS: &str = r#"
(() => {
    const spec = __SPEC__;
    const norm = (s) => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
    const visible = (el) => {
        const rect = el.getBoundingClientRect();
        const style = getComputedStyle(el);
        return rect.width > 0 && rect.height > 0 &&
            style.visibility !== 'hidden' && style.display !== 'none';
    };
    const FORM = 'input, textarea, select';
    let el = null;

    if (spec.kind === 'css') {
        el = document.querySelector(spec.value);
    } else if (spec.kind === 'clickable') {
        const want = norm(spec.value);
        const passes = [
            'button, a, [role="button"], [role="menuitem"], input[type="button"], input[type="submit"]',
            'li, td, span, div',
        ];
        for (const pass of passes) {
            for (const c of document.querySelectorAll(pass)) {
                if (norm(c.innerText || c.value || c.textContent) === want && visible(c)) {
                    el = c;
                    break;
                }
            }
            if (el) break;
        }
    } else if (spec.kind === 'field') {
        const want = norm(spec.value);
        for (const label of document.querySelectorAll('label, th, td, span, div')) {
            if (norm(label.textContent).replace(/:$/, '').trim() !== want) continue;
            let target = label.htmlFor ? document.getElementById(label.htmlFor) : null;
            if (!target) target = label.querySelector(FORM);
            let sib = label.nextElementSibling;
            while (!target && sib) {
                target = sib.matches(FORM) ? sib : sib.querySelector(FORM);
                sib = sib.nextElementSibling;
            }
            if (!target && label.parentElement) {
                target = label.parentElement.querySelector(FORM);
            }
            if (target) {
                el = target;
                break;
            }
        }
    } else if (spec.kind === 'row') {
        const table = document.querySelector(spec.value.table);
        if (table) {
            const want = norm(spec.value.contains);
            const rows = Array.from(table.querySelectorAll('tr'));
            // A cell equal to the wanted text beats a row that merely contains it.
            el = rows.find((row) => Array.from(row.cells || []).some((cell) => norm(cell.innerText) === want))
                || rows.find((row) => (row.innerText || '').includes(spec.value.contains))
                || null;
        }
    }

    if (!el) return 0;
    if (!el.dataset.portalbotRef) {
        window.__portalbotNextRef = (window.__portalbotNextRef || 0) + 1;
        el.dataset.portalbotRef = String(window.__portalbotNextRef);
    }
    return Number(el.dataset.portalbotRef);
})()
"#;

/// Runs `__BODY__` against the tagged element `el`, wrapping the result in
/// `{ attached, value }`.
const WITH_REF_JS: &str = r#"
(() => {
    const el = document.querySelector('[data-portalbot-ref="__REF__"]');
    if (!el || !el.isConnected) return { attached: false, value: null };
    return { attached: true, value: (() => { __BODY__ })() };
})()
"#;

#[derive(Debug, Deserialize)]
struct Probe<T> {
    attached: bool,
    value: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Point {
    x: f64,
    y: f64,
}

/// Access layer bound to one chromiumoxide page.
#[derive(Clone)]
pub struct CdpAccessLayer {
    page: Page,
    session_id: String,
}

impl CdpAccessLayer {
    pub fn new(page: Page, session_id: impl Into<String>) -> Self {
        Self {
            page,
            session_id: session_id.into(),
        }
    }

    async fn evaluate<T: DeserializeOwned>(&self, js: &str) -> Result<T, BrowserError> {
        self.page
            .evaluate(js)
            .await
            .map_err(BrowserError::from)?
            .into_value()
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))
    }

    /// Resolve a selector once, without waiting.
    async fn resolve_now(&self, selector: &Selector) -> Result<Option<ElementHandle>, BrowserError> {
        let spec = serde_json::to_string(selector)
            .map_err(|e| BrowserError::InvalidSelector(e.to_string()))?;
        let js = RESOLVE_JS.replace("__SPEC__", &spec);
        let ref_: u32 = self.evaluate(&js).await?;
        Ok((ref_ > 0).then(|| ElementHandle::new(ref_, selector.clone())))
    }

    async fn resolve_required(&self, selector: &Selector) -> Result<ElementHandle, BrowserError> {
        selector.validate()?;
        self.resolve_now(selector)
            .await?
            .ok_or_else(|| BrowserError::StaleElement(format!("no element matches {selector}")))
    }

    async fn with_ref<T: DeserializeOwned>(
        &self,
        handle: &ElementHandle,
        body: &str,
    ) -> Result<T, BrowserError> {
        let js = WITH_REF_JS
            .replace("__REF__", &handle.ref_id().to_string())
            .replace("__BODY__", body);
        let probe: Probe<T> = self.evaluate(&js).await?;
        match probe {
            Probe {
                attached: true,
                value: Some(value),
            } => Ok(value),
            Probe { attached: true, .. } => Err(BrowserError::JsEvalFailed(format!(
                "no value read from {}",
                handle.selector()
            ))),
            Probe { attached: false, .. } => Err(BrowserError::StaleElement(
                handle.selector().to_string(),
            )),
        }
    }

    async fn mouse_click(&self, selector: &Selector, button: MouseButton) -> Result<(), BrowserError> {
        let handle = self.resolve_required(selector).await?;

        let center: Point = self
            .with_ref(
                &handle,
                "el.scrollIntoView({ block: 'center', inline: 'center' });
                 const r = el.getBoundingClientRect();
                 return { x: r.left + r.width / 2, y: r.top + r.height / 2 };",
            )
            .await?;

        for event_type in [
            DispatchMouseEventType::MousePressed,
            DispatchMouseEventType::MouseReleased,
        ] {
            let cmd = DispatchMouseEventParams::builder()
                .r#type(event_type)
                .x(center.x)
                .y(center.y)
                .button(button.clone())
                .click_count(1)
                .build()
                .map_err(BrowserError::Cdp)?;
            self.page.execute(cmd).await?;
        }

        debug!(
            session_id = %self.session_id,
            selector = %selector,
            x = center.x,
            y = center.y,
            ?button,
            "clicked element"
        );
        Ok(())
    }
}

#[async_trait]
impl AccessLayer for CdpAccessLayer {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        crate::types::validate_url(url)?;

        self.page.goto(url).await.map_err(|e| match BrowserError::from(e) {
            BrowserError::Cdp(msg) => BrowserError::NavigationFailed(msg),
            other => other,
        })?;
        // Portal pages keep loading after the first response.
        if let Err(e) = self.page.wait_for_navigation().await {
            debug!(session_id = %self.session_id, url, error = %e, "navigation did not settle");
        }

        debug!(session_id = %self.session_id, url, "navigated");
        Ok(())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> Result<(), BrowserError> {
        let handle = self.resolve_required(selector).await?;

        let _: bool = self
            .with_ref(
                &handle,
                "el.focus();
                 if ('value' in el) {
                     el.value = '';
                     el.dispatchEvent(new Event('input', { bubbles: true }));
                 }
                 return true;",
            )
            .await?;

        for c in text.chars() {
            for event_type in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
                let cmd = DispatchKeyEventParams::builder()
                    .r#type(event_type)
                    .text(c.to_string())
                    .build()
                    .map_err(BrowserError::Cdp)?;
                self.page.execute(cmd).await?;
            }
        }

        let _: bool = self
            .with_ref(
                &handle,
                "el.dispatchEvent(new Event('change', { bubbles: true })); return true;",
            )
            .await?;

        debug!(session_id = %self.session_id, selector = %selector, chars = text.chars().count(), "filled field");
        Ok(())
    }

    async fn click(&self, selector: &Selector) -> Result<(), BrowserError> {
        self.mouse_click(selector, MouseButton::Left).await
    }

    async fn right_click(&self, selector: &Selector) -> Result<(), BrowserError> {
        self.mouse_click(selector, MouseButton::Right).await
    }

    async fn wait_for_selector(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<ElementHandle, BrowserError> {
        selector.validate()?;
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(handle) = self.resolve_now(selector).await? {
                debug!(session_id = %self.session_id, selector = %selector, ref_ = handle.ref_id(), "element found");
                return Ok(handle);
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{selector} not found after {}ms",
                    timeout.as_millis()
                )));
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn read_text(&self, handle: &ElementHandle) -> Result<String, BrowserError> {
        self.with_ref(
            handle,
            "return (el.innerText || el.textContent || '').trim();",
        )
        .await
    }

    async fn read_attribute(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let name = serde_json::to_string(name).map_err(|e| BrowserError::Cdp(e.to_string()))?;
        let body = format!(
            "const name = {name};
             if (name === 'value' && 'value' in el) return [String(el.value)];
             const v = el.getAttribute(name);
             return v === null ? [] : [v];"
        );
        let values: Vec<String> = self.with_ref(handle, &body).await?;
        Ok(values.into_iter().next())
    }

    async fn read_cells(&self, row: &ElementHandle) -> Result<Vec<String>, BrowserError> {
        self.with_ref(
            row,
            "return Array.from(el.querySelectorAll('td, th'))
                 .map((c) => (c.innerText || c.textContent || '').trim());",
        )
        .await
    }

    async fn is_attached(&self, handle: &ElementHandle) -> Result<bool, BrowserError> {
        match self.with_ref::<bool>(handle, "return true;").await {
            Ok(_) => Ok(true),
            Err(BrowserError::StaleElement(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn current_title(&self) -> Result<String, BrowserError> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn page_content(&self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }
}
