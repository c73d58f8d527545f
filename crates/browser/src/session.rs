//! Browser session lifecycle: one isolated Chromium process per session.

use std::time::Duration;

use {
    async_trait::async_trait,
    chromiumoxide::{
        Browser, BrowserConfig as CdpBrowserConfig,
        cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams,
        handler::viewport::Viewport,
    },
    futures::StreamExt,
    tempfile::TempDir,
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

use crate::{
    access::{AccessLayer, BrowserSession, SessionProvider},
    cdp::CdpAccessLayer,
    error::BrowserError,
    types::BrowserConfig,
};

/// How long `release` waits for the browser process to exit before killing it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Launches a fresh, isolated Chromium for every acquired session.
pub struct SessionManager {
    config: BrowserConfig,
}

impl SessionManager {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            width: self.config.viewport_width,
            height: self.config.viewport_height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        }
    }

    fn build_launch_config(
        &self,
        chrome: &std::path::Path,
        profile_dir: &std::path::Path,
    ) -> Result<CdpBrowserConfig, BrowserError> {
        let mut builder = CdpBrowserConfig::builder();

        // chromiumoxide runs headless unless told otherwise
        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .chrome_executable(chrome)
            .user_data_dir(profile_dir)
            .viewport(self.viewport())
            .request_timeout(self.config.navigation_timeout());

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        builder = builder
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox");

        builder.build().map_err(|e| {
            BrowserError::LaunchFailed(format!("failed to build browser config: {e}"))
        })
    }
}

#[async_trait]
impl SessionProvider for SessionManager {
    async fn acquire(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let session_id = generate_session_id();
        let chrome = crate::detect::locate_browser(self.config.chrome_path.as_deref())?;

        let profile_dir = tempfile::Builder::new()
            .prefix("portalbot-profile-")
            .tempdir()
            .map_err(|e| BrowserError::LaunchFailed(format!("failed to create profile dir: {e}")))?;

        let launch = self.build_launch_config(&chrome, profile_dir.path())?;

        info!(
            session_id,
            chrome = %chrome.display(),
            headless = self.config.headless,
            viewport_width = self.config.viewport_width,
            viewport_height = self.config.viewport_height,
            "launching browser session"
        );

        let (mut browser, mut handler) = Browser::launch(launch)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let handler_session = session_id.clone();
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(session_id = handler_session, error = %e, "browser handler error");
                }
            }
            debug!(session_id = handler_session, "browser event handler exited");
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                // The process is up; do not leave it behind.
                let _ = browser.close().await;
                handler_task.abort();
                return Err(BrowserError::LaunchFailed(format!("failed to open page: {e}")));
            },
        };

        let viewport_cmd = SetDeviceMetricsOverrideParams::builder()
            .width(self.config.viewport_width)
            .height(self.config.viewport_height)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(BrowserError::Cdp)?;
        if let Err(e) = page.execute(viewport_cmd).await {
            warn!(session_id, error = %e, "failed to set page viewport");
        }

        Ok(Box::new(ChromeSession {
            access: CdpAccessLayer::new(page, session_id.clone()),
            id: session_id,
            browser,
            handler: Some(handler_task),
            _profile_dir: profile_dir,
        }))
    }
}

/// A live Chromium process with a single page.
struct ChromeSession {
    id: String,
    browser: Browser,
    access: CdpAccessLayer,
    handler: Option<JoinHandle<()>>,
    // Removed from disk when the session is dropped.
    _profile_dir: TempDir,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn access(&self) -> &dyn AccessLayer {
        &self.access
    }

    async fn release(mut self: Box<Self>) {
        if let Err(e) = self.browser.close().await {
            warn!(session_id = self.id, error = %e, "browser close failed");
        }

        match tokio::time::timeout(SHUTDOWN_GRACE, self.browser.wait()).await {
            Ok(Ok(_)) => {},
            Ok(Err(e)) => warn!(session_id = self.id, error = %e, "waiting for browser exit failed"),
            Err(_) => {
                warn!(session_id = self.id, "browser did not exit in time, killing");
                if let Some(Err(e)) = self.browser.kill().await {
                    warn!(session_id = self.id, error = %e, "failed to kill browser");
                }
            },
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        info!(session_id = self.id, "released browser session");
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        // Dropping `Browser` kills the child; the handler task must go too.
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// Generate a random session ID.
fn generate_session_id() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let id: u64 = rng.random();
    format!("session-{:016x}", id)
}
