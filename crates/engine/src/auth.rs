//! Portal login.

use {
    secrecy::ExposeSecret,
    tracing::{debug, info, warn},
};

use crate::{driver::SessionDriver, error::EngineError, model::Credentials, profile::PortalProfile};

/// Log in and wait for the landing page to identify itself.
///
/// Returns `Ok(false)` when the portal cannot be reached or the title never
/// shows the configured marker. Only fatal browser errors and cancellation
/// come back as `Err`. The login is attempted once; individual steps are
/// retried by the driver.
pub async fn login(
    driver: &mut SessionDriver<'_>,
    profile: &PortalProfile,
    credentials: &Credentials,
) -> Result<bool, EngineError> {
    let session_id = driver.session_id().to_string();
    info!(session_id, username = %credentials.username, "logging in to portal");

    match submit(driver, profile, credentials).await {
        Ok(()) => {},
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(session_id, error = %e, "login form could not be submitted");
            return Ok(false);
        },
    }

    let marker = profile.login_title_marker();
    match driver.wait_for_title(marker, profile.login_timeout()).await {
        Ok(true) => {
            info!(session_id, "login succeeded");
            Ok(true)
        },
        Ok(false) => {
            let title = driver.title().await.unwrap_or_default();
            warn!(session_id, title = %title, marker, "login failed, landing page not reached");
            Ok(false)
        },
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!(session_id, error = %e, "login failed, landing page could not be checked");
            Ok(false)
        },
    }
}

async fn submit(
    driver: &mut SessionDriver<'_>,
    profile: &PortalProfile,
    credentials: &Credentials,
) -> Result<(), EngineError> {
    driver.navigate(profile.url()).await?;
    driver
        .fill(&profile.username_field(), &credentials.username)
        .await?;
    driver
        .fill(&profile.password_field(), credentials.password.expose_secret())
        .await?;
    debug!(session_id = %driver.session_id(), "credentials entered");
    driver.click(&profile.login_button()).await
}
