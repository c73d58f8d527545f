//! Browser detection and install guidance.

use std::path::{Path, PathBuf};

use crate::error::BrowserError;

/// Chromium-based executable names looked up on `PATH`.
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "chrome",
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "microsoft-edge",
    "microsoft-edge-stable",
    "brave-browser",
];

/// Fixed install locations checked before `PATH`.
#[cfg(target_os = "macos")]
const PLATFORM_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(target_os = "windows")]
const PLATFORM_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PLATFORM_PATHS: &[&str] = &[];

/// Find a Chromium-based browser.
///
/// Order: configured path, `CHROME` env var, platform install paths, `PATH`.
/// A configured path that does not exist is an error rather than a silent
/// fallback, so a typo in the config surfaces immediately.
pub fn locate_browser(custom_path: Option<&str>) -> Result<PathBuf, BrowserError> {
    if let Some(path) = custom_path {
        let p = PathBuf::from(path);
        return if p.exists() {
            Ok(p)
        } else {
            Err(BrowserError::BrowserNotAvailable(format!(
                "configured chrome_path {} does not exist",
                p.display()
            )))
        };
    }

    std::env::var("CHROME")
        .ok()
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .or_else(|| {
            PLATFORM_PATHS
                .iter()
                .map(Path::new)
                .find(|p| p.exists())
                .map(Path::to_path_buf)
        })
        .or_else(|| {
            CHROMIUM_EXECUTABLES
                .iter()
                .find_map(|name| which::which(name).ok())
        })
        .ok_or_else(|| BrowserError::BrowserNotAvailable(install_hint()))
}

/// Platform-specific install instructions.
pub fn install_hint() -> String {
    let instructions = if cfg!(target_os = "macos") {
        "brew install --cask google-chrome"
    } else if cfg!(target_os = "windows") {
        "winget install Google.Chrome"
    } else {
        "sudo apt install chromium  (or: dnf install chromium / pacman -S chromium)"
    };

    format!(
        "no Chromium-based browser found. Install one with:\n  {instructions}\n\
         or set [browser] chrome_path in portalbot.toml, or the CHROME environment variable."
    )
}
