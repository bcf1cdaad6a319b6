//! Opening the authorization URL in the user's browser

/// Opens URLs for the interactive authorization step.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<(), String>;
}

/// The OS default browser, launched detached (`open`, `xdg-open`, `start`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), String> {
        open::that_detached(url).map_err(|e| format!("Failed to open URL: {}", e))
    }
}
