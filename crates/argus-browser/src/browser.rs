//! Headless Chromium lifecycle.
//!
//! One Chromium process backs the whole service; every scrape job gets
//! its own tab through [`HeadlessBrowser::provider`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use argus_core::error::ScrapeError;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;

use crate::session::CdpSessionProvider;

/// Launch settings for the shared Chromium process.
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// Explicit Chrome/Chromium binary. `None` probes `CHROME_BIN` and
    /// well-known install locations, then lets chromiumoxide look for
    /// itself.
    pub chrome_binary: Option<PathBuf>,
    /// Whether to keep the Chromium sandbox. Off by default because
    /// containerized scrape rigs usually run as root, where the sandbox
    /// refuses to start.
    pub sandbox: bool,
    /// Upper bound on each individual CDP operation (open tab,
    /// navigation, query, read).
    pub op_timeout: Duration,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_binary: None,
            sandbox: false,
            op_timeout: Duration::from_secs(30),
        }
    }
}

impl BrowserSettings {
    pub fn with_chrome_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_binary = Some(path.into());
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }
}

/// A running headless Chromium. Cloning shares the process; it stays up
/// until the last clone is dropped.
#[derive(Clone)]
pub struct HeadlessBrowser {
    browser: Arc<Browser>,
    op_timeout: Duration,
}

impl HeadlessBrowser {
    pub async fn launch(settings: BrowserSettings) -> Result<Self, ScrapeError> {
        let mut builder = BrowserConfig::builder();
        if !settings.sandbox {
            builder = builder.no_sandbox();
        }
        builder = builder.disable_default_args();

        // Snap-packaged Chromium exposes a wrapper that rejects standard
        // Chrome CLI flags (--headless, --disable-gpu, …). We try to
        // locate the real binary buried inside the snap, falling back to
        // any other Chrome/Chromium the user may have installed.
        if let Some(bin) = settings.chrome_binary.or_else(find_chrome_binary) {
            tracing::info!("Using Chrome binary: {}", bin.display());
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--disable-translate")
            .arg("--no-first-run")
            .build()
            .map_err(|e| ScrapeError::ConfigError(format!("browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::SessionError(format!("failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection
        // to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            op_timeout: settings.op_timeout,
        })
    }

    /// Session provider backed by this process; each acquired session is
    /// a fresh tab.
    pub fn provider(&self) -> CdpSessionProvider {
        CdpSessionProvider::new(Arc::clone(&self.browser), self.op_timeout)
    }
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// On systems where Chromium is installed via snap, the wrapper at
/// `/snap/bin/chromium` strips unknown CLI flags, breaking headless
/// mode. We look for the real binary inside the snap first, then fall
/// back to well-known system paths. If nothing is found we return `None`
/// and let chromiumoxide do its own lookup.
fn find_chrome_binary() -> Option<PathBuf> {
    let candidates: &[&str] = &[
        // Snap (Ubuntu default)
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        // Flatpak
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        // Common apt / manual installs
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}
