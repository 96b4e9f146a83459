//! Per-host navigation spacing for polite scraping.
//!
//! [`PoliteProvider`] wraps any [`SessionProvider`]; the sessions it
//! hands out space their navigations so that consecutive page loads
//! against the same host sit at least a configured delay apart. The
//! spacing ledger is shared across all sessions from one provider, so
//! concurrent jobs aimed at the same site queue up instead of piling on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use url::Url;

use crate::error::ScrapeError;
use crate::session::{PageSession, SessionProvider};

/// Navigation spacing knobs.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    /// Minimum gap between navigations to the same host. Zero disables
    /// throttling entirely.
    pub delay: Duration,
    /// Random jitter added on top of `delay` (uniform [0, jitter]), so
    /// request timing does not tick like a metronome.
    pub jitter: Duration,
}

impl ThrottleConfig {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        self.delay + Duration::from_millis(rand_jitter_ms(self.jitter.as_millis() as u64))
    }
}

impl Default for ThrottleConfig {
    /// 1 second plus up to 500ms jitter.
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            jitter: Duration::from_millis(500),
        }
    }
}

type HostLedger = Arc<Mutex<HashMap<String, Instant>>>;

/// Provider decorator whose sessions are throttled per host.
#[derive(Clone)]
pub struct PoliteProvider<P> {
    inner: P,
    config: ThrottleConfig,
    last_nav: HostLedger,
}

impl<P> PoliteProvider<P> {
    pub fn new(inner: P, config: ThrottleConfig) -> Self {
        Self {
            inner,
            config,
            last_nav: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<P: SessionProvider> SessionProvider for PoliteProvider<P> {
    type Session = PoliteSession<P::Session>;

    async fn acquire(&self) -> Result<Self::Session, ScrapeError> {
        Ok(PoliteSession {
            inner: self.inner.acquire().await?,
            config: self.config,
            last_nav: Arc::clone(&self.last_nav),
        })
    }
}

/// Session wrapper that spaces navigations; every other operation
/// passes straight through.
pub struct PoliteSession<S> {
    inner: S,
    config: ThrottleConfig,
    last_nav: HostLedger,
}

impl<S> PoliteSession<S> {
    /// Spacing key for a URL: scheme + host + resolved port, so that
    /// http and https against one host count separately.
    fn host_key(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        let host = url.host_str()?;
        let port = url
            .port_or_known_default()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        Some(format!("{}://{}{}", url.scheme(), host, port))
    }

    async fn wait_for_host(&self, host: &str) {
        let mut ledger = self.last_nav.lock().await;
        if let Some(&last) = ledger.get(host) {
            let elapsed = last.elapsed();
            let required = self.config.effective_delay();
            if elapsed < required {
                let pause = required - elapsed;
                // Drop the lock while sleeping so other hosts keep moving.
                drop(ledger);
                tracing::debug!(%host, pause_ms = %pause.as_millis(), "Spacing navigation");
                tokio::time::sleep(pause).await;
                let mut ledger = self.last_nav.lock().await;
                ledger.insert(host.to_string(), Instant::now());
                return;
            }
        }
        ledger.insert(host.to_string(), Instant::now());
    }
}

impl<S: PageSession> PageSession for PoliteSession<S> {
    type Element = S::Element;

    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        if !self.config.delay.is_zero() {
            if let Some(host) = Self::host_key(url) {
                self.wait_for_host(&host).await;
            }
        }
        self.inner.navigate(url).await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScrapeError> {
        self.inner.wait_for_selector(selector, timeout).await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<S::Element>, ScrapeError> {
        self.inner.query_all(selector).await
    }

    async fn find_in(
        &self,
        root: &S::Element,
        selector: &str,
    ) -> Result<Option<S::Element>, ScrapeError> {
        self.inner.find_in(root, selector).await
    }

    async fn read_text(&self, element: &S::Element) -> Result<String, ScrapeError> {
        self.inner.read_text(element).await
    }

    async fn read_attribute(
        &self,
        element: &S::Element,
        name: &str,
    ) -> Result<Option<String>, ScrapeError> {
        self.inner.read_attribute(element, name).await
    }

    async fn click(&self, element: &S::Element) -> Result<(), ScrapeError> {
        self.inner.click(element).await
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), ScrapeError> {
        self.inner.wait_for_navigation(timeout).await
    }

    async fn current_url(&self) -> Result<String, ScrapeError> {
        self.inner.current_url().await
    }

    async fn close(self) -> Result<(), ScrapeError> {
        self.inner.close().await
    }
}

// Jitter without the rand crate: xorshift64 seeded from the clock.
// Plenty for timing noise, not for anything security-shaped.
fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}
