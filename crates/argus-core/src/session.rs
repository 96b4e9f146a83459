use std::future::Future;
use std::time::Duration;

use crate::error::ScrapeError;

/// Wait-policy knobs for one source traversal.
///
/// The first page gets a longer root-selector wait than later ones: a
/// source that is merely slow to render should not be confused with one
/// whose pagination ran out.
#[derive(Debug, Clone, Copy)]
pub struct ScrapePolicy {
    /// Root-selector wait on the first page.
    pub initial_wait: Duration,
    /// Root-selector wait on subsequent pages.
    pub page_wait: Duration,
    /// How long to let a click-triggered navigation settle.
    pub nav_settle_wait: Duration,
}

impl Default for ScrapePolicy {
    fn default() -> Self {
        Self {
            initial_wait: Duration::from_secs(15),
            page_wait: Duration::from_secs(10),
            nav_settle_wait: Duration::from_secs(10),
        }
    }
}

impl ScrapePolicy {
    pub fn with_initial_wait(mut self, wait: Duration) -> Self {
        self.initial_wait = wait;
        self
    }

    pub fn with_page_wait(mut self, wait: Duration) -> Self {
        self.page_wait = wait;
        self
    }

    pub fn with_nav_settle_wait(mut self, wait: Duration) -> Self {
        self.nav_settle_wait = wait;
        self
    }
}

/// One controllable browser page/tab.
///
/// Sessions are exclusively owned by a single job; nothing here is
/// `Clone`. All element reads go through handles produced by
/// [`query_all`](PageSession::query_all) or scoped lookups via
/// [`find_in`](PageSession::find_in), mirroring how a DOM driver hands
/// out node references.
pub trait PageSession: Send + Sync {
    type Element: Send + Sync;

    fn navigate(&self, url: &str) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// Resolves once `selector` matches at least one element, or fails
    /// with [`ScrapeError::SelectorTimeout`] after `timeout`.
    fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// All elements currently matching `selector`, in DOM order.
    fn query_all(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Vec<Self::Element>, ScrapeError>> + Send;

    /// First element matching `selector` inside `root`, if any.
    fn find_in(
        &self,
        root: &Self::Element,
        selector: &str,
    ) -> impl Future<Output = Result<Option<Self::Element>, ScrapeError>> + Send;

    fn read_text(
        &self,
        element: &Self::Element,
    ) -> impl Future<Output = Result<String, ScrapeError>> + Send;

    fn read_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, ScrapeError>> + Send;

    fn click(&self, element: &Self::Element)
    -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// Waits for a click-triggered navigation to settle. Errors signal
    /// the navigation never completed; callers treat that as "no next
    /// page" rather than a hard failure.
    fn wait_for_navigation(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ScrapeError>> + Send;

    /// Current page URL, used for resolving relative links.
    fn current_url(&self) -> impl Future<Output = Result<String, ScrapeError>> + Send;

    fn close(self) -> impl Future<Output = Result<(), ScrapeError>> + Send;
}

/// Hands out fresh page sessions, one per job.
///
/// Providers are cheap to clone (shared browser handle underneath) so
/// the fan-out can move one into each spawned job.
pub trait SessionProvider: Send + Sync + Clone {
    type Session: PageSession;

    fn acquire(&self) -> impl Future<Output = Result<Self::Session, ScrapeError>> + Send;
}
