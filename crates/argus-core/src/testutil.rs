//! Test utilities: a scriptable fake site plus mock session plumbing.
//!
//! Handwritten mocks for dependency injection in unit tests. Shared
//! state lives behind `Arc<Mutex<_>>`/atomics so tests can assert on
//! recorded navigations, open-session counts, and reported events.
//! Selector waits resolve immediately (present or timeout); only a
//! hanging session ever sleeps.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::definition::{PaginationConfig, ScraperDefinition};
use crate::error::ScrapeError;
use crate::events::{RunEvent, RunReporter};
use crate::session::{PageSession, SessionProvider};

// ---------------------------------------------------------------------------
// Fake DOM
// ---------------------------------------------------------------------------

/// One fake DOM node: text, attributes, selector-addressed children, and
/// an optional navigation target fired on click.
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    text: String,
    attrs: HashMap<String, String>,
    children: HashMap<String, FakeElement>,
    click_target: Option<String>,
    fail_reads: bool,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element whose text content is `text`.
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    /// Element whose reads (text, attributes, clicks) all fail.
    pub fn failing() -> Self {
        Self {
            fail_reads: true,
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, selector: &str, child: FakeElement) -> Self {
        self.children.insert(selector.to_string(), child);
        self
    }

    /// Clicking this element navigates the session to `url`.
    pub fn with_click_target(mut self, url: &str) -> Self {
        self.click_target = Some(url.to_string());
        self
    }
}

/// Elements reachable on one fake page, keyed by selector.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, selector: &str, element: FakeElement) -> Self {
        self.with_elements(selector, vec![element])
    }

    /// Selector waits succeed for any registered selector, even with an
    /// empty element list; that scripts the "listings vanished between
    /// wait and query" race.
    pub fn with_elements(mut self, selector: &str, elements: Vec<FakeElement>) -> Self {
        self.elements.insert(selector.to_string(), elements);
        self
    }
}

/// A set of fake pages keyed by URL. URLs not present behave like blank
/// pages: navigation succeeds but every selector wait times out.
#[derive(Debug, Default)]
pub struct FakeSite {
    pages: HashMap<String, FakePage>,
    nav_failures: HashSet<String>,
    hangs: HashSet<String>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Navigating to `url` fails with a navigation error.
    pub fn with_nav_failure(mut self, url: &str) -> Self {
        self.nav_failures.insert(url.to_string());
        self
    }

    /// Navigating to `url` never completes, for timeout tests.
    pub fn with_hanging_page(mut self, url: &str) -> Self {
        self.hangs.insert(url.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// MockSession
// ---------------------------------------------------------------------------

/// Page session over a [`FakeSite`]. Records every attempted navigation
/// in a log shared with its provider.
pub struct MockSession {
    site: Arc<FakeSite>,
    current: Mutex<Option<String>>,
    nav_log: Arc<Mutex<Vec<String>>>,
    open_sessions: Arc<AtomicUsize>,
    closed: bool,
}

impl MockSession {
    fn goto(&self, url: &str) -> Result<(), ScrapeError> {
        self.nav_log.lock().unwrap().push(url.to_string());
        if self.site.nav_failures.contains(url) {
            return Err(ScrapeError::NavigationError(format!(
                "scripted navigation failure for {url}"
            )));
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    fn with_current_page<T>(&self, f: impl FnOnce(Option<&FakePage>) -> T) -> T {
        let current = self.current.lock().unwrap();
        f(current.as_deref().and_then(|url| self.site.pages.get(url)))
    }

    fn mark_closed(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_sessions.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl PageSession for MockSession {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        if self.site.hangs.contains(url) {
            tokio::time::sleep(Duration::from_secs(86_400)).await;
        }
        self.goto(url)
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScrapeError> {
        let present =
            self.with_current_page(|page| page.is_some_and(|p| p.elements.contains_key(selector)));
        if present {
            Ok(())
        } else {
            Err(ScrapeError::SelectorTimeout {
                selector: selector.to_string(),
                waited_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<FakeElement>, ScrapeError> {
        Ok(self.with_current_page(|page| {
            page.and_then(|p| p.elements.get(selector))
                .cloned()
                .unwrap_or_default()
        }))
    }

    async fn find_in(
        &self,
        root: &FakeElement,
        selector: &str,
    ) -> Result<Option<FakeElement>, ScrapeError> {
        Ok(root.children.get(selector).cloned())
    }

    async fn read_text(&self, element: &FakeElement) -> Result<String, ScrapeError> {
        if element.fail_reads {
            return Err(ScrapeError::SessionError("scripted read failure".into()));
        }
        Ok(element.text.clone())
    }

    async fn read_attribute(
        &self,
        element: &FakeElement,
        name: &str,
    ) -> Result<Option<String>, ScrapeError> {
        if element.fail_reads {
            return Err(ScrapeError::SessionError("scripted read failure".into()));
        }
        Ok(element.attrs.get(name).cloned())
    }

    async fn click(&self, element: &FakeElement) -> Result<(), ScrapeError> {
        if element.fail_reads {
            return Err(ScrapeError::SessionError("scripted click failure".into()));
        }
        match &element.click_target {
            Some(url) => self.goto(url),
            None => Ok(()),
        }
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<(), ScrapeError> {
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ScrapeError> {
        Ok(self.current.lock().unwrap().clone().unwrap_or_default())
    }

    async fn close(mut self) -> Result<(), ScrapeError> {
        self.mark_closed();
        Ok(())
    }
}

impl Drop for MockSession {
    // Cancellation drops sessions without close(); the counter must
    // still come back down, like the real adapter's drop cleanup.
    fn drop(&mut self) {
        self.mark_closed();
    }
}

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

/// Session provider over a [`FakeSite`], tracking acquisitions and
/// outstanding (unclosed) sessions.
#[derive(Clone)]
pub struct MockProvider {
    site: Arc<FakeSite>,
    nav_log: Arc<Mutex<Vec<String>>>,
    open_sessions: Arc<AtomicUsize>,
    total_acquired: Arc<AtomicUsize>,
    acquire_error: Arc<Mutex<Option<ScrapeError>>>,
}

impl MockProvider {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            nav_log: Arc::new(Mutex::new(Vec::new())),
            open_sessions: Arc::new(AtomicUsize::new(0)),
            total_acquired: Arc::new(AtomicUsize::new(0)),
            acquire_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Provider whose next acquire fails with `error`.
    pub fn with_acquire_error(error: ScrapeError) -> Self {
        let provider = Self::new(FakeSite::new());
        *provider.acquire_error.lock().unwrap() = Some(error);
        provider
    }

    /// Every navigation attempted by any session, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.nav_log.lock().unwrap().clone()
    }

    /// Sessions acquired and not yet closed or dropped.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    pub fn total_acquired(&self) -> usize {
        self.total_acquired.load(Ordering::SeqCst)
    }
}

impl SessionProvider for MockProvider {
    type Session = MockSession;

    async fn acquire(&self) -> Result<MockSession, ScrapeError> {
        let mut err = self.acquire_error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.total_acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            site: Arc::clone(&self.site),
            current: Mutex::new(None),
            nav_log: Arc::clone(&self.nav_log),
            open_sessions: Arc::clone(&self.open_sessions),
            closed: false,
        })
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock run reporter that records event labels.
#[derive(Default, Clone)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl RunReporter for MockReporter {
    fn report(&self, event: RunEvent<'_>) {
        let label = match &event {
            RunEvent::RunStarted { .. } => "RunStarted".to_string(),
            RunEvent::SourceStarted { name } => format!("SourceStarted:{name}"),
            RunEvent::PageScraped { page, .. } => format!("PageScraped:{page}"),
            RunEvent::SourceCompleted { name, records, .. } => {
                format!("SourceCompleted:{name}:{records}")
            }
            RunEvent::SourceFailed { name, .. } => format!("SourceFailed:{name}"),
            RunEvent::SourceTimedOut { name, .. } => format!("SourceTimedOut:{name}"),
            RunEvent::RunCompleted { .. } => "RunCompleted".to_string(),
        };
        self.events.lock().unwrap().push(label);
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// A definition with the standard test mappings (title/price/link/image/
/// location) rooted at `.property-item`, no pagination.
pub fn make_test_definition(name: &str, base_url: &str) -> ScraperDefinition {
    ScraperDefinition {
        name: name.to_string(),
        base_url: base_url.to_string(),
        root_selector: ".property-item".to_string(),
        field_mappings: HashMap::from([
            ("title".to_string(), ".title".to_string()),
            ("price".to_string(), ".price".to_string()),
            ("url".to_string(), "a.more".to_string()),
            ("imgUrl".to_string(), "img".to_string()),
            ("location".to_string(), ".location".to_string()),
        ]),
        pagination: PaginationConfig::single_page(),
    }
}

/// A listing element matching [`make_test_definition`]'s mappings.
pub fn make_listing(title: &str, price: &str, href: &str) -> FakeElement {
    FakeElement::new()
        .with_child(".title", FakeElement::text(title))
        .with_child(".price", FakeElement::text(price))
        .with_child("a.more", FakeElement::new().with_attr("href", href))
}
