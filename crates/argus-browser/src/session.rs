//! [`PageSession`] over a Chromium tab.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use argus_core::error::ScrapeError;
use argus_core::session::{PageSession, SessionProvider};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, Element, Page};

/// How often `wait_for_selector` re-probes the DOM.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Hands out one tab per scrape job. Clones share the browser.
#[derive(Clone)]
pub struct CdpSessionProvider {
    browser: Arc<Browser>,
    op_timeout: Duration,
}

impl CdpSessionProvider {
    pub(crate) fn new(browser: Arc<Browser>, op_timeout: Duration) -> Self {
        Self {
            browser,
            op_timeout,
        }
    }
}

impl SessionProvider for CdpSessionProvider {
    type Session = CdpSession;

    async fn acquire(&self) -> Result<CdpSession, ScrapeError> {
        let page = tokio::time::timeout(self.op_timeout, self.browser.new_page("about:blank"))
            .await
            .map_err(|_| ScrapeError::SessionError("opening a tab timed out".into()))?
            .map_err(|e| ScrapeError::SessionError(format!("failed to open a tab: {e}")))?;
        Ok(CdpSession {
            page: Some(page),
            op_timeout: self.op_timeout,
        })
    }
}

/// One tab, exclusively owned by one job. The tab closes on
/// [`close`](PageSession::close) or, if the job was cancelled, from
/// `Drop`.
pub struct CdpSession {
    // `None` once closed; Drop only cleans up what close() didn't.
    page: Option<Page>,
    op_timeout: Duration,
}

impl CdpSession {
    fn page(&self) -> Result<&Page, ScrapeError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScrapeError::SessionError("session already closed".into()))
    }

    /// Run one CDP operation under the per-operation bound so a dead
    /// browser connection cannot wedge a job from inside.
    async fn bounded<T>(
        &self,
        what: &str,
        op: impl Future<Output = Result<T, CdpError>>,
    ) -> Result<T, ScrapeError> {
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ScrapeError::SessionError(format!("{what} failed: {e}"))),
            Err(_) => Err(ScrapeError::SessionError(format!(
                "{what} timed out after {}s",
                self.op_timeout.as_secs()
            ))),
        }
    }
}

impl PageSession for CdpSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        let page = self.page()?;
        let op = async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        };
        match tokio::time::timeout(self.op_timeout, op).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ScrapeError::NavigationError(format!("goto {url}: {e}"))),
            Err(_) => Err(ScrapeError::NavigationError(format!(
                "goto {url} timed out after {}s",
                self.op_timeout.as_secs()
            ))),
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), ScrapeError> {
        let page = self.page()?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout(self.op_timeout, page.find_element(selector)).await {
                Ok(Ok(_)) => return Ok(()),
                Ok(Err(_)) => {} // not present yet
                Err(_) => {
                    return Err(ScrapeError::SessionError(format!(
                        "selector probe for `{selector}` timed out"
                    )));
                }
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(ScrapeError::SelectorTimeout {
                    selector: selector.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(POLL_INTERVAL.min(remaining)).await;
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Element>, ScrapeError> {
        let page = self.page()?;
        self.bounded("query", page.find_elements(selector)).await
    }

    async fn find_in(
        &self,
        root: &Element,
        selector: &str,
    ) -> Result<Option<Element>, ScrapeError> {
        // A missing child and a failed scoped query both read as absent;
        // per-field fault isolation upstream turns either into an empty
        // field.
        match tokio::time::timeout(self.op_timeout, root.find_element(selector)).await {
            Ok(Ok(element)) => Ok(Some(element)),
            Ok(Err(_)) => Ok(None),
            Err(_) => Err(ScrapeError::SessionError(format!(
                "scoped query for `{selector}` timed out"
            ))),
        }
    }

    async fn read_text(&self, element: &Element) -> Result<String, ScrapeError> {
        let text = self.bounded("text read", element.inner_text()).await?;
        Ok(text.unwrap_or_default())
    }

    async fn read_attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, ScrapeError> {
        self.bounded("attribute read", element.attribute(name)).await
    }

    async fn click(&self, element: &Element) -> Result<(), ScrapeError> {
        self.bounded("click", element.click()).await.map(|_| ())
    }

    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), ScrapeError> {
        let page = self.page()?;
        match tokio::time::timeout(timeout, page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScrapeError::NavigationError(format!(
                "navigation did not settle: {e}"
            ))),
            Err(_) => Err(ScrapeError::NavigationError(format!(
                "navigation did not settle within {}s",
                timeout.as_secs()
            ))),
        }
    }

    async fn current_url(&self) -> Result<String, ScrapeError> {
        let page = self.page()?;
        let url = self.bounded("url read", page.url()).await?;
        Ok(url.unwrap_or_default())
    }

    async fn close(mut self) -> Result<(), ScrapeError> {
        if let Some(page) = self.page.take() {
            tokio::time::timeout(self.op_timeout, page.close())
                .await
                .map_err(|_| ScrapeError::SessionError("closing the tab timed out".into()))?
                .map_err(|e| ScrapeError::SessionError(format!("failed to close the tab: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for CdpSession {
    // Cancelled jobs drop their session without close(); the tab must
    // still go away or the browser accumulates zombies.
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = page.close().await;
                });
            }
        }
    }
}
