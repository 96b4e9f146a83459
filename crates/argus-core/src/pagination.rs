//! Multi-page traversal for one source.
//!
//! The engine walks `Init → FetchingPage → Extracting → CheckingMore`
//! until it reaches `Done` or `Aborted`, accumulating records in
//! page-visitation order. It never raises: every failure downgrades to
//! "stop here and keep what we have", because partial listings are more
//! useful than none.

use std::fmt;

use crate::definition::{PaginationKind, ScraperDefinition};
use crate::error::ScrapeError;
use crate::events::{RunEvent, RunReporter};
use crate::extract::ExtractionStrategy;
use crate::record::PropertyRecord;
use crate::session::{PageSession, ScrapePolicy};

/// Why a traversal stopped. `RootNeverAppeared` and `FirstPageUnreachable`
/// are the aborted outcomes (empty result); everything else is a normal
/// stop that keeps accumulated records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The root selector never matched on the first page.
    RootNeverAppeared,
    /// Navigation to the first page failed.
    FirstPageUnreachable,
    /// The root selector stopped matching on a later page.
    PageTimeout,
    /// A page loaded but yielded zero records.
    EmptyPage,
    /// No next button / no pagination links were present.
    NoNextControl,
    /// The observed pagination ceiling was reached.
    LastPageReached,
    /// The configured maxPages bound was reached.
    MaxPagesReached,
    /// A pagination navigation (click or goto) failed.
    NavigationFailed,
    /// The session broke mid-traversal (query or read plumbing).
    SessionFailed,
    /// Pagination is disabled or `none`.
    SinglePage,
}

impl StopReason {
    /// Aborted stops discard the traversal; every other stop keeps
    /// whatever was accumulated.
    pub fn is_aborted(&self) -> bool {
        matches!(
            self,
            StopReason::RootNeverAppeared | StopReason::FirstPageUnreachable
        )
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::RootNeverAppeared => "root selector never appeared",
            StopReason::FirstPageUnreachable => "first page unreachable",
            StopReason::PageTimeout => "listings vanished on a later page",
            StopReason::EmptyPage => "page yielded no records",
            StopReason::NoNextControl => "no pagination control present",
            StopReason::LastPageReached => "observed last page reached",
            StopReason::MaxPagesReached => "configured page bound reached",
            StopReason::NavigationFailed => "pagination navigation failed",
            StopReason::SessionFailed => "session failed mid-traversal",
            StopReason::SinglePage => "single-page source",
        };
        f.write_str(text)
    }
}

/// Outcome of one source traversal.
#[derive(Debug, Clone)]
pub struct PageTraversal {
    /// Concatenation of per-page records, page 1 first, DOM order within
    /// a page.
    pub records: Vec<PropertyRecord>,
    /// Pages whose extraction ran (including a final empty page).
    pub pages_visited: u32,
    pub stop: StopReason,
}

enum State {
    FetchingPage,
    Extracting,
    CheckingMore,
    Done(StopReason),
    Aborted(StopReason),
}

enum Advance {
    Next,
    Stop(StopReason),
}

/// Drives the pagination state machine for one definition over one
/// exclusively-owned session.
pub struct PaginationEngine<'a, S: PageSession> {
    session: &'a S,
    definition: &'a ScraperDefinition,
    strategy: &'a ExtractionStrategy,
    policy: ScrapePolicy,
}

impl<'a, S: PageSession> PaginationEngine<'a, S> {
    pub fn new(
        session: &'a S,
        definition: &'a ScraperDefinition,
        strategy: &'a ExtractionStrategy,
        policy: ScrapePolicy,
    ) -> Self {
        Self {
            session,
            definition,
            strategy,
            policy,
        }
    }

    /// Traverse every reachable page. Infallible: failures end the
    /// traversal and are visible in [`PageTraversal::stop`].
    pub async fn run<R: RunReporter>(&self, reporter: &R) -> PageTraversal {
        let pagination = &self.definition.pagination;
        let mut records: Vec<PropertyRecord> = Vec::new();
        let mut page: u32 = 1;
        let mut pages_visited: u32 = 0;
        let mut state = State::FetchingPage;

        let stop = loop {
            state = match state {
                State::FetchingPage => {
                    // Page 1 always starts from the base URL. Later pages
                    // navigate only under url pagination; a button click
                    // has already moved the session.
                    let target = if page == 1 {
                        Some(self.definition.base_url.clone())
                    } else if pagination.mode() == PaginationKind::Url {
                        Some(pagination.page_url(page))
                    } else {
                        None
                    };
                    match self.open_page(target.as_deref(), page).await {
                        Ok(()) => State::Extracting,
                        Err(error) if page == 1 => {
                            tracing::warn!(
                                source = %self.definition.name,
                                %error,
                                "First page unavailable, treating source as empty"
                            );
                            State::Aborted(first_page_stop(&error))
                        }
                        Err(error) => {
                            tracing::warn!(
                                source = %self.definition.name,
                                %page,
                                %error,
                                "Page unavailable, stopping pagination"
                            );
                            State::Done(later_page_stop(&error))
                        }
                    }
                }
                State::Extracting => match self.strategy.extract_page(self.session).await {
                    Ok(page_records) => {
                        pages_visited += 1;
                        if page_records.is_empty() {
                            tracing::info!(
                                source = %self.definition.name,
                                %page,
                                "Empty page, stopping pagination"
                            );
                            State::Done(StopReason::EmptyPage)
                        } else {
                            reporter.report(RunEvent::PageScraped {
                                name: &self.definition.name,
                                page,
                                count: page_records.len(),
                            });
                            records.extend(page_records);
                            State::CheckingMore
                        }
                    }
                    Err(error) => {
                        tracing::warn!(
                            source = %self.definition.name,
                            %page,
                            %error,
                            "Extraction failed, keeping earlier pages"
                        );
                        State::Done(StopReason::SessionFailed)
                    }
                },
                State::CheckingMore => match pagination.mode() {
                    PaginationKind::None => State::Done(StopReason::SinglePage),
                    _ if self.page_capped(page + 1) => State::Done(StopReason::MaxPagesReached),
                    PaginationKind::Button => match self.advance_by_button().await {
                        Advance::Next => {
                            page += 1;
                            State::FetchingPage
                        }
                        Advance::Stop(reason) => State::Done(reason),
                    },
                    PaginationKind::Url => match self.check_url_ceiling(page).await {
                        Advance::Next => {
                            page += 1;
                            State::FetchingPage
                        }
                        Advance::Stop(reason) => State::Done(reason),
                    },
                },
                State::Done(reason) => break reason,
                State::Aborted(reason) => {
                    records.clear();
                    break reason;
                }
            };
        };

        tracing::debug!(
            source = %self.definition.name,
            records = records.len(),
            pages = pages_visited,
            stop = ?stop,
            "Pagination finished"
        );
        PageTraversal {
            records,
            pages_visited,
            stop,
        }
    }

    async fn open_page(&self, target: Option<&str>, page: u32) -> Result<(), ScrapeError> {
        if let Some(url) = target {
            tracing::debug!(source = %self.definition.name, %page, %url, "Fetching page");
            self.session.navigate(url).await?;
        }
        let wait = if page == 1 {
            self.policy.initial_wait
        } else {
            self.policy.page_wait
        };
        self.session
            .wait_for_selector(self.strategy.root_selector(), wait)
            .await
    }

    fn page_capped(&self, next_page: u32) -> bool {
        let max_pages = self.definition.pagination.max_pages;
        max_pages > 0 && next_page > max_pages
    }

    async fn advance_by_button(&self) -> Advance {
        let selector = &self.definition.pagination.next_button_selector;
        let buttons = match self.session.query_all(selector).await {
            Ok(buttons) => buttons,
            Err(error) => {
                tracing::warn!(source = %self.definition.name, %error, "Next-button lookup failed");
                return Advance::Stop(StopReason::SessionFailed);
            }
        };
        let Some(button) = buttons.first() else {
            tracing::info!(source = %self.definition.name, "No next button, pagination complete");
            return Advance::Stop(StopReason::NoNextControl);
        };
        if let Err(error) = self.session.click(button).await {
            tracing::warn!(source = %self.definition.name, %error, "Next-button click failed");
            return Advance::Stop(StopReason::NavigationFailed);
        }
        if let Err(error) = self
            .session
            .wait_for_navigation(self.policy.nav_settle_wait)
            .await
        {
            tracing::warn!(source = %self.definition.name, %error, "Navigation did not settle");
            return Advance::Stop(StopReason::NavigationFailed);
        }
        Advance::Next
    }

    /// Under url pagination the site's own links reveal how many pages
    /// exist; the largest numeric link text is the ceiling. Without a
    /// selector the caller trusts maxPages to bound the loop.
    async fn check_url_ceiling(&self, page: u32) -> Advance {
        let selector = &self.definition.pagination.selector;
        if selector.is_empty() {
            return Advance::Next;
        }
        let links = match self.session.query_all(selector).await {
            Ok(links) => links,
            Err(error) => {
                tracing::warn!(source = %self.definition.name, %error, "Pagination-link lookup failed");
                return Advance::Stop(StopReason::SessionFailed);
            }
        };
        if links.is_empty() {
            tracing::info!(source = %self.definition.name, "No pagination links, pagination complete");
            return Advance::Stop(StopReason::NoNextControl);
        }
        let mut ceiling: u32 = 0;
        for link in &links {
            if let Ok(text) = self.session.read_text(link).await {
                ceiling = ceiling.max(leading_int(text.trim()));
            }
        }
        tracing::debug!(source = %self.definition.name, %page, %ceiling, "Observed pagination ceiling");
        if page >= ceiling {
            Advance::Stop(StopReason::LastPageReached)
        } else {
            Advance::Next
        }
    }
}

fn first_page_stop(error: &ScrapeError) -> StopReason {
    match error {
        ScrapeError::SelectorTimeout { .. } => StopReason::RootNeverAppeared,
        _ => StopReason::FirstPageUnreachable,
    }
}

fn later_page_stop(error: &ScrapeError) -> StopReason {
    match error {
        ScrapeError::SelectorTimeout { .. } => StopReason::PageTimeout,
        _ => StopReason::NavigationFailed,
    }
}

/// Numeric prefix of a pagination-link text; "3", "3 of 10" -> 3,
/// "Siguiente" -> 0.
fn leading_int(text: &str) -> u32 {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
