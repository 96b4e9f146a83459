//! Single-source scrape lifecycle.
//!
//! [`ScraperRunner`] owns the acquire → traverse → validate → release
//! sequence for one definition. It never raises: any failure produces an
//! empty record set, with the cause reported through [`RunEvent`]s.

use crate::definition::ScraperDefinition;
use crate::events::{RunEvent, RunReporter};
use crate::extract::ExtractionStrategy;
use crate::pagination::PaginationEngine;
use crate::record::PropertyRecord;
use crate::session::{PageSession, ScrapePolicy, SessionProvider};

/// Runs one definition to completion over a session acquired from the
/// provider. The session is exclusive to the run and released on every
/// exit path (explicitly on completion, by drop on cancellation).
pub struct ScraperRunner<P: SessionProvider> {
    provider: P,
    policy: ScrapePolicy,
}

impl<P: SessionProvider> ScraperRunner<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            policy: ScrapePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ScrapePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Scrape every reachable page of `definition` and return the
    /// validated records. Infallible by contract: a source that cannot
    /// be scraped contributes nothing, and the reporter carries the why.
    pub async fn run<R: RunReporter>(
        &self,
        definition: &ScraperDefinition,
        reporter: &R,
    ) -> Vec<PropertyRecord> {
        reporter.report(RunEvent::SourceStarted {
            name: &definition.name,
        });
        let session = match self.provider.acquire().await {
            Ok(session) => session,
            Err(error) => {
                reporter.report(RunEvent::SourceFailed {
                    name: &definition.name,
                    error: &error.to_string(),
                });
                return Vec::new();
            }
        };

        let strategy = ExtractionStrategy::from_definition(definition);
        let engine = PaginationEngine::new(&session, definition, &strategy, self.policy);
        let traversal = engine.run(reporter).await;

        // Release before validation so the session is not held across
        // CPU-only work. Close failures are not worth failing a run over.
        if let Err(error) = session.close().await {
            tracing::debug!(source = %definition.name, %error, "Session close failed");
        }

        if traversal.stop.is_aborted() {
            reporter.report(RunEvent::SourceFailed {
                name: &definition.name,
                error: &traversal.stop.to_string(),
            });
            return Vec::new();
        }

        let records = validate_records(traversal.records, &definition.name);
        reporter.report(RunEvent::SourceCompleted {
            name: &definition.name,
            records: records.len(),
            pages: traversal.pages_visited,
        });
        records
    }
}

/// Drop records carrying neither a title nor a link, and stamp the
/// source name into `company` where extraction left it empty.
pub fn validate_records(records: Vec<PropertyRecord>, source: &str) -> Vec<PropertyRecord> {
    records
        .into_iter()
        .filter(PropertyRecord::is_valid)
        .map(|mut record| {
            if record.company.is_empty() {
                record.company = source.to_string();
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::testutil::{
        FakeElement, FakePage, FakeSite, MockProvider, MockReporter, make_listing,
        make_test_definition,
    };

    const BASE: &str = "https://site.example.com/list";

    fn provider_with_listings(listings: Vec<FakeElement>) -> MockProvider {
        let page = FakePage::new().with_elements(".property-item", listings);
        MockProvider::new(FakeSite::new().with_page(BASE, page))
    }

    #[tokio::test]
    async fn test_run_returns_validated_records() {
        let provider = provider_with_listings(vec![
            make_listing("Loft centro", "$ 1.200 CAP", "/p/1"),
            FakeElement::new(), // no title, no link: dropped
        ]);
        let definition = make_test_definition("Mallemacci", BASE);
        let runner = ScraperRunner::new(provider.clone());

        let records = runner.run(&definition, &MockReporter::new()).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Loft centro");
        assert_eq!(records[0].price, "1200");
        assert_eq!(records[0].company, "Mallemacci");
        assert_eq!(provider.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_company_from_page_is_preserved() {
        let listing = make_listing("Casa", "$ 5", "/p/9")
            .with_child(".company", FakeElement::text("Inmobiliaria Sur"));
        let mut definition = make_test_definition("Fallback Name", BASE);
        definition
            .field_mappings
            .insert("company".into(), ".company".into());
        let provider = provider_with_listings(vec![listing]);

        let records = ScraperRunner::new(provider)
            .run(&definition, &MockReporter::new())
            .await;

        assert_eq!(records[0].company, "Inmobiliaria Sur");
    }

    #[tokio::test]
    async fn test_missing_root_yields_empty_not_error() {
        let provider = MockProvider::new(
            FakeSite::new().with_page(BASE, FakePage::new()),
        );
        let definition = make_test_definition("ghost", BASE);
        let reporter = MockReporter::new();

        let records = ScraperRunner::new(provider.clone())
            .with_policy(ScrapePolicy::default().with_initial_wait(std::time::Duration::ZERO))
            .run(&definition, &reporter)
            .await;

        assert!(records.is_empty());
        assert_eq!(provider.open_sessions(), 0);
        assert!(
            reporter
                .labels()
                .iter()
                .any(|label| label.starts_with("SourceFailed:ghost")),
            "expected a SourceFailed event, got {:?}",
            reporter.labels()
        );
    }

    #[tokio::test]
    async fn test_acquire_failure_reports_and_returns_empty() {
        let provider = MockProvider::with_acquire_error(ScrapeError::SessionError(
            "browser unavailable".into(),
        ));
        let definition = make_test_definition("down", BASE);
        let reporter = MockReporter::new();

        let records = ScraperRunner::new(provider).run(&definition, &reporter).await;

        assert!(records.is_empty());
        assert!(
            reporter
                .labels()
                .iter()
                .any(|label| label.starts_with("SourceFailed:down"))
        );
    }

    #[tokio::test]
    async fn test_completed_event_carries_counts() {
        let provider = provider_with_listings(vec![
            make_listing("A", "$ 1", "/a"),
            make_listing("B", "$ 2", "/b"),
        ]);
        let definition = make_test_definition("counts", BASE);
        let reporter = MockReporter::new();

        ScraperRunner::new(provider).run(&definition, &reporter).await;

        assert!(reporter.labels().contains(&"SourceCompleted:counts:2".to_string()));
    }

    #[test]
    fn test_validate_records_fills_company() {
        let keep = PropertyRecord {
            title: "T".into(),
            ..Default::default()
        };
        let tagged = PropertyRecord {
            link: "https://x.example/p".into(),
            company: "Own".into(),
            ..Default::default()
        };
        let drop = PropertyRecord::default();

        let out = validate_records(vec![keep, tagged, drop], "Src");

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].company, "Src");
        assert_eq!(out[1].company, "Own");
    }
}
