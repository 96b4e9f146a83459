//! Concurrent fan-out over every registered source.
//!
//! Each source runs as its own task under its own deadline, so one hung
//! site can delay the aggregate by at most the job timeout instead of
//! stalling it forever. Results merge in completion order; callers that
//! need per-source grouping use the slug endpoint instead.

use std::time::Duration;

use tokio::task::JoinSet;
use uuid::Uuid;

use crate::definition::ScraperDefinition;
use crate::events::{RunEvent, RunReporter, TracingRunReporter};
use crate::record::PropertyRecord;
use crate::runner::ScraperRunner;
use crate::session::{ScrapePolicy, SessionProvider};

/// Tuning for a fan-out run.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    /// Whole-job deadline per source: acquire, every page, validation.
    pub job_timeout: Duration,
    /// Wait policy handed to every runner.
    pub policy: ScrapePolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(300),
            policy: ScrapePolicy::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: ScrapePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Fans definitions out over independent scrape jobs and merges their
/// records. Like the runner it never fails: a run over zero sources, or
/// over sources that all came up empty, is an empty result.
pub struct FanOutCoordinator<P: SessionProvider, R: RunReporter = TracingRunReporter> {
    provider: P,
    config: CoordinatorConfig,
    reporter: R,
}

impl<P: SessionProvider + 'static> FanOutCoordinator<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            config: CoordinatorConfig::default(),
            reporter: TracingRunReporter,
        }
    }
}

impl<P, R> FanOutCoordinator<P, R>
where
    P: SessionProvider + 'static,
    R: RunReporter + Clone + 'static,
{
    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the diagnostics sink. Each job gets its own clone.
    pub fn with_reporter<R2>(self, reporter: R2) -> FanOutCoordinator<P, R2>
    where
        R2: RunReporter + Clone + 'static,
    {
        FanOutCoordinator {
            provider: self.provider,
            config: self.config,
            reporter,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Scrape every definition concurrently and merge the records in
    /// job-completion order. Returns after all jobs settle, which is at
    /// most the job timeout plus merge overhead.
    pub async fn run_all(&self, definitions: Vec<ScraperDefinition>) -> Vec<PropertyRecord> {
        let run_id = Uuid::new_v4();
        self.reporter.report(RunEvent::RunStarted {
            run_id,
            sources: definitions.len(),
        });

        let mut jobs = JoinSet::new();
        for definition in definitions {
            let provider = self.provider.clone();
            let reporter = self.reporter.clone();
            let config = self.config;
            jobs.spawn(async move { scrape_job(provider, definition, config, reporter).await });
        }

        let mut records = Vec::new();
        let mut settled = 0;
        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok(job_records) => {
                    settled += 1;
                    records.extend(job_records);
                }
                Err(error) => {
                    // A panicking job forfeits its records; the rest of
                    // the run is unaffected.
                    tracing::error!(%run_id, %error, "Scrape job panicked");
                }
            }
        }

        self.reporter.report(RunEvent::RunCompleted {
            run_id,
            records: records.len(),
            sources: settled,
        });
        records
    }

    /// Scrape a single definition under the same deadline regime as a
    /// fan-out job.
    pub async fn run_one(&self, definition: &ScraperDefinition) -> Vec<PropertyRecord> {
        scrape_job(
            self.provider.clone(),
            definition.clone(),
            self.config,
            self.reporter.clone(),
        )
        .await
    }
}

async fn scrape_job<P, R>(
    provider: P,
    definition: ScraperDefinition,
    config: CoordinatorConfig,
    reporter: R,
) -> Vec<PropertyRecord>
where
    P: SessionProvider,
    R: RunReporter,
{
    let runner = ScraperRunner::new(provider).with_policy(config.policy);
    match tokio::time::timeout(config.job_timeout, runner.run(&definition, &reporter)).await {
        Ok(records) => records,
        Err(_) => {
            // The timeout dropped the runner future, which released the
            // session. Partial pages are lost with it.
            reporter.report(RunEvent::SourceTimedOut {
                name: &definition.name,
                limit_secs: config.job_timeout.as_secs(),
            });
            Vec::new()
        }
    }
}
