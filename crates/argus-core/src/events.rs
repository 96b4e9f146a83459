use uuid::Uuid;

/// Events emitted while scraping, the diagnostics side channel.
///
/// Scrape failures never surface as errors to callers (a broken source
/// and an empty source look the same at the API boundary), so causes
/// travel through here instead.
#[derive(Debug, Clone)]
pub enum RunEvent<'a> {
    RunStarted {
        run_id: Uuid,
        sources: usize,
    },
    SourceStarted {
        name: &'a str,
    },
    PageScraped {
        name: &'a str,
        page: u32,
        count: usize,
    },
    SourceCompleted {
        name: &'a str,
        records: usize,
        pages: u32,
    },
    SourceFailed {
        name: &'a str,
        error: &'a str,
    },
    SourceTimedOut {
        name: &'a str,
        limit_secs: u64,
    },
    RunCompleted {
        run_id: Uuid,
        records: usize,
        sources: usize,
    },
}

/// Trait for receiving run events (decoupled logging).
pub trait RunReporter: Send + Sync {
    fn report(&self, event: RunEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunReporter;

impl RunReporter for TracingRunReporter {
    fn report(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::RunStarted { run_id, sources } => {
                tracing::info!(%run_id, %sources, "Scrape run started");
            }
            RunEvent::SourceStarted { name } => {
                tracing::info!(source = %name, "Scraping source");
            }
            RunEvent::PageScraped { name, page, count } => {
                tracing::info!(source = %name, %page, %count, "Page scraped");
            }
            RunEvent::SourceCompleted {
                name,
                records,
                pages,
            } => {
                tracing::info!(source = %name, %records, %pages, "Source completed");
            }
            RunEvent::SourceFailed { name, error } => {
                tracing::warn!(source = %name, %error, "Source failed, contributing no records");
            }
            RunEvent::SourceTimedOut { name, limit_secs } => {
                tracing::warn!(source = %name, %limit_secs, "Source timed out, contributing no records");
            }
            RunEvent::RunCompleted {
                run_id,
                records,
                sources,
            } => {
                tracing::info!(%run_id, %records, %sources, "Scrape run completed");
            }
        }
    }
}
