use thiserror::Error;

/// Engine-wide error types for Argus.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// A root or field selector never appeared within the policy timeout.
    #[error("selector `{selector}` did not appear within {waited_ms} ms")]
    SelectorTimeout { selector: String, waited_ms: u64 },

    /// Navigating to a page or pagination target failed.
    #[error("navigation error: {0}")]
    NavigationError(String),

    /// Browser/session plumbing failed (acquire, query, read, close).
    #[error("session error: {0}")]
    SessionError(String),

    /// A synthesis payload is missing required keys or violates an invariant.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// A source's job exceeded the per-job timeout.
    #[error("job timed out after {0} s")]
    JobTimeout(u64),

    /// Journal (notes store) I/O failed.
    #[error("journal error: {0}")]
    JournalError(String),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Bad runtime configuration (addresses, paths, seed files).
    #[error("config error: {0}")]
    ConfigError(String),
}

impl ScrapeError {
    /// Returns true if the scrape pipeline downgrades this error to an
    /// empty or partial result instead of failing the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScrapeError::SelectorTimeout { .. }
                | ScrapeError::NavigationError(_)
                | ScrapeError::SessionError(_)
                | ScrapeError::JobTimeout(_)
        )
    }

    /// Returns true if this error is a timeout of some form.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ScrapeError::SelectorTimeout { .. } | ScrapeError::JobTimeout(_)
        )
    }
}
