pub mod compiler;
pub mod coordinator;
pub mod definition;
pub mod error;
pub mod events;
pub mod extract;
pub mod journal;
pub mod pagination;
pub mod record;
pub mod registry;
pub mod runner;
pub mod session;
pub mod testutil;
pub mod throttle;

pub use compiler::{DefinitionCompiler, DefinitionPayload};
pub use coordinator::{CoordinatorConfig, FanOutCoordinator};
pub use definition::{PaginationConfig, PaginationKind, ScraperDefinition, slugify};
pub use error::ScrapeError;
pub use events::{RunEvent, RunReporter, TracingRunReporter};
pub use extract::{ExtractionStrategy, normalize_price};
pub use journal::Journal;
pub use pagination::{PageTraversal, PaginationEngine, StopReason};
pub use record::PropertyRecord;
pub use registry::DefinitionRegistry;
pub use runner::ScraperRunner;
pub use session::{PageSession, ScrapePolicy, SessionProvider};
pub use throttle::{PoliteProvider, ThrottleConfig};
