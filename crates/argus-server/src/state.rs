use argus_core::compiler::DefinitionCompiler;
use argus_core::coordinator::FanOutCoordinator;
use argus_core::journal::Journal;
use argus_core::registry::DefinitionRegistry;
use argus_core::session::SessionProvider;

/// Shared application state, generic over the session provider so the
/// same router serves a real browser in production and mocks in tests.
pub struct AppState<P: SessionProvider> {
    pub registry: DefinitionRegistry,
    pub coordinator: FanOutCoordinator<P>,
    pub compiler: DefinitionCompiler,
    pub journal: Journal,
}
