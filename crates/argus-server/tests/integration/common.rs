use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;

use argus_core::compiler::DefinitionCompiler;
use argus_core::coordinator::{CoordinatorConfig, FanOutCoordinator};
use argus_core::journal::Journal;
use argus_core::registry::DefinitionRegistry;
use argus_core::testutil::{FakePage, FakeSite, MockProvider, make_listing, make_test_definition};
use argus_server::routes;
use argus_server::state::AppState;

/// Router wired to a scripted fake site, plus handles for assertions.
pub struct TestApp {
    pub router: Router,
    pub provider: MockProvider,
    pub journal: Journal,
    pub journal_dir: TempDir,
}

/// App with two registered sources: `alpha` serves one listing, `beta`
/// serves two.
pub fn setup_test_app() -> TestApp {
    let site = FakeSite::new()
        .with_page(
            "https://alpha.example.com/list",
            FakePage::new().with_elements(
                ".property-item",
                vec![make_listing("Alpha loft", "$ 1.000", "/p/1")],
            ),
        )
        .with_page(
            "https://beta.example.com/list",
            FakePage::new().with_elements(
                ".property-item",
                vec![
                    make_listing("Beta casa", "$ 2.000", "/p/2"),
                    make_listing("Beta depto", "$ 3.000", "/p/3"),
                ],
            ),
        );
    let registry = DefinitionRegistry::new();
    registry.upsert(make_test_definition(
        "alpha",
        "https://alpha.example.com/list",
    ));
    registry.upsert(make_test_definition(
        "beta",
        "https://beta.example.com/list",
    ));
    build_app(MockProvider::new(site), registry)
}

/// App over `site` with an empty registry; tests register sources
/// through the API.
pub fn setup_with_site(site: FakeSite) -> TestApp {
    build_app(MockProvider::new(site), DefinitionRegistry::new())
}

fn build_app(provider: MockProvider, registry: DefinitionRegistry) -> TestApp {
    let journal_dir = tempfile::tempdir().expect("failed to create journal tempdir");
    let journal = Journal::new(journal_dir.path());
    let coordinator = FanOutCoordinator::new(provider.clone())
        .with_config(CoordinatorConfig::default().with_job_timeout(Duration::from_secs(5)));
    let compiler = DefinitionCompiler::new(registry.clone()).with_journal(journal.clone());

    let state = Arc::new(AppState {
        registry,
        coordinator,
        compiler,
        journal: journal.clone(),
    });

    TestApp {
        router: routes::router(state),
        provider,
        journal,
        journal_dir,
    }
}
