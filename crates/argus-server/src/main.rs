use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use argus_browser::{BrowserSettings, HeadlessBrowser};
use argus_core::compiler::DefinitionCompiler;
use argus_core::coordinator::{CoordinatorConfig, FanOutCoordinator};
use argus_core::journal::Journal;
use argus_core::registry::DefinitionRegistry;
use argus_core::throttle::{PoliteProvider, ThrottleConfig};
use argus_server::routes;
use argus_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("argus=info".parse()?))
        .with_target(false)
        .init();

    let port = std::env::var("ARGUS_PORT").unwrap_or_else(|_| "4000".to_string());
    let addr = format!("0.0.0.0:{port}");
    let job_timeout = env_u64("ARGUS_JOB_TIMEOUT_SECS", 300)?;
    let nav_delay = env_u64("ARGUS_NAV_DELAY_MS", 0)?;
    let journal_dir =
        std::env::var("ARGUS_JOURNAL_DIR").unwrap_or_else(|_| "journal".to_string());

    let registry = DefinitionRegistry::new();
    if let Ok(path) = std::env::var("ARGUS_DEFINITIONS") {
        registry
            .load_file(&path)
            .with_context(|| format!("loading definitions from {path}"))?;
    }

    let journal = Journal::new(&journal_dir);
    let browser = HeadlessBrowser::launch(BrowserSettings::default()).await?;
    let provider = PoliteProvider::new(
        browser.provider(),
        ThrottleConfig::new(Duration::from_millis(nav_delay)),
    );
    let coordinator = FanOutCoordinator::new(provider).with_config(
        CoordinatorConfig::default().with_job_timeout(Duration::from_secs(job_timeout)),
    );
    let compiler = DefinitionCompiler::new(registry.clone()).with_journal(journal.clone());

    let state = Arc::new(AppState {
        registry,
        coordinator,
        compiler,
        journal,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn env_u64(key: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().with_context(|| format!("{key} must be an integer, got `{raw}`")),
        Err(_) => Ok(default),
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    tracing::info!("Shutdown signal received");
}
