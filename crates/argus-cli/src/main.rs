use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use argus_browser::{BrowserSettings, HeadlessBrowser};
use argus_core::coordinator::{CoordinatorConfig, FanOutCoordinator};
use argus_core::definition::ScraperDefinition;
use argus_core::record::PropertyRecord;
use argus_core::registry::DefinitionRegistry;
use argus_core::throttle::{PoliteProvider, ThrottleConfig};

#[derive(Parser)]
#[command(name = "argus", version, about = "Headless-browser listing scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape registered sources and print the merged records
    Run {
        /// Path to a JSON file of scraper definitions
        #[arg(short, long, env = "ARGUS_DEFINITIONS")]
        definitions: PathBuf,

        /// Only scrape the source registered under this slug
        #[arg(short, long)]
        name: Option<String>,

        /// Output format for the records on stdout
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Pretty-print JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,

        /// Per-source timeout in seconds
        #[arg(long, env = "ARGUS_JOB_TIMEOUT_SECS", default_value_t = 300)]
        timeout_secs: u64,

        /// Minimum gap between navigations to one host, in milliseconds
        #[arg(long, env = "ARGUS_NAV_DELAY_MS", default_value_t = 0)]
        nav_delay_ms: u64,
    },

    /// Validate a definitions file without launching a browser
    Check {
        /// Path to a JSON file of scraper definitions
        #[arg(short, long, env = "ARGUS_DEFINITIONS")]
        definitions: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays clean for the records
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("argus=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            definitions,
            name,
            format,
            pretty,
            timeout_secs,
            nav_delay_ms,
        } => {
            cmd_run(
                &definitions,
                name.as_deref(),
                format,
                pretty,
                timeout_secs,
                nav_delay_ms,
            )
            .await?;
        }
        Commands::Check { definitions } => {
            cmd_check(&definitions)?;
        }
    }

    Ok(())
}

async fn cmd_run(
    definitions: &Path,
    name: Option<&str>,
    format: OutputFormat,
    pretty: bool,
    timeout_secs: u64,
    nav_delay_ms: u64,
) -> Result<()> {
    // 1. Load and validate the definitions file
    let registry = DefinitionRegistry::new();
    let loaded = registry
        .load_file(definitions)
        .with_context(|| format!("Failed to load definitions from {}", definitions.display()))?;

    // 2. Pick the targets
    let targets = match name {
        Some(slug) => {
            let Some(definition) = registry.get(slug) else {
                anyhow::bail!(
                    "no scraper registered under `{slug}` ({loaded} definition(s) loaded)"
                );
            };
            vec![definition]
        }
        None => registry.snapshot(),
    };

    tracing::info!("Scraping {} source(s)", targets.len());

    // 3. Launch the browser and scrape
    let browser = HeadlessBrowser::launch(BrowserSettings::default()).await?;
    let provider = PoliteProvider::new(
        browser.provider(),
        ThrottleConfig::new(Duration::from_millis(nav_delay_ms)),
    );
    let coordinator = FanOutCoordinator::new(provider).with_config(
        CoordinatorConfig::default().with_job_timeout(Duration::from_secs(timeout_secs)),
    );
    let records = coordinator.run_all(targets).await;

    tracing::info!("Collected {} record(s)", records.len());

    // 4. Output to stdout
    match format {
        OutputFormat::Json => print_json(&records, pretty)?,
        OutputFormat::Csv => print_csv(&records)?,
    }

    Ok(())
}

fn print_json(records: &[PropertyRecord], pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(records)?
    } else {
        serde_json::to_string(records)?
    };
    println!("{output}");
    Ok(())
}

fn print_csv(records: &[PropertyRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse every entry and report per-definition results. Exits non-zero
/// if any entry fails validation.
fn cmd_check(definitions: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(definitions)
        .with_context(|| format!("Failed to read {}", definitions.display()))?;
    let entries: Vec<ScraperDefinition> =
        serde_json::from_str(&raw).context("Invalid JSON in definitions file")?;

    let mut invalid = 0;
    for definition in &entries {
        match definition.validate() {
            Ok(()) => println!("ok     {} -> /v1/listings/{}", definition.name, definition.slug()),
            Err(error) => {
                invalid += 1;
                println!("error  {}: {error}", definition.name);
            }
        }
    }
    println!("\n{} definition(s), {invalid} invalid", entries.len());

    if invalid > 0 {
        anyhow::bail!("{invalid} invalid definition(s)");
    }
    Ok(())
}
