/// Smoke-test for the Chromium session adapter.
///
/// Launches a headless Chromium, opens <https://example.com>, and reads
/// the `<h1>` back through the session API.
///
/// Run with:
///   cargo run --example session_smoke
use std::time::Duration;

use argus_browser::{BrowserSettings, HeadlessBrowser};
use argus_core::session::{PageSession, SessionProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Launching headless browser…");
    let browser = HeadlessBrowser::launch(BrowserSettings::default()).await?;
    let session = browser.provider().acquire().await?;

    let url = "https://example.com";
    println!("Opening {url} …");
    session.navigate(url).await?;
    session.wait_for_selector("h1", Duration::from_secs(10)).await?;

    let headings = session.query_all("h1").await?;
    let first = headings.first().expect("page should have an <h1>");
    let text = session.read_text(first).await?;

    assert_eq!(text.trim(), "Example Domain", "unexpected heading: {text}");
    println!("OK — h1 reads: {text}");

    session.close().await?;
    Ok(())
}
