use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use aisle_watcher::chrome::ChromeSession;
use aisle_watcher::config::AppConfig;
use aisle_watcher::dispatcher::{RouteDispatcher, RouteTable};
use aisle_watcher::models::Preferences;
use aisle_watcher::prefs::{MemoryPreferenceStore, PreferenceStore};
use aisle_watcher::reporting::{HttpReportSink, ReportSink, ReportedIds, Reporter};
use aisle_watcher::session::PageSession;
use aisle_watcher::watchers::WatchContext;

#[derive(Parser, Debug)]
#[command(name = "aisle-watcher", about = "Storefront price observation agent")]
struct Cli {
    /// URL to open the session on (overrides watch.start_url)
    #[arg(long)]
    start_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aisle_watcher=debug".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let start_url = cli
        .start_url
        .unwrap_or_else(|| config.watch.start_url.clone());

    info!("Starting aisle-watcher...");

    let preference_store = MemoryPreferenceStore::new(Preferences {
        reporting_enabled: config.reporting.enabled,
        ..Preferences::default()
    });
    let preferences = preference_store.load().await?;
    info!(
        "Theme: {:?}, reporting enabled: {}",
        preferences.theme, preferences.reporting_enabled
    );

    let session: Arc<dyn PageSession> =
        Arc::new(ChromeSession::launch(&config.browser, &start_url)?);
    let sink: Arc<dyn ReportSink> = Arc::new(HttpReportSink::new(&config.reporting)?);

    let reporter = Arc::new(Reporter::new(
        Arc::clone(&session),
        sink,
        preference_store.subscribe(),
        ReportedIds::default(),
    ));
    let ctx = Arc::new(WatchContext::new(session, reporter, config.watch.clone()));
    let dispatcher = RouteDispatcher::new(ctx, RouteTable::storefront_defaults());

    tokio::select! {
        _ = dispatcher.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    Ok(())
}
