//! tradesync - event-driven data synchronization for trading operations
//!
//! This is the entry point binary: it reads one event JSON, dispatches it to
//! the matching handler and prints the structured response. The actual logic
//! is in the library modules for better testability.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tradesync::config::Settings;
use tradesync::handlers::{Event, HandlerContext, dispatch};
use tradesync::secrets::AwsSecretStore;

#[derive(Parser)]
#[command(name = "tradesync", version, about = "Dispatch one data-synchronization event")]
struct Cli {
    /// Inline event JSON, e.g. '{"method": "truncate_orders"}'
    event: Option<String>,

    /// Read the event JSON from a file instead
    #[arg(long, value_name = "PATH", conflicts_with = "event")]
    event_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let raw = match (cli.event, cli.event_file) {
        (Some(inline), _) => inline,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read event file {}", path.display()))?,
        (None, None) => bail!("an event is required, either inline JSON or --event-file"),
    };
    let event: Event = serde_json::from_str(&raw).context("invalid event JSON")?;

    let settings = Settings::from_env()?;
    let store = Arc::new(AwsSecretStore::new(&settings.aws_region).await);
    let ctx = HandlerContext::new(settings, store);

    let response = dispatch(&ctx, event).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
