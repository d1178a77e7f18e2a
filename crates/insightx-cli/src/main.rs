//! InsightX CLI - a terminal client for the InsightX analytics service.
//!
//! Log in, upload datasets, browse their precomputed analytics and export
//! reports from an interactive shell. The session lasts as long as the process.

mod render;
mod shell;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use insightx_core::{ApiClient, Config, ExpiryWatcher, TokenStore};

use shell::Shell;

// ============================================================================
// Constants
// ============================================================================

/// Log file name inside the cache directory
const LOG_FILE: &str = "insightx.log";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Backend base URL, e.g. http://127.0.0.1:8000 (overrides --host)
    #[arg(long)]
    api_url: Option<String>,
    /// Backend host name; served over HTTPS on the configured port
    #[arg(long)]
    host: Option<String>,
    /// Log in as this user at startup
    #[arg(short, long)]
    email: Option<String>,
}

/// Initialize the tracing subscriber, writing to a log file so output does
/// not interleave with the shell. The returned guard flushes on drop.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = config.cache_dir().ok()?;
    std::fs::create_dir_all(&log_dir).ok()?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, LOG_FILE));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let mut config = Config::load()?;
    if let Some(url) = args.api_url {
        config.api_url = Some(url);
    }
    if let Some(host) = args.host {
        config.host = Some(host);
    }

    let _log_guard = init_tracing(&config);
    info!(base_url = %config.base_url(), "InsightX client starting");

    let store = TokenStore::in_memory();
    let client = ApiClient::new(&config, store.clone())?;
    let watcher = ExpiryWatcher::new(store, config.expiry_check_interval());
    watcher.start();

    let mut shell = Shell::new(client, watcher, config);
    if let Some(email) = args.email {
        if let Err(e) = shell.login(Some(email)).await {
            warn!(error = %e, "Startup login failed");
            println!("Error: {}", e);
        }
    }

    let result = shell.run().await;

    info!("InsightX client shutting down");
    result
}
