//! shopcache - terminal driver for the shop inventory data layer.
//!
//! Logs in, preloads the reference data for the user's role while showing
//! a live checklist, then serves cached reads and refreshes from a small
//! command prompt.

mod app;
mod render;

use std::path::Path;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Log file written under the cache directory
const LOG_FILE: &str = "shopcache.log";

/// Initialize the tracing subscriber.
///
/// Logs go to a file so they don't interleave with the progress display.
/// Use RUST_LOG to control the level (e.g., RUST_LOG=shopcache_core=debug).
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    guard
}

fn print_usage() {
    eprintln!("Usage: shopcache [--force] | shopcache logout | shopcache --help");
    eprintln!();
    eprintln!("  (default)  Log in if needed, preload data, then open the prompt");
    eprintln!("  --force    Preload even if this session already did");
    eprintln!("  logout     Forget the session and stored password");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let cache_dir = App::resolve_cache_dir();
    std::fs::create_dir_all(&cache_dir)?;
    let _log_guard = init_tracing(&cache_dir);

    let mut app = App::new(cache_dir)?;
    info!(api = %app.api_base_url(), "shopcache starting");

    if args.first().map(String::as_str) == Some("logout") {
        app.logout(true);
        eprintln!("Logged out.");
        return Ok(());
    }
    let force = args.iter().any(|a| a == "--force");

    if !app.is_authenticated() {
        app.login_interactive().await?;
    }

    if force || !app.already_preloaded() {
        app.preload().await;
    } else {
        eprintln!("Data was already preloaded this session; views will fetch directly.");
        eprintln!("Type `preload` to load everything into the cache.");
    }

    let result = app.run_prompt().await;

    info!("shopcache shutting down");
    result
}
