#![forbid(unsafe_code)]
//! HTTP surface of the nerve center. Always runs against the shared store;
//! browser dashboards and remote tool surfaces speak to this.

mod api_jobs;
mod api_locks;
mod api_search;
mod api_sessions;
mod api_verify;
mod app;
mod auth;
mod error;

use app::AppState;
use ax_nerve::{CenterConfig, NerveCenter};
use ax_storage::SqliteStore;
use std::path::PathBuf;

const DEFAULT_LISTEN: &str = "127.0.0.1:8787";
const DEFAULT_DB: &str = "./history/shared-context.db";

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

struct Options {
    listen: String,
    db_path: PathBuf,
}

fn parse_args() -> Options {
    let mut listen = env_non_empty("AXIS_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let mut db_path = env_non_empty("SHARED_CONTEXT_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB));

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--listen" => {
                if let Some(value) = args.next() {
                    listen = value;
                }
            }
            "--db" => {
                if let Some(value) = args.next() {
                    db_path = PathBuf::from(value);
                }
            }
            _ => {}
        }
    }
    Options { listen, db_path }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = parse_args();
    let store = SqliteStore::open(&options.db_path)?;
    let center = NerveCenter::new(Box::new(store), CenterConfig::from_env());

    let state = AppState::new(center);
    let router = app::router(state);

    tracing::info!(listen = %options.listen, db = %options.db_path.display(), "nerve center listening");
    let listener = tokio::net::TcpListener::bind(&options.listen).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
