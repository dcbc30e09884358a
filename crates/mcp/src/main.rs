#![forbid(unsafe_code)]
//! Tool surface binary: JSON-RPC over stdio in front of the nerve center.
//! Stdout belongs to the protocol; logs go to stderr.

mod server;
mod stdio;
mod support;
mod tools;

use ax_nerve::{CenterConfig, NerveCenter};
use ax_storage::{LocalStore, SqliteStore, Store};
use server::McpServer;
use std::path::PathBuf;

pub(crate) const MCP_VERSION: &str = "2024-11-05";
pub(crate) const SERVER_NAME: &str = "axis-nerve-center";
pub(crate) const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_STATE_FILE: &str = "./history/nerve-center-state.json";
const DEFAULT_PROJECT: &str = "default";

struct Options {
    shared_db: Option<PathBuf>,
    state_file: PathBuf,
    project: String,
    owner: String,
    agent_id: Option<String>,
    instructions_dir: Option<PathBuf>,
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_args() -> Options {
    let mut shared_db = env_non_empty("SHARED_CONTEXT_DB").map(PathBuf::from);
    let mut state_file = env_non_empty("NERVE_CENTER_STATE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE));
    let mut project =
        env_non_empty("PROJECT_NAME").unwrap_or_else(|| DEFAULT_PROJECT.to_string());
    let mut owner = env_non_empty("AXIS_OWNER_ID").unwrap_or_else(|| "local".to_string());
    let mut agent_id = env_non_empty("AXIS_AGENT_ID");
    let mut instructions_dir = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                if let Some(value) = args.next() {
                    shared_db = Some(PathBuf::from(value));
                }
            }
            "--state-file" => {
                if let Some(value) = args.next() {
                    state_file = PathBuf::from(value);
                }
            }
            "--project" => {
                if let Some(value) = args.next() {
                    project = value;
                }
            }
            "--owner" => {
                if let Some(value) = args.next() {
                    owner = value;
                }
            }
            "--agent-id" => {
                if let Some(value) = args.next() {
                    agent_id = Some(value);
                }
            }
            "--instructions-dir" => {
                if let Some(value) = args.next() {
                    instructions_dir = Some(PathBuf::from(value));
                }
            }
            _ => {}
        }
    }

    Options {
        shared_db,
        state_file,
        project,
        owner,
        agent_id,
        instructions_dir,
    }
}

fn open_store(options: &Options) -> Result<Box<dyn Store>, Box<dyn std::error::Error>> {
    // Mode is picked exactly once; nothing downstream branches on it again.
    if let Some(db_path) = &options.shared_db {
        tracing::info!(db = %db_path.display(), "hosted mode: shared database");
        return Ok(Box::new(SqliteStore::open(db_path)?));
    }
    let name = ax_core::ids::ProjectName::try_new(options.project.clone())
        .map_err(|_| "invalid project name")?;
    tracing::info!(state = %options.state_file.display(), "local mode: state file");
    Ok(Box::new(LocalStore::open(
        &options.state_file,
        &name,
        &options.owner,
    )?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = parse_args();
    let store = open_store(&options)?;

    let mut config = CenterConfig::from_env();
    if let Some(dir) = &options.instructions_dir {
        config.instructions_dir = dir.clone();
    }

    let mut center = NerveCenter::new(store, config);
    let project_id = center.resolve_project(&options.project, &options.owner)?;

    let server = McpServer::new(center, project_id, options.agent_id);
    stdio::run(server)
}
