#![forbid(unsafe_code)]
//! Coordination facade ("nerve center"): the single entry point every
//! surface calls. One instance per process, wrapped in a mutex by the
//! surface that owns it; cross-process safety comes from the shared store's
//! conditional statements, never from this struct.

mod context;
mod error;
mod http;
mod jobs;
mod locks;
mod rag;
mod remote;
mod session;

pub use error::CenterError;
pub use jobs::ClaimOutcome;
pub use locks::LockOutcome;
pub use rag::SearchHit;
pub use remote::SubscriptionStatus;
pub use session::{FinalizeOutcome, UsageStats};

use ax_core::ids::{AgentId, ProjectName};
use ax_storage::Store;
use std::collections::HashMap;
use std::path::PathBuf;

/// Default lock TTL: 30 minutes.
pub const DEFAULT_LOCK_TTL_MS: i64 = 30 * 60 * 1000;

pub struct CenterConfig {
    pub instructions_dir: PathBuf,
    pub lock_ttl_ms: i64,
    pub openai_api_key: Option<String>,
    pub remote_api_url: Option<String>,
    pub remote_api_secret: Option<String>,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            instructions_dir: PathBuf::from(".axis/instructions"),
            lock_ttl_ms: DEFAULT_LOCK_TTL_MS,
            openai_api_key: None,
            remote_api_url: None,
            remote_api_secret: None,
        }
    }
}

impl CenterConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            instructions_dir: std::env::var("AXIS_INSTRUCTIONS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.instructions_dir),
            lock_ttl_ms: defaults.lock_ttl_ms,
            openai_api_key: env_non_empty("OPENAI_API_KEY"),
            remote_api_url: env_non_empty("SHARED_CONTEXT_API_URL"),
            remote_api_secret: env_non_empty("SHARED_CONTEXT_API_SECRET"),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub struct NerveCenter {
    store: Box<dyn Store>,
    instructions_dir: PathBuf,
    lock_ttl_ms: i64,
    rag: Option<rag::Rag>,
    remote: Option<remote::RemoteVerifier>,
    notepad_cache: HashMap<String, String>,
}

impl NerveCenter {
    pub fn new(store: Box<dyn Store>, config: CenterConfig) -> Self {
        let rag = config.openai_api_key.map(rag::Rag::new);
        let remote = match (config.remote_api_url, config.remote_api_secret) {
            (Some(url), Some(secret)) => Some(remote::RemoteVerifier::new(url, secret)),
            _ => None,
        };
        Self {
            store,
            instructions_dir: config.instructions_dir,
            lock_ttl_ms: config.lock_ttl_ms,
            rag,
            remote,
            notepad_cache: HashMap::new(),
        }
    }

    pub fn lock_ttl_ms(&self) -> i64 {
        self.lock_ttl_ms
    }

    /// Resolves a project by name under the given owner, creating it on
    /// first reference. Returns the opaque project id.
    pub fn resolve_project(
        &mut self,
        name: &str,
        owner_id: &str,
    ) -> Result<String, CenterError> {
        let name = parse_project_name(name)?;
        let record = self.store.resolve_project(&name, owner_id)?;
        Ok(record.id)
    }

    /// Last notepad text this process has seen. Reads go to the store; this
    /// mirror only spares callers that just wrote.
    pub fn cached_notepad(&self, project_id: &str) -> Option<&str> {
        self.notepad_cache.get(project_id).map(String::as_str)
    }

    /// Appends a one-line record to the notepad. A failed mirror write is
    /// logged and swallowed: the store copy is the source of truth and the
    /// triggering operation has already committed.
    pub(crate) fn note(&mut self, project_id: &str, line: &str) {
        let entry = format!("\n{line}");
        match self.store.append_notepad(project_id, &entry) {
            Ok(()) => {
                self.notepad_cache
                    .entry(project_id.to_string())
                    .or_default()
                    .push_str(&entry);
            }
            Err(err) => {
                tracing::warn!(project = project_id, error = %err, "notepad append failed");
            }
        }
    }

    pub(crate) fn refresh_notepad(&mut self, project_id: &str) -> Result<String, CenterError> {
        let text = self.store.read_notepad(project_id)?;
        self.notepad_cache
            .insert(project_id.to_string(), text.clone());
        Ok(text)
    }
}

pub(crate) fn parse_agent_id(raw: &str) -> Result<AgentId, CenterError> {
    AgentId::try_new(raw)
        .map_err(|_| CenterError::bad_request("agent_id must be a short printable string"))
}

pub(crate) fn parse_project_name(raw: &str) -> Result<ProjectName, CenterError> {
    ProjectName::try_new(raw).map_err(|_| {
        CenterError::bad_request(
            "project name must start alphanumeric and contain only [A-Za-z0-9 ./_-]",
        )
    })
}
