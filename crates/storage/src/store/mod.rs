#![forbid(unsafe_code)]
//! Store contract shared by both persistence backends.

pub(crate) mod embeddings;
pub(crate) mod error;
pub(crate) mod jobs;
pub(crate) mod local;
pub(crate) mod locks;
pub(crate) mod projects;
pub(crate) mod schema;
pub(crate) mod sessions;
pub(crate) mod sqlite;
pub(crate) mod types;

use ax_core::ids::{AgentId, ProjectName};
use ax_core::model::JobUpdate;
use error::StoreError;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use types::{
    EmbeddingItem, EmbeddingMatch, JobRow, LockAcquire, LockRequest, LockRow, NewJob,
    ProjectRecord,
};

/// Abstract operations of the persistence boundary. All timestamps are
/// supplied by the caller so that both backends stay replayable in tests.
pub trait Store: Send {
    /// Resolves a project by (name, owner), creating it on first reference.
    fn resolve_project(
        &mut self,
        name: &ProjectName,
        owner_id: &str,
    ) -> Result<ProjectRecord, StoreError>;

    fn insert_job(&mut self, project_id: &str, job: NewJob) -> Result<JobRow, StoreError>;

    /// Atomically moves a todo job to in_progress for `agent_id`. Returns
    /// `None` when another claimant got there first.
    fn conditional_claim_job(
        &mut self,
        project_id: &str,
        job_id: &str,
        agent_id: &AgentId,
        now_ms: i64,
    ) -> Result<Option<JobRow>, StoreError>;

    fn update_job(
        &mut self,
        project_id: &str,
        job_id: &str,
        updates: &[JobUpdate],
        now_ms: i64,
    ) -> Result<JobRow, StoreError>;

    fn select_project_jobs(&mut self, project_id: &str) -> Result<Vec<JobRow>, StoreError>;

    /// Single-shot conditional acquisition: succeeds when the slot is free,
    /// owned by the requester, or stale; otherwise reports the incumbent.
    fn upsert_lock(
        &mut self,
        project_id: &str,
        request: LockRequest,
        ttl_ms: i64,
    ) -> Result<LockAcquire, StoreError>;

    fn select_project_locks(&mut self, project_id: &str) -> Result<Vec<LockRow>, StoreError>;

    fn delete_lock(&mut self, project_id: &str, file_path: &str) -> Result<bool, StoreError>;

    fn reclaim_stale_locks(
        &mut self,
        project_id: &str,
        ttl_ms: i64,
        now_ms: i64,
    ) -> Result<usize, StoreError>;

    fn read_notepad(&mut self, project_id: &str) -> Result<String, StoreError>;

    fn append_notepad(&mut self, project_id: &str, text: &str) -> Result<(), StoreError>;

    /// Full rewrite. Reserved for session finalize.
    fn replace_notepad(&mut self, project_id: &str, text: &str) -> Result<(), StoreError>;

    /// Write-once session snapshot. Returns an archive reference: a row id in
    /// the shared store, a file path in the local store.
    fn archive_session(
        &mut self,
        project_id: &str,
        title: &str,
        summary: &str,
        full: &str,
    ) -> Result<String, StoreError>;

    fn purge_terminal_jobs(&mut self, project_id: &str) -> Result<usize, StoreError>;

    /// Hosted store only; the local store answers [`StoreError::Unsupported`].
    fn insert_embeddings(
        &mut self,
        project_id: &str,
        items: Vec<EmbeddingItem>,
    ) -> Result<Vec<String>, StoreError>;

    fn match_embeddings(
        &mut self,
        project_id: &str,
        query: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<EmbeddingMatch>, StoreError>;
}

pub fn now_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis() as i64
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub fn ms_to_rfc3339(ts_ms: i64) -> String {
    let nanos = (ts_ms as i128) * 1_000_000i128;
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
