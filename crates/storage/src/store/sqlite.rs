#![forbid(unsafe_code)]
//! Shared relational store. One WAL database file, any number of client
//! processes. Every conditional mutation is a single gated statement checked
//! via `changes()`; the in-process facade mutex is never relied on for
//! cross-process correctness.

use ax_core::ids::{AgentId, ProjectName};
use ax_core::model::JobUpdate;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use super::Store;
use super::error::StoreError;
use super::schema::migrate_sqlite_schema;
use super::types::{
    EmbeddingItem, EmbeddingMatch, JobRow, LockAcquire, LockRequest, LockRow, NewJob,
    ProjectRecord,
};

#[derive(Debug)]
pub struct SqliteStore {
    db_path: PathBuf,
    pub(in crate::store) conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        migrate_sqlite_schema(&conn)?;
        Ok(Self { db_path, conn })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl Store for SqliteStore {
    fn resolve_project(
        &mut self,
        name: &ProjectName,
        owner_id: &str,
    ) -> Result<ProjectRecord, StoreError> {
        self.resolve_project_impl(name, owner_id)
    }

    fn insert_job(&mut self, project_id: &str, job: NewJob) -> Result<JobRow, StoreError> {
        self.insert_job_impl(project_id, job)
    }

    fn conditional_claim_job(
        &mut self,
        project_id: &str,
        job_id: &str,
        agent_id: &AgentId,
        now_ms: i64,
    ) -> Result<Option<JobRow>, StoreError> {
        self.conditional_claim_job_impl(project_id, job_id, agent_id, now_ms)
    }

    fn update_job(
        &mut self,
        project_id: &str,
        job_id: &str,
        updates: &[JobUpdate],
        now_ms: i64,
    ) -> Result<JobRow, StoreError> {
        self.update_job_impl(project_id, job_id, updates, now_ms)
    }

    fn select_project_jobs(&mut self, project_id: &str) -> Result<Vec<JobRow>, StoreError> {
        self.select_project_jobs_impl(project_id)
    }

    fn upsert_lock(
        &mut self,
        project_id: &str,
        request: LockRequest,
        ttl_ms: i64,
    ) -> Result<LockAcquire, StoreError> {
        self.upsert_lock_impl(project_id, request, ttl_ms)
    }

    fn select_project_locks(&mut self, project_id: &str) -> Result<Vec<LockRow>, StoreError> {
        self.select_project_locks_impl(project_id)
    }

    fn delete_lock(&mut self, project_id: &str, file_path: &str) -> Result<bool, StoreError> {
        self.delete_lock_impl(project_id, file_path)
    }

    fn reclaim_stale_locks(
        &mut self,
        project_id: &str,
        ttl_ms: i64,
        now_ms: i64,
    ) -> Result<usize, StoreError> {
        self.reclaim_stale_locks_impl(project_id, ttl_ms, now_ms)
    }

    fn read_notepad(&mut self, project_id: &str) -> Result<String, StoreError> {
        self.read_notepad_impl(project_id)
    }

    fn append_notepad(&mut self, project_id: &str, text: &str) -> Result<(), StoreError> {
        self.append_notepad_impl(project_id, text)
    }

    fn replace_notepad(&mut self, project_id: &str, text: &str) -> Result<(), StoreError> {
        self.replace_notepad_impl(project_id, text)
    }

    fn archive_session(
        &mut self,
        project_id: &str,
        title: &str,
        summary: &str,
        full: &str,
    ) -> Result<String, StoreError> {
        self.archive_session_impl(project_id, title, summary, full)
    }

    fn purge_terminal_jobs(&mut self, project_id: &str) -> Result<usize, StoreError> {
        self.purge_terminal_jobs_impl(project_id)
    }

    fn insert_embeddings(
        &mut self,
        project_id: &str,
        items: Vec<EmbeddingItem>,
    ) -> Result<Vec<String>, StoreError> {
        self.insert_embeddings_impl(project_id, items)
    }

    fn match_embeddings(
        &mut self,
        project_id: &str,
        query: &[f32],
        threshold: f32,
        count: usize,
    ) -> Result<Vec<EmbeddingMatch>, StoreError> {
        self.match_embeddings_impl(project_id, query, threshold, count)
    }
}
