#![forbid(unsafe_code)]
//! Single-process store. State is one in-memory object flushed to a JSON
//! file after every mutation; session archives are Markdown files beside it.

use ax_core::ids::{AgentId, ProjectName};
use ax_core::model::{JobStatus, JobUpdate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::StoreError;
use super::jobs::{
    apply_job_updates, normalize_dependencies, normalize_job_description, normalize_job_title,
    validate_completion_key,
};
use super::locks::{normalize_file_path, normalize_intent, normalize_user_prompt};
use super::types::{
    EmbeddingItem, EmbeddingMatch, JobRow, LockAcquire, LockRequest, LockRow, NewJob,
    ProjectRecord,
};
use super::{Store, now_rfc3339};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LocalState {
    #[serde(default)]
    locks: BTreeMap<String, LockRow>,
    #[serde(default)]
    jobs: BTreeMap<String, JobRow>,
    #[serde(default)]
    live_notepad: String,
}

#[derive(Debug)]
pub struct LocalStore {
    state_path: PathBuf,
    history_dir: PathBuf,
    project: ProjectRecord,
    state: LocalState,
}

impl LocalStore {
    pub fn open(
        state_path: impl AsRef<Path>,
        project: &ProjectName,
        owner_id: &str,
    ) -> Result<Self, StoreError> {
        let state_path = state_path.as_ref().to_path_buf();
        let history_dir = state_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&history_dir)?;

        let state = if state_path.exists() {
            let raw = std::fs::read_to_string(&state_path)?;
            if raw.trim().is_empty() {
                LocalState::default()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            LocalState::default()
        };

        Ok(Self {
            state_path,
            history_dir,
            project: ProjectRecord {
                // Local mode owns exactly one project, so the name is the id.
                id: project.as_str().to_string(),
                name: project.as_str().to_string(),
                owner_id: owner_id.to_string(),
            },
            state,
        })
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn check_project(&self, project_id: &str) -> Result<(), StoreError> {
        if project_id != self.project.id {
            return Err(StoreError::NotFound {
                entity: "project",
                id: project_id.to_string(),
            });
        }
        Ok(())
    }

    /// Full rewrite of the state file; the temp-file rename keeps a crash
    /// from leaving a torn file behind.
    fn flush(&self) -> Result<(), StoreError> {
        let serialized = serde_json::to_string_pretty(&self.state)?;
        let tmp_path = self.state_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &self.state_path)?;
        Ok(())
    }
}

impl Store for LocalStore {
    fn resolve_project(
        &mut self,
        name: &ProjectName,
        _owner_id: &str,
    ) -> Result<ProjectRecord, StoreError> {
        if name.as_str() != self.project.name {
            return Err(StoreError::NotFound {
                entity: "project",
                id: name.as_str().to_string(),
            });
        }
        Ok(self.project.clone())
    }

    fn insert_job(&mut self, project_id: &str, job: NewJob) -> Result<JobRow, StoreError> {
        self.check_project(project_id)?;
        let title = normalize_job_title(&job.title)?;
        let description = normalize_job_description(&job.description);
        let dependencies = normalize_dependencies(job.dependencies)?;
        validate_completion_key(&job.completion_key)?;

        for dep in &dependencies {
            if !self.state.jobs.contains_key(dep) {
                return Err(StoreError::NotFound {
                    entity: "job",
                    id: dep.clone(),
                });
            }
        }

        let row = JobRow {
            id: job.id.clone(),
            project_id: project_id.to_string(),
            title,
            description,
            priority: job.priority,
            status: JobStatus::Todo,
            assigned_to: None,
            dependencies,
            completion_key: job.completion_key,
            cancel_reason: None,
            created_at_ms: job.created_at_ms,
            updated_at_ms: job.created_at_ms,
        };
        self.state.jobs.insert(job.id, row.clone());
        self.flush()?;
        Ok(row)
    }

    fn conditional_claim_job(
        &mut self,
        project_id: &str,
        job_id: &str,
        agent_id: &AgentId,
        now_ms: i64,
    ) -> Result<Option<JobRow>, StoreError> {
        self.check_project(project_id)?;
        let Some(job) = self.state.jobs.get_mut(job_id) else {
            return Ok(None);
        };
        if job.status != JobStatus::Todo {
            return Ok(None);
        }
        job.status = JobStatus::InProgress;
        job.assigned_to = Some(agent_id.as_str().to_string());
        job.updated_at_ms = now_ms;
        let claimed = job.clone();
        self.flush()?;
        Ok(Some(claimed))
    }

    fn update_job(
        &mut self,
        project_id: &str,
        job_id: &str,
        updates: &[JobUpdate],
        now_ms: i64,
    ) -> Result<JobRow, StoreError> {
        self.check_project(project_id)?;
        if updates.is_empty() {
            return Err(StoreError::InvalidInput("job update must change something"));
        }
        let current = self
            .state
            .jobs
            .get(job_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "job",
                id: job_id.to_string(),
            })?;
        let next = apply_job_updates(current, updates, now_ms)?;
        self.state.jobs.insert(job_id.to_string(), next.clone());
        self.flush()?;
        Ok(next)
    }

    fn select_project_jobs(&mut self, project_id: &str) -> Result<Vec<JobRow>, StoreError> {
        self.check_project(project_id)?;
        let mut jobs: Vec<JobRow> = self.state.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(jobs)
    }

    fn upsert_lock(
        &mut self,
        project_id: &str,
        request: LockRequest,
        ttl_ms: i64,
    ) -> Result<LockAcquire, StoreError> {
        self.check_project(project_id)?;
        let file_path = normalize_file_path(&request.file_path)?;
        let intent = normalize_intent(&request.intent)?;
        let user_prompt = normalize_user_prompt(&request.user_prompt);
        if request.agent_id.trim().is_empty() {
            return Err(StoreError::InvalidInput("lock.agent_id must not be empty"));
        }

        if let Some(current) = self.state.locks.get(&file_path)
            && current.agent_id != request.agent_id
            && current.is_live(ttl_ms, request.updated_at_ms)
        {
            return Ok(LockAcquire::Held(current.clone()));
        }

        let created_at_ms = match self.state.locks.get(&file_path) {
            Some(current) if current.agent_id == request.agent_id => current.created_at_ms,
            _ => request.created_at_ms,
        };
        let row = LockRow {
            project_id: project_id.to_string(),
            file_path: file_path.clone(),
            agent_id: request.agent_id,
            intent,
            user_prompt,
            created_at_ms,
            updated_at_ms: request.updated_at_ms,
        };
        self.state.locks.insert(file_path, row.clone());
        self.flush()?;
        Ok(LockAcquire::Granted(row))
    }

    fn select_project_locks(&mut self, project_id: &str) -> Result<Vec<LockRow>, StoreError> {
        self.check_project(project_id)?;
        Ok(self.state.locks.values().cloned().collect())
    }

    fn delete_lock(&mut self, project_id: &str, file_path: &str) -> Result<bool, StoreError> {
        self.check_project(project_id)?;
        let removed = self.state.locks.remove(file_path.trim()).is_some();
        if removed {
            self.flush()?;
        }
        Ok(removed)
    }

    fn reclaim_stale_locks(
        &mut self,
        project_id: &str,
        ttl_ms: i64,
        now_ms: i64,
    ) -> Result<usize, StoreError> {
        self.check_project(project_id)?;
        let before = self.state.locks.len();
        self.state
            .locks
            .retain(|_, lock| lock.is_live(ttl_ms, now_ms));
        let reclaimed = before - self.state.locks.len();
        if reclaimed > 0 {
            self.flush()?;
        }
        Ok(reclaimed)
    }

    fn read_notepad(&mut self, project_id: &str) -> Result<String, StoreError> {
        self.check_project(project_id)?;
        Ok(self.state.live_notepad.clone())
    }

    fn append_notepad(&mut self, project_id: &str, text: &str) -> Result<(), StoreError> {
        self.check_project(project_id)?;
        self.state.live_notepad.push_str(text);
        self.flush()
    }

    fn replace_notepad(&mut self, project_id: &str, text: &str) -> Result<(), StoreError> {
        self.check_project(project_id)?;
        self.state.live_notepad = text.to_string();
        self.flush()
    }

    fn archive_session(
        &mut self,
        project_id: &str,
        title: &str,
        summary: &str,
        full: &str,
    ) -> Result<String, StoreError> {
        self.check_project(project_id)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::InvalidInput("session.title must not be empty"));
        }

        let archive_path = self
            .history_dir
            .join(format!("session-{}.md", now_rfc3339()));
        let mut body = String::new();
        body.push_str(&format!("# {title}\n\n"));
        if !summary.is_empty() {
            body.push_str(&format!("> {summary}\n\n"));
        }
        body.push_str(full);
        if !body.ends_with('\n') {
            body.push('\n');
        }
        std::fs::write(&archive_path, body)?;
        Ok(archive_path.to_string_lossy().into_owned())
    }

    fn purge_terminal_jobs(&mut self, project_id: &str) -> Result<usize, StoreError> {
        self.check_project(project_id)?;
        let before = self.state.jobs.len();
        self.state.jobs.retain(|_, job| !job.status.is_terminal());
        let purged = before - self.state.jobs.len();
        if purged > 0 {
            self.flush()?;
        }
        Ok(purged)
    }

    fn insert_embeddings(
        &mut self,
        _project_id: &str,
        _items: Vec<EmbeddingItem>,
    ) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unsupported(
            "vector search requires the shared store",
        ))
    }

    fn match_embeddings(
        &mut self,
        _project_id: &str,
        _query: &[f32],
        _threshold: f32,
        _count: usize,
    ) -> Result<Vec<EmbeddingMatch>, StoreError> {
        Err(StoreError::Unsupported(
            "vector search requires the shared store",
        ))
    }
}
