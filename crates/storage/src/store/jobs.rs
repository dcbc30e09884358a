#![forbid(unsafe_code)]

use ax_core::ids::AgentId;
use ax_core::model::{JobStatus, JobUpdate, Priority};
use rusqlite::{OptionalExtension, Row, Transaction, params};

use super::error::StoreError;
use super::sqlite::SqliteStore;
use super::types::{JobRow, NewJob};

const MAX_JOB_TITLE_LEN: usize = 200;
const MAX_JOB_DESCRIPTION_LEN: usize = 50_000;
const MAX_JOB_DEPENDENCIES: usize = 32;
pub(in crate::store) const COMPLETION_KEY_LEN: usize = 8;

pub(in crate::store) fn normalize_job_title(raw: &str) -> Result<String, StoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StoreError::InvalidInput("job.title must not be empty"));
    }
    Ok(raw.chars().take(MAX_JOB_TITLE_LEN).collect())
}

pub(in crate::store) fn normalize_job_description(raw: &str) -> String {
    raw.trim().chars().take(MAX_JOB_DESCRIPTION_LEN).collect()
}

pub(in crate::store) fn normalize_dependencies(
    deps: Vec<String>,
) -> Result<Vec<String>, StoreError> {
    if deps.len() > MAX_JOB_DEPENDENCIES {
        return Err(StoreError::InvalidInput("job.dependencies has too many entries"));
    }
    let mut out = Vec::with_capacity(deps.len());
    for dep in deps {
        let dep = dep.trim().to_string();
        if dep.is_empty() {
            return Err(StoreError::InvalidInput(
                "job.dependencies must not contain empty ids",
            ));
        }
        if !out.contains(&dep) {
            out.push(dep);
        }
    }
    Ok(out)
}

pub(in crate::store) fn validate_completion_key(raw: &str) -> Result<(), StoreError> {
    if raw.len() < COMPLETION_KEY_LEN {
        return Err(StoreError::InvalidInput("job.completion_key is too short"));
    }
    Ok(())
}

/// Applies the update allow-list to a copy of the row. Terminal states are
/// sinks: a status change away from done/cancelled is refused.
pub(in crate::store) fn apply_job_updates(
    row: &JobRow,
    updates: &[JobUpdate],
    now_ms: i64,
) -> Result<JobRow, StoreError> {
    let mut next = row.clone();
    for update in updates {
        match update {
            JobUpdate::SetStatus(status) => {
                if next.status.is_terminal() && *status != next.status {
                    return Err(StoreError::Conflict {
                        entity: "job",
                        id: next.id.clone(),
                        reason: "status is terminal",
                    });
                }
                next.status = *status;
                match status {
                    JobStatus::Todo | JobStatus::Cancelled => next.assigned_to = None,
                    JobStatus::InProgress | JobStatus::Done => {}
                }
            }
            JobUpdate::SetPriority(priority) => next.priority = *priority,
            JobUpdate::SetAssignee(assignee) => next.assigned_to = assignee.clone(),
            JobUpdate::SetCancelReason(reason) => {
                next.cancel_reason = Some(reason.trim().to_string());
            }
        }
    }
    next.updated_at_ms = now_ms;
    Ok(next)
}

fn read_job_row(row: &Row<'_>) -> Result<JobRow, StoreError> {
    let priority_raw: String = row.get(4)?;
    let status_raw: String = row.get(5)?;
    let dependencies_raw: String = row.get(7)?;
    Ok(JobRow {
        project_id: row.get(0)?,
        id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: Priority::parse(&priority_raw)
            .ok_or(StoreError::InvalidInput("job.priority is invalid"))?,
        status: JobStatus::parse(&status_raw)
            .ok_or(StoreError::InvalidInput("job.status is invalid"))?,
        assigned_to: row.get(6)?,
        dependencies: serde_json::from_str(&dependencies_raw)?,
        completion_key: row.get(8)?,
        cancel_reason: row.get(9)?,
        created_at_ms: row.get(10)?,
        updated_at_ms: row.get(11)?,
    })
}

const JOB_COLUMNS: &str = "project_id, id, title, description, priority, status, assigned_to, \
                           dependencies, completion_key, cancel_reason, created_at_ms, updated_at_ms";

fn select_job_tx(
    tx: &Transaction<'_>,
    project_id: &str,
    job_id: &str,
) -> Result<Option<JobRow>, StoreError> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE project_id=?1 AND id=?2");
    let row = tx
        .query_row(&sql, params![project_id, job_id], |row| {
            Ok(read_job_row(row))
        })
        .optional()?;
    row.transpose()
}

fn ensure_project_tx(tx: &Transaction<'_>, project_id: &str) -> Result<(), StoreError> {
    let found = tx
        .query_row(
            "SELECT 1 FROM projects WHERE id=?1",
            params![project_id],
            |_| Ok(()),
        )
        .optional()?;
    if found.is_none() {
        return Err(StoreError::NotFound {
            entity: "project",
            id: project_id.to_string(),
        });
    }
    Ok(())
}

impl SqliteStore {
    pub(in crate::store) fn insert_job_impl(
        &mut self,
        project_id: &str,
        job: NewJob,
    ) -> Result<JobRow, StoreError> {
        let title = normalize_job_title(&job.title)?;
        let description = normalize_job_description(&job.description);
        let dependencies = normalize_dependencies(job.dependencies)?;
        validate_completion_key(&job.completion_key)?;

        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        ensure_project_tx(&tx, project_id)?;

        for dep in &dependencies {
            if select_job_tx(&tx, project_id, dep)?.is_none() {
                return Err(StoreError::NotFound {
                    entity: "job",
                    id: dep.clone(),
                });
            }
        }

        let dependencies_json = serde_json::to_string(&dependencies)?;
        tx.execute(
            r#"
            INSERT INTO jobs(
              project_id, id, title, description, priority, status, assigned_to,
              dependencies, completion_key, cancel_reason, created_at_ms, updated_at_ms
            )
            VALUES (?1, ?2, ?3, ?4, ?5, 'todo', NULL, ?6, ?7, NULL, ?8, ?8)
            "#,
            params![
                project_id,
                job.id,
                title,
                description,
                job.priority.as_str(),
                dependencies_json,
                job.completion_key,
                job.created_at_ms,
            ],
        )?;

        let inserted = select_job_tx(&tx, project_id, &job.id)?.ok_or(StoreError::NotFound {
            entity: "job",
            id: job.id.clone(),
        })?;
        tx.commit()?;
        Ok(inserted)
    }

    pub(in crate::store) fn conditional_claim_job_impl(
        &mut self,
        project_id: &str,
        job_id: &str,
        agent_id: &AgentId,
        now_ms: i64,
    ) -> Result<Option<JobRow>, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        // The status gate is the whole claim protocol: zero affected rows
        // means another claimant already flipped the job.
        let changed = tx.execute(
            "UPDATE jobs SET status='in_progress', assigned_to=?3, updated_at_ms=?4 \
             WHERE project_id=?1 AND id=?2 AND status='todo'",
            params![project_id, job_id, agent_id.as_str(), now_ms],
        )?;
        if changed == 0 {
            tx.commit()?;
            return Ok(None);
        }

        let claimed = select_job_tx(&tx, project_id, job_id)?.ok_or(StoreError::NotFound {
            entity: "job",
            id: job_id.to_string(),
        })?;
        tx.commit()?;
        Ok(Some(claimed))
    }

    pub(in crate::store) fn update_job_impl(
        &mut self,
        project_id: &str,
        job_id: &str,
        updates: &[JobUpdate],
        now_ms: i64,
    ) -> Result<JobRow, StoreError> {
        if updates.is_empty() {
            return Err(StoreError::InvalidInput("job update must change something"));
        }

        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let current = select_job_tx(&tx, project_id, job_id)?.ok_or(StoreError::NotFound {
            entity: "job",
            id: job_id.to_string(),
        })?;

        let next = apply_job_updates(&current, updates, now_ms)?;
        tx.execute(
            "UPDATE jobs SET priority=?3, status=?4, assigned_to=?5, cancel_reason=?6, \
             updated_at_ms=?7 WHERE project_id=?1 AND id=?2",
            params![
                project_id,
                job_id,
                next.priority.as_str(),
                next.status.as_str(),
                next.assigned_to,
                next.cancel_reason,
                next.updated_at_ms,
            ],
        )?;
        tx.commit()?;
        Ok(next)
    }

    pub(in crate::store) fn select_project_jobs_impl(
        &mut self,
        project_id: &str,
    ) -> Result<Vec<JobRow>, StoreError> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE project_id=?1 \
             ORDER BY created_at_ms ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![project_id])?;
        let mut jobs = Vec::new();
        while let Some(row) = rows.next()? {
            jobs.push(read_job_row(row)?);
        }
        Ok(jobs)
    }

    pub(in crate::store) fn purge_terminal_jobs_impl(
        &mut self,
        project_id: &str,
    ) -> Result<usize, StoreError> {
        let purged = self.conn.execute(
            "DELETE FROM jobs WHERE project_id=?1 AND status IN ('done', 'cancelled')",
            params![project_id],
        )?;
        Ok(purged)
    }
}
