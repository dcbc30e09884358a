#![forbid(unsafe_code)]

use ax_core::model::{JobStatus, JobUpdate, Priority};
use ax_storage::{JobRow, NewJob, now_ms};
use rand::Rng;
use std::collections::HashSet;

use crate::error::CenterError;
use crate::{NerveCenter, parse_agent_id};

const COMPLETION_KEY_LEN: usize = 8;
const COMPLETION_KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Post-time token that authorises completion by a non-assignee. Drawn from
/// the OS CSPRNG; the alphabet is uppercase alphanumeric by convention, not
/// checked downstream.
fn generate_completion_key() -> String {
    let mut rng = rand::rngs::OsRng;
    (0..COMPLETION_KEY_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..COMPLETION_KEY_ALPHABET.len());
            COMPLETION_KEY_ALPHABET[idx] as char
        })
        .collect()
}

#[derive(Clone, Debug)]
pub enum ClaimOutcome {
    Claimed(JobRow),
    NoJobsAvailable,
}

impl NerveCenter {
    pub fn post_job(
        &mut self,
        project_id: &str,
        agent_id: &str,
        title: &str,
        description: &str,
        priority: Option<Priority>,
        dependencies: Vec<String>,
    ) -> Result<JobRow, CenterError> {
        let agent = parse_agent_id(agent_id)?;
        let job = NewJob {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            priority: priority.unwrap_or_default(),
            dependencies,
            completion_key: generate_completion_key(),
            created_at_ms: now_ms(),
        };
        let inserted = self.store.insert_job(project_id, job)?;
        tracing::debug!(project = project_id, job = %inserted.id, "job posted");
        self.note(
            project_id,
            &format!(
                "[JOB POSTED] {} (job={}, priority={}, by={})",
                inserted.title,
                inserted.id,
                inserted.priority.as_str(),
                agent.as_str()
            ),
        );
        Ok(inserted)
    }

    /// Hands out at most one job per call. Candidates are scanned in
    /// selection order and every claim is re-checked against the store, so a
    /// lost race just moves on to the next candidate.
    pub fn claim_next_job(
        &mut self,
        project_id: &str,
        agent_id: &str,
    ) -> Result<ClaimOutcome, CenterError> {
        let agent = parse_agent_id(agent_id)?;
        let jobs = self.store.select_project_jobs(project_id)?;

        let done_ids: HashSet<&str> = jobs
            .iter()
            .filter(|job| job.status == JobStatus::Done)
            .map(|job| job.id.as_str())
            .collect();

        let mut candidates: Vec<&JobRow> = jobs
            .iter()
            .filter(|job| job.status == JobStatus::Todo)
            .filter(|job| {
                job.dependencies
                    .iter()
                    .all(|dep| done_ids.contains(dep.as_str()))
            })
            .collect();
        candidates.sort_by(|a, b| {
            a.priority
                .rank()
                .cmp(&b.priority.rank())
                .then_with(|| a.created_at_ms.cmp(&b.created_at_ms))
                .then_with(|| a.id.cmp(&b.id))
        });

        for candidate in candidates {
            match self
                .store
                .conditional_claim_job(project_id, &candidate.id, &agent, now_ms())?
            {
                Some(claimed) => {
                    tracing::debug!(project = project_id, job = %claimed.id, agent = agent.as_str(), "job claimed");
                    self.note(
                        project_id,
                        &format!(
                            "[JOB CLAIMED] {} (job={}, agent={})",
                            claimed.title,
                            claimed.id,
                            agent.as_str()
                        ),
                    );
                    return Ok(ClaimOutcome::Claimed(claimed));
                }
                // Another agent won this row between our read and the
                // conditional update; try the next candidate.
                None => continue,
            }
        }
        Ok(ClaimOutcome::NoJobsAvailable)
    }

    /// Dual authorisation: the assignee may complete by identity, anyone
    /// else only with the post-time completion key. Locks are NOT released
    /// here; unlocking stays explicit.
    pub fn complete_job(
        &mut self,
        project_id: &str,
        agent_id: &str,
        job_id: &str,
        outcome: &str,
        completion_key: Option<&str>,
    ) -> Result<JobRow, CenterError> {
        let agent = parse_agent_id(agent_id)?;
        let job = self.find_job(project_id, job_id)?;

        let is_assignee = job.assigned_to.as_deref() == Some(agent.as_str());
        let key_matches = completion_key
            .map(|key| !key.trim().is_empty() && key.trim() == job.completion_key)
            .unwrap_or(false);
        if !is_assignee && !key_matches {
            return Err(CenterError::Unauthorized(
                "completion denied: caller is not the assignee and the completion key does not match"
                    .to_string(),
            ));
        }
        if job.status.is_terminal() {
            return Err(CenterError::Conflict(format!(
                "job {job_id} is already {}",
                job.status.as_str()
            )));
        }

        let mut updates = vec![JobUpdate::SetStatus(JobStatus::Done)];
        if job.assigned_to.is_none() {
            // Completion by key of a never-claimed job: record who closed it.
            updates.push(JobUpdate::SetAssignee(Some(agent.as_str().to_string())));
        }
        let updated = self.store.update_job(project_id, job_id, &updates, now_ms())?;
        tracing::debug!(project = project_id, job = job_id, agent = agent.as_str(), "job completed");

        let outcome = outcome.trim();
        let line = if outcome.is_empty() {
            format!("[JOB DONE] {} (job={}, by={})", updated.title, job_id, agent.as_str())
        } else {
            format!(
                "[JOB DONE] {} (job={}, by={}): {}",
                updated.title,
                job_id,
                agent.as_str(),
                outcome
            )
        };
        self.note(project_id, &line);
        Ok(updated)
    }

    pub fn cancel_job(
        &mut self,
        project_id: &str,
        job_id: &str,
        reason: &str,
    ) -> Result<JobRow, CenterError> {
        let updated = self.store.update_job(
            project_id,
            job_id,
            &[
                JobUpdate::SetStatus(JobStatus::Cancelled),
                JobUpdate::SetCancelReason(reason.to_string()),
            ],
            now_ms(),
        )?;
        tracing::debug!(project = project_id, job = job_id, "job cancelled");
        self.note(
            project_id,
            &format!(
                "[JOB CANCELLED] {} (job={}): {}",
                updated.title,
                job_id,
                reason.trim()
            ),
        );
        Ok(updated)
    }

    /// General field update backing the HTTP `update` action. Only fields
    /// expressible through the [`JobUpdate`] allow-list can change.
    pub fn update_job(
        &mut self,
        project_id: &str,
        job_id: &str,
        updates: Vec<JobUpdate>,
    ) -> Result<JobRow, CenterError> {
        if updates.is_empty() {
            return Err(CenterError::bad_request("no recognised fields to update"));
        }
        Ok(self.store.update_job(project_id, job_id, &updates, now_ms())?)
    }

    pub fn list_jobs(&mut self, project_id: &str) -> Result<Vec<JobRow>, CenterError> {
        Ok(self.store.select_project_jobs(project_id)?)
    }

    fn find_job(&mut self, project_id: &str, job_id: &str) -> Result<JobRow, CenterError> {
        self.store
            .select_project_jobs(project_id)?
            .into_iter()
            .find(|job| job.id == job_id)
            .ok_or(CenterError::NotFound {
                entity: "job",
                id: job_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::generate_completion_key;

    #[test]
    fn completion_key_is_eight_uppercase_alphanumerics() {
        for _ in 0..64 {
            let key = generate_completion_key();
            assert_eq!(key.len(), 8);
            assert!(
                key.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()),
                "unexpected key {key}"
            );
        }
    }

    #[test]
    fn completion_keys_do_not_repeat_casually() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..256 {
            assert!(seen.insert(generate_completion_key()), "key collision");
        }
    }
}
