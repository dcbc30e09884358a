#![forbid(unsafe_code)]

use ax_storage::{LockAcquire, LockRequest, LockRow, now_ms};

use crate::error::CenterError;
use crate::{NerveCenter, parse_agent_id};

#[derive(Clone, Debug)]
pub enum LockOutcome {
    Granted(LockRow),
    /// The slot is held by another live agent. Never blocks, never queues:
    /// the caller is expected to pick up different work.
    RequiresOrchestration(LockRow),
}

impl NerveCenter {
    pub fn propose_file_access(
        &mut self,
        project_id: &str,
        agent_id: &str,
        file_path: &str,
        intent: &str,
        user_prompt: &str,
    ) -> Result<LockOutcome, CenterError> {
        let agent = parse_agent_id(agent_id)?;
        let now = now_ms();

        // Lazy expiry: any stale entry is swept before the slot is decided.
        self.store
            .reclaim_stale_locks(project_id, self.lock_ttl_ms, now)?;

        let acquired = self.store.upsert_lock(
            project_id,
            LockRequest {
                file_path: file_path.to_string(),
                agent_id: agent.as_str().to_string(),
                intent: intent.to_string(),
                user_prompt: user_prompt.to_string(),
                created_at_ms: now,
                updated_at_ms: now,
            },
            self.lock_ttl_ms,
        )?;

        match acquired {
            LockAcquire::Granted(row) => {
                tracing::debug!(project = project_id, file = %row.file_path, agent = agent.as_str(), "lock granted");
                self.note(
                    project_id,
                    &format!("[LOCK] {} by {} ({})", row.file_path, agent.as_str(), row.intent),
                );
                Ok(LockOutcome::Granted(row))
            }
            LockAcquire::Held(incumbent) => Ok(LockOutcome::RequiresOrchestration(incumbent)),
        }
    }

    /// Owner release. Refuses when the lock belongs to someone else; use
    /// [`NerveCenter::force_unlock`] for stuck-lock recovery.
    pub fn release_file_lock(
        &mut self,
        project_id: &str,
        agent_id: &str,
        file_path: &str,
    ) -> Result<bool, CenterError> {
        let agent = parse_agent_id(agent_id)?;
        let file_path = file_path.trim();
        let current = self
            .store
            .select_project_locks(project_id)?
            .into_iter()
            .find(|lock| lock.file_path == file_path);

        let Some(current) = current else {
            return Ok(false);
        };
        if current.agent_id != agent.as_str() {
            return Err(CenterError::Conflict(format!(
                "lock on {file_path} is held by {}",
                current.agent_id
            )));
        }

        let removed = self.store.delete_lock(project_id, file_path)?;
        if removed {
            self.note(
                project_id,
                &format!("[UNLOCK] {} by {}", file_path, agent.as_str()),
            );
        }
        Ok(removed)
    }

    /// Unconditional removal. Whether the target was actually stale is agent
    /// convention, not something the registry checks.
    pub fn force_unlock(
        &mut self,
        project_id: &str,
        file_path: &str,
        reason: &str,
    ) -> Result<bool, CenterError> {
        let file_path = file_path.trim();
        if file_path.is_empty() {
            return Err(CenterError::bad_request("file_path must not be empty"));
        }
        let removed = self.store.delete_lock(project_id, file_path)?;
        if removed {
            tracing::info!(project = project_id, file = file_path, "lock force-removed");
            let reason = reason.trim();
            let line = if reason.is_empty() {
                format!("[FORCE-UNLOCK] {file_path}")
            } else {
                format!("[FORCE-UNLOCK] {file_path}: {reason}")
            };
            self.note(project_id, &line);
        }
        Ok(removed)
    }

    /// Live locks only; expired entries are swept on the way.
    pub fn list_locks(&mut self, project_id: &str) -> Result<Vec<LockRow>, CenterError> {
        self.store
            .reclaim_stale_locks(project_id, self.lock_ttl_ms, now_ms())?;
        Ok(self.store.select_project_locks(project_id)?)
    }
}
