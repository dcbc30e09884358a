#![forbid(unsafe_code)]

use ax_core::model::JobStatus;
use ax_storage::now_rfc3339;

use crate::error::CenterError;
use crate::{NerveCenter, parse_agent_id};

const MAX_CONTEXT_NOTE_LEN: usize = 4000;
const SUMMARY_LEN: usize = 500;

#[derive(Clone, Debug)]
pub struct FinalizeOutcome {
    pub archive_path: String,
}

#[derive(Clone, Debug, Default)]
pub struct UsageStats {
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    pub cancelled: usize,
    pub live_locks: usize,
    pub notepad_chars: usize,
}

fn summarize(text: &str) -> String {
    text.chars().take(SUMMARY_LEN).collect()
}

impl NerveCenter {
    /// Free-form agent note, appended as `- [{agent_id}] {text}`.
    pub fn update_shared_context(
        &mut self,
        project_id: &str,
        agent_id: &str,
        text: &str,
    ) -> Result<(), CenterError> {
        let agent = parse_agent_id(agent_id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(CenterError::bad_request("context text must not be empty"));
        }
        if text.len() > MAX_CONTEXT_NOTE_LEN {
            return Err(CenterError::bad_request("context text is too long"));
        }

        let entry = format!("\n- [{}] {}", agent.as_str(), text);
        self.store.append_notepad(project_id, &entry)?;
        self.notepad_cache
            .entry(project_id.to_string())
            .or_default()
            .push_str(&entry);
        Ok(())
    }

    /// Closes the running session: archive the notepad, reset it, clear all
    /// locks, drop terminal jobs. The archive write goes first; if it fails
    /// nothing live has been touched yet.
    pub fn finalize_session(&mut self, project_id: &str) -> Result<FinalizeOutcome, CenterError> {
        let notepad = self.store.read_notepad(project_id)?;

        let stamp = now_rfc3339();
        let archive_path = self.store.archive_session(
            project_id,
            &format!("Session {stamp}"),
            &summarize(&notepad),
            &notepad,
        )?;

        let marker = format!("Session Start: {stamp}\n");
        self.store.replace_notepad(project_id, &marker)?;
        self.notepad_cache.insert(project_id.to_string(), marker);

        for lock in self.store.select_project_locks(project_id)? {
            self.store.delete_lock(project_id, &lock.file_path)?;
        }
        let purged = self.store.purge_terminal_jobs(project_id)?;

        tracing::info!(project = project_id, purged, archive = %archive_path, "session finalized");
        Ok(FinalizeOutcome { archive_path })
    }

    /// Write-once snapshot of externally supplied session content. Live
    /// state (notepad, locks, jobs) is untouched; only finalize resets.
    pub fn sync_session(
        &mut self,
        project_id: &str,
        title: &str,
        content: &str,
    ) -> Result<String, CenterError> {
        let archive_ref =
            self.store
                .archive_session(project_id, title, &summarize(content), content)?;
        tracing::debug!(project = project_id, archive = %archive_ref, "session synced");
        Ok(archive_ref)
    }

    pub fn usage_stats(&mut self, project_id: &str) -> Result<UsageStats, CenterError> {
        let jobs = self.store.select_project_jobs(project_id)?;
        let locks = self.list_locks(project_id)?;
        let notepad = self.refresh_notepad(project_id)?;

        let mut stats = UsageStats {
            live_locks: locks.len(),
            notepad_chars: notepad.chars().count(),
            ..UsageStats::default()
        };
        for job in jobs {
            match job.status {
                JobStatus::Todo => stats.todo += 1,
                JobStatus::InProgress => stats.in_progress += 1,
                JobStatus::Done => stats.done += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }
        Ok(stats)
    }
}
