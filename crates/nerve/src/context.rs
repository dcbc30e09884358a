#![forbid(unsafe_code)]
//! Rendered views: the live context document and the on-disk project soul.

use ax_storage::ms_to_rfc3339;

use crate::error::CenterError;
use crate::NerveCenter;

const SOUL_FILES: [&str; 2] = ["context.md", "conventions.md"];
const ACTIVITY_FILE: &str = "activity.md";

impl NerveCenter {
    /// Markdown snapshot of everything an agent needs before picking work:
    /// open jobs, live locks, and the notepad.
    pub fn get_core_context(&mut self, project_id: &str) -> Result<String, CenterError> {
        let jobs = self.list_jobs(project_id)?;
        let locks = self.list_locks(project_id)?;
        let notepad = self.refresh_notepad(project_id)?;

        let mut out = String::from("# Live Context\n\n## Job Board\n");
        let mut open_jobs = 0;
        for job in &jobs {
            if job.status.is_terminal() {
                continue;
            }
            open_jobs += 1;
            out.push_str(&format!(
                "- [{}] {} (job={}, priority={}",
                job.status.as_str(),
                job.title,
                job.id,
                job.priority.as_str()
            ));
            if let Some(assignee) = &job.assigned_to {
                out.push_str(&format!(", agent={assignee}"));
            }
            if !job.dependencies.is_empty() {
                out.push_str(&format!(", deps={}", job.dependencies.join(",")));
            }
            out.push_str(")\n");
        }
        if open_jobs == 0 {
            out.push_str("(no open jobs)\n");
        }

        out.push_str("\n## Active Locks\n");
        if locks.is_empty() {
            out.push_str("(no active locks)\n");
        }
        for lock in &locks {
            out.push_str(&format!(
                "- {} — {} ({}), since {}\n",
                lock.file_path,
                lock.agent_id,
                lock.intent,
                ms_to_rfc3339(lock.created_at_ms)
            ));
        }

        out.push_str("\n## Live Notepad\n");
        if notepad.trim().is_empty() {
            out.push_str("(empty)\n");
        } else {
            out.push_str(&notepad);
            if !notepad.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(out)
    }

    /// Concatenation of the well-known instruction files. Missing files
    /// degrade to a placeholder instead of failing the call.
    pub fn get_project_soul(&self) -> String {
        let mut out = String::new();
        for name in SOUL_FILES {
            let path = self.instructions_dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    out.push_str(content.trim_end());
                    out.push_str("\n\n");
                }
                Err(_) => {
                    out.push_str(&format!("({} not found in {})\n\n", name, self.instructions_dir.display()));
                }
            }
        }
        out.trim_end().to_string()
    }

    /// Rewrites the activity file that mirrors "what is being worked on
    /// right now" for humans browsing the instructions directory.
    pub fn record_activity(&self, text: &str) -> Result<(), CenterError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CenterError::bad_request("activity text must not be empty"));
        }
        std::fs::create_dir_all(&self.instructions_dir)
            .map_err(|err| CenterError::Store(err.into()))?;
        let path = self.instructions_dir.join(ACTIVITY_FILE);
        let body = format!("{text}\n");
        std::fs::write(&path, body).map_err(|err| CenterError::Store(err.into()))?;
        Ok(())
    }
}
