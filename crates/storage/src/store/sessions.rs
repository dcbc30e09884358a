#![forbid(unsafe_code)]

use rusqlite::params;

use super::error::StoreError;
use super::sqlite::SqliteStore;

impl SqliteStore {
    pub(in crate::store) fn archive_session_impl(
        &mut self,
        project_id: &str,
        title: &str,
        summary: &str,
        full: &str,
    ) -> Result<String, StoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StoreError::InvalidInput("session.title must not be empty"));
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO sessions(id, project_id, title, summary, content, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, project_id, title, summary, full, super::now_ms()],
        )?;
        Ok(id)
    }
}
