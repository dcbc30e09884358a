#![forbid(unsafe_code)]

use ax_core::ids::ProjectName;
use rusqlite::{OptionalExtension, params};

use super::error::StoreError;
use super::sqlite::SqliteStore;
use super::types::ProjectRecord;

impl SqliteStore {
    pub(in crate::store) fn resolve_project_impl(
        &mut self,
        name: &ProjectName,
        owner_id: &str,
    ) -> Result<ProjectRecord, StoreError> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(StoreError::InvalidInput("owner id must not be empty"));
        }

        let now_ms = super::now_ms();
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let existing = tx
            .query_row(
                "SELECT id FROM projects WHERE name=?1 AND owner_id=?2",
                params![name.as_str(), owner_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO projects(id, name, owner_id, live_notepad, created_at_ms) \
                     VALUES (?1, ?2, ?3, '', ?4)",
                    params![id, name.as_str(), owner_id, now_ms],
                )?;
                id
            }
        };

        tx.commit()?;
        Ok(ProjectRecord {
            id,
            name: name.as_str().to_string(),
            owner_id: owner_id.to_string(),
        })
    }

    pub(in crate::store) fn read_notepad_impl(
        &mut self,
        project_id: &str,
    ) -> Result<String, StoreError> {
        self.conn
            .query_row(
                "SELECT live_notepad FROM projects WHERE id=?1",
                params![project_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound {
                entity: "project",
                id: project_id.to_string(),
            })
    }

    pub(in crate::store) fn append_notepad_impl(
        &mut self,
        project_id: &str,
        text: &str,
    ) -> Result<(), StoreError> {
        // Single-statement append keeps the store the ordering authority
        // across processes.
        let changed = self.conn.execute(
            "UPDATE projects SET live_notepad = live_notepad || ?2 WHERE id=?1",
            params![project_id, text],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "project",
                id: project_id.to_string(),
            });
        }
        Ok(())
    }

    pub(in crate::store) fn replace_notepad_impl(
        &mut self,
        project_id: &str,
        text: &str,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE projects SET live_notepad = ?2 WHERE id=?1",
            params![project_id, text],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "project",
                id: project_id.to_string(),
            });
        }
        Ok(())
    }
}
