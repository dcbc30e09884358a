#![forbid(unsafe_code)]

use rusqlite::{OptionalExtension, Row, Transaction, params};

use super::error::StoreError;
use super::sqlite::SqliteStore;
use super::types::{LockAcquire, LockRequest, LockRow};

const MAX_FILE_PATH_LEN: usize = 1024;
const MAX_INTENT_LEN: usize = 400;
const MAX_USER_PROMPT_LEN: usize = 4000;

pub(in crate::store) fn normalize_file_path(raw: &str) -> Result<String, StoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StoreError::InvalidInput("lock.file_path must not be empty"));
    }
    if raw.len() > MAX_FILE_PATH_LEN {
        return Err(StoreError::InvalidInput("lock.file_path is too long"));
    }
    Ok(raw.to_string())
}

pub(in crate::store) fn normalize_intent(raw: &str) -> Result<String, StoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StoreError::InvalidInput("lock.intent must not be empty"));
    }
    Ok(raw.chars().take(MAX_INTENT_LEN).collect())
}

pub(in crate::store) fn normalize_user_prompt(raw: &str) -> String {
    raw.trim().chars().take(MAX_USER_PROMPT_LEN).collect()
}

fn read_lock_row(row: &Row<'_>) -> Result<LockRow, rusqlite::Error> {
    Ok(LockRow {
        project_id: row.get(0)?,
        file_path: row.get(1)?,
        agent_id: row.get(2)?,
        intent: row.get(3)?,
        user_prompt: row.get(4)?,
        created_at_ms: row.get(5)?,
        updated_at_ms: row.get(6)?,
    })
}

const LOCK_COLUMNS: &str =
    "project_id, file_path, agent_id, intent, user_prompt, created_at_ms, updated_at_ms";

fn select_lock_tx(
    tx: &Transaction<'_>,
    project_id: &str,
    file_path: &str,
) -> Result<Option<LockRow>, StoreError> {
    let sql = format!("SELECT {LOCK_COLUMNS} FROM locks WHERE project_id=?1 AND file_path=?2");
    Ok(tx
        .query_row(&sql, params![project_id, file_path], read_lock_row)
        .optional()?)
}

impl SqliteStore {
    pub(in crate::store) fn upsert_lock_impl(
        &mut self,
        project_id: &str,
        request: LockRequest,
        ttl_ms: i64,
    ) -> Result<LockAcquire, StoreError> {
        let file_path = normalize_file_path(&request.file_path)?;
        let intent = normalize_intent(&request.intent)?;
        let user_prompt = normalize_user_prompt(&request.user_prompt);
        if request.agent_id.trim().is_empty() {
            return Err(StoreError::InvalidInput("lock.agent_id must not be empty"));
        }
        let stale_cutoff_ms = request.updated_at_ms.saturating_sub(ttl_ms);

        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        // One conditional upsert decides acquisition: free slot, same owner,
        // or stale incumbent. A read-then-write pair would lose races to
        // other processes.
        let changed = tx.execute(
            r#"
            INSERT INTO locks(project_id, file_path, agent_id, intent, user_prompt,
                              created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(project_id, file_path) DO UPDATE SET
              agent_id=excluded.agent_id,
              intent=excluded.intent,
              user_prompt=excluded.user_prompt,
              created_at_ms=CASE WHEN locks.agent_id=excluded.agent_id
                                 THEN locks.created_at_ms
                                 ELSE excluded.created_at_ms END,
              updated_at_ms=excluded.updated_at_ms
            WHERE locks.agent_id=excluded.agent_id OR locks.updated_at_ms < ?8
            "#,
            params![
                project_id,
                file_path,
                request.agent_id,
                intent,
                user_prompt,
                request.created_at_ms,
                request.updated_at_ms,
                stale_cutoff_ms,
            ],
        )?;

        let current = select_lock_tx(&tx, project_id, &file_path)?;
        tx.commit()?;

        match current {
            Some(row) if changed > 0 => Ok(LockAcquire::Granted(row)),
            Some(row) => Ok(LockAcquire::Held(row)),
            // The conditional upsert either wrote our row or was blocked by
            // an incumbent, so the slot cannot be empty here.
            None => Err(StoreError::NotFound {
                entity: "lock",
                id: file_path,
            }),
        }
    }

    pub(in crate::store) fn select_project_locks_impl(
        &mut self,
        project_id: &str,
    ) -> Result<Vec<LockRow>, StoreError> {
        let sql = format!(
            "SELECT {LOCK_COLUMNS} FROM locks WHERE project_id=?1 ORDER BY file_path ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![project_id], read_lock_row)?;
        let mut locks = Vec::new();
        for row in rows {
            locks.push(row?);
        }
        Ok(locks)
    }

    pub(in crate::store) fn delete_lock_impl(
        &mut self,
        project_id: &str,
        file_path: &str,
    ) -> Result<bool, StoreError> {
        let deleted = self.conn.execute(
            "DELETE FROM locks WHERE project_id=?1 AND file_path=?2",
            params![project_id, file_path.trim()],
        )?;
        Ok(deleted > 0)
    }

    pub(in crate::store) fn reclaim_stale_locks_impl(
        &mut self,
        project_id: &str,
        ttl_ms: i64,
        now_ms: i64,
    ) -> Result<usize, StoreError> {
        let cutoff_ms = now_ms.saturating_sub(ttl_ms);
        let reclaimed = self.conn.execute(
            "DELETE FROM locks WHERE project_id=?1 AND updated_at_ms < ?2",
            params![project_id, cutoff_ms],
        )?;
        Ok(reclaimed)
    }
}
