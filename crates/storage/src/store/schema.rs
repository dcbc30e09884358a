#![forbid(unsafe_code)]

use super::error::StoreError;
use rusqlite::{Connection, params};

const PRAGMAS_SQL: &str = r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA busy_timeout=15000;
        PRAGMA foreign_keys=ON;
"#;

const CORE_SQL: &str = r#"
        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS projects (
          id TEXT PRIMARY KEY,
          name TEXT NOT NULL,
          owner_id TEXT NOT NULL,
          live_notepad TEXT NOT NULL DEFAULT '',
          created_at_ms INTEGER NOT NULL,
          UNIQUE (name, owner_id)
        );
"#;

const JOBS_SQL: &str = r#"
        CREATE TABLE IF NOT EXISTS jobs (
          project_id TEXT NOT NULL,
          id TEXT NOT NULL,
          title TEXT NOT NULL,
          description TEXT NOT NULL,
          priority TEXT NOT NULL DEFAULT 'medium',
          status TEXT NOT NULL DEFAULT 'todo',
          assigned_to TEXT,
          dependencies TEXT NOT NULL DEFAULT '[]',
          completion_key TEXT NOT NULL,
          cancel_reason TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          PRIMARY KEY (project_id, id)
        );
"#;

const LOCKS_SQL: &str = r#"
        CREATE TABLE IF NOT EXISTS locks (
          project_id TEXT NOT NULL,
          file_path TEXT NOT NULL,
          agent_id TEXT NOT NULL,
          intent TEXT NOT NULL,
          user_prompt TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          PRIMARY KEY (project_id, file_path)
        );
"#;

const SESSIONS_SQL: &str = r#"
        CREATE TABLE IF NOT EXISTS sessions (
          id TEXT PRIMARY KEY,
          project_id TEXT NOT NULL,
          title TEXT NOT NULL,
          summary TEXT NOT NULL,
          content TEXT NOT NULL,
          metadata TEXT NOT NULL DEFAULT '{}',
          created_at_ms INTEGER NOT NULL
        );
"#;

const EMBEDDINGS_SQL: &str = r#"
        CREATE TABLE IF NOT EXISTS embeddings (
          id TEXT PRIMARY KEY,
          project_id TEXT NOT NULL,
          content TEXT NOT NULL,
          embedding TEXT NOT NULL,
          metadata TEXT NOT NULL DEFAULT '{}',
          created_at_ms INTEGER NOT NULL
        );
"#;

const INDEXES_SQL: &str = r#"
        CREATE INDEX IF NOT EXISTS idx_jobs_project_status
          ON jobs(project_id, status);
        CREATE INDEX IF NOT EXISTS idx_locks_project_updated
          ON locks(project_id, updated_at_ms);
        CREATE INDEX IF NOT EXISTS idx_sessions_project
          ON sessions(project_id, created_at_ms);
        CREATE INDEX IF NOT EXISTS idx_embeddings_project
          ON embeddings(project_id);
"#;

fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(PRAGMAS_SQL);
    sql.push_str(CORE_SQL);
    sql.push_str(JOBS_SQL);
    sql.push_str(LOCKS_SQL);
    sql.push_str(SESSIONS_SQL);
    sql.push_str(EMBEDDINGS_SQL);
    sql.push_str(INDEXES_SQL);
    sql
}

pub(in crate::store) fn migrate_sqlite_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(&full_schema_sql())?;

    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
        params!["schema_version", "v1"],
    )?;

    Ok(())
}
