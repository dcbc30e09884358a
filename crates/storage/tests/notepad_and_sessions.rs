#![forbid(unsafe_code)]

use ax_core::ids::{AgentId, ProjectName};
use ax_core::model::{JobStatus, JobUpdate, Priority};
use ax_storage::{LocalStore, NewJob, SqliteStore, Store};
use rusqlite::Connection;
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("ax_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn new_job(id: &str, created_at_ms: i64) -> NewJob {
    NewJob {
        id: id.to_string(),
        title: format!("job {id}"),
        description: "desc".to_string(),
        priority: Priority::Medium,
        dependencies: Vec::new(),
        completion_key: "ABCD1234".to_string(),
        created_at_ms,
    }
}

fn notepad_appends_in_order(store: &mut dyn Store, project_id: &str) {
    store.append_notepad(project_id, "first\n").expect("append");
    store.append_notepad(project_id, "second\n").expect("append");
    assert_eq!(store.read_notepad(project_id).expect("read"), "first\nsecond\n");

    store
        .replace_notepad(project_id, "Session Start: 2026-08-02T00:00:00Z\n")
        .expect("replace");
    assert_eq!(
        store.read_notepad(project_id).expect("read"),
        "Session Start: 2026-08-02T00:00:00Z\n"
    );
}

#[test]
fn sqlite_notepad_appends_in_order() {
    let dir = temp_dir("sqlite_notepad_order");
    let mut store = SqliteStore::open(dir.join("shared.db")).expect("open");
    let name = ProjectName::try_new("proj").expect("name");
    let project = store.resolve_project(&name, "owner-1").expect("resolve");
    notepad_appends_in_order(&mut store, &project.id);
}

#[test]
fn local_notepad_appends_in_order() {
    let dir = temp_dir("local_notepad_order");
    let name = ProjectName::try_new("proj").expect("name");
    let mut store =
        LocalStore::open(dir.join("nerve-center-state.json"), &name, "owner-1").expect("open");
    let project = store.resolve_project(&name, "owner-1").expect("resolve");
    notepad_appends_in_order(&mut store, &project.id);
}

fn purge_leaves_open_jobs(store: &mut dyn Store, project_id: &str) {
    store.insert_job(project_id, new_job("j-todo", 1_000)).expect("insert");
    store.insert_job(project_id, new_job("j-done", 1_001)).expect("insert");
    store.insert_job(project_id, new_job("j-cancelled", 1_002)).expect("insert");

    let agent = AgentId::try_new("alice").expect("agent");
    store
        .conditional_claim_job(project_id, "j-done", &agent, 1_500)
        .expect("claim")
        .expect("claimed");
    store
        .update_job(project_id, "j-done", &[JobUpdate::SetStatus(JobStatus::Done)], 2_000)
        .expect("complete");
    store
        .update_job(
            project_id,
            "j-cancelled",
            &[
                JobUpdate::SetStatus(JobStatus::Cancelled),
                JobUpdate::SetCancelReason("obsolete".to_string()),
            ],
            2_001,
        )
        .expect("cancel");

    let purged = store.purge_terminal_jobs(project_id).expect("purge");
    assert_eq!(purged, 2);

    let remaining = store.select_project_jobs(project_id).expect("select");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "j-todo");
    assert_eq!(remaining[0].status, JobStatus::Todo);
}

#[test]
fn sqlite_purge_leaves_open_jobs() {
    let dir = temp_dir("sqlite_purge");
    let mut store = SqliteStore::open(dir.join("shared.db")).expect("open");
    let name = ProjectName::try_new("proj").expect("name");
    let project = store.resolve_project(&name, "owner-1").expect("resolve");
    purge_leaves_open_jobs(&mut store, &project.id);
}

#[test]
fn local_purge_leaves_open_jobs() {
    let dir = temp_dir("local_purge");
    let name = ProjectName::try_new("proj").expect("name");
    let mut store =
        LocalStore::open(dir.join("nerve-center-state.json"), &name, "owner-1").expect("open");
    let project = store.resolve_project(&name, "owner-1").expect("resolve");
    purge_leaves_open_jobs(&mut store, &project.id);
}

#[test]
fn sqlite_archive_session_is_write_once_row() {
    let dir = temp_dir("sqlite_archive_row");
    let db_path = dir.join("shared.db");
    let mut store = SqliteStore::open(&db_path).expect("open");
    let name = ProjectName::try_new("proj").expect("name");
    let project = store.resolve_project(&name, "owner-1").expect("resolve");

    let archive_id = store
        .archive_session(&project.id, "Session A", "first 500 chars", "the full notepad")
        .expect("archive");

    let conn = Connection::open(&db_path).expect("reopen raw");
    let (title, summary, content): (String, String, String) = conn
        .query_row(
            "SELECT title, summary, content FROM sessions WHERE id=?1",
            rusqlite::params![archive_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("archived row");
    assert_eq!(title, "Session A");
    assert_eq!(summary, "first 500 chars");
    assert_eq!(content, "the full notepad");
}

#[test]
fn sqlite_embeddings_round_trip_with_threshold() {
    let dir = temp_dir("sqlite_embeddings");
    let mut store = SqliteStore::open(dir.join("shared.db")).expect("open");
    let name = ProjectName::try_new("proj").expect("name");
    let project = store.resolve_project(&name, "owner-1").expect("resolve");

    let items = vec![
        ax_storage::EmbeddingItem {
            content: "rust async runtime notes".to_string(),
            embedding: vec![1.0, 0.0, 0.0],
            metadata: serde_json::json!({"kind": "doc"}),
        },
        ax_storage::EmbeddingItem {
            content: "unrelated cooking recipe".to_string(),
            embedding: vec![0.0, 1.0, 0.0],
            metadata: serde_json::json!({"kind": "doc"}),
        },
    ];
    let ids = store.insert_embeddings(&project.id, items).expect("insert");
    assert_eq!(ids.len(), 2);

    let matches = store
        .match_embeddings(&project.id, &[1.0, 0.0, 0.0], 0.5, 10)
        .expect("match");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].content, "rust async runtime notes");
    assert!(matches[0].similarity > 0.99);
}
