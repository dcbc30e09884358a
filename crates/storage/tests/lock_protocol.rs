#![forbid(unsafe_code)]

use ax_core::ids::ProjectName;
use ax_storage::{LocalStore, LockAcquire, LockRequest, SqliteStore, Store};
use std::path::PathBuf;

const TTL_MS: i64 = 30 * 60 * 1000;

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

fn open_sqlite(test_name: &str) -> (Box<dyn Store>, String) {
    let dir = temp_dir(test_name);
    let mut store = SqliteStore::open(dir.join("shared.db")).expect("open sqlite store");
    let name = ProjectName::try_new("proj").expect("project name");
    let project = store.resolve_project(&name, "owner-1").expect("resolve");
    (Box::new(store), project.id)
}

fn open_local(test_name: &str) -> (Box<dyn Store>, String) {
    let dir = temp_dir(test_name);
    let name = ProjectName::try_new("proj").expect("project name");
    let mut store =
        LocalStore::open(dir.join("nerve-center-state.json"), &name, "owner-1").expect("open");
    let project = store.resolve_project(&name, "owner-1").expect("resolve");
    (Box::new(store), project.id)
}

fn request(agent: &str, file_path: &str, at_ms: i64) -> LockRequest {
    LockRequest {
        file_path: file_path.to_string(),
        agent_id: agent.to_string(),
        intent: "edit".to_string(),
        user_prompt: "prompt".to_string(),
        created_at_ms: at_ms,
        updated_at_ms: at_ms,
    }
}

fn live_lock_blocks_other_agents(store: &mut dyn Store, project_id: &str) {
    let granted = store
        .upsert_lock(project_id, request("alice", "src/x.ts", 1_000), TTL_MS)
        .expect("first acquire");
    let LockAcquire::Granted(row) = granted else {
        panic!("expected grant for free slot");
    };
    assert_eq!(row.agent_id, "alice");

    let contested = store
        .upsert_lock(project_id, request("bob", "src/x.ts", 2_000), TTL_MS)
        .expect("contested acquire");
    let LockAcquire::Held(incumbent) = contested else {
        panic!("expected incumbent to hold the slot");
    };
    assert_eq!(incumbent.agent_id, "alice");
    assert_eq!(incumbent.intent, "edit");

    // The losing call must not have mutated the registry.
    let locks = store.select_project_locks(project_id).expect("list locks");
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].agent_id, "alice");
    assert_eq!(locks[0].updated_at_ms, 1_000);
}

#[test]
fn sqlite_live_lock_blocks_other_agents() {
    let (mut store, project_id) = open_sqlite("sqlite_lock_blocks");
    live_lock_blocks_other_agents(store.as_mut(), &project_id);
}

#[test]
fn local_live_lock_blocks_other_agents() {
    let (mut store, project_id) = open_local("local_lock_blocks");
    live_lock_blocks_other_agents(store.as_mut(), &project_id);
}

fn owner_refresh_keeps_created_at(store: &mut dyn Store, project_id: &str) {
    store
        .upsert_lock(project_id, request("alice", "src/x.ts", 1_000), TTL_MS)
        .expect("acquire");
    let refreshed = store
        .upsert_lock(project_id, request("alice", "src/x.ts", 5_000), TTL_MS)
        .expect("refresh");
    let LockAcquire::Granted(row) = refreshed else {
        panic!("owner refresh must succeed");
    };
    assert_eq!(row.created_at_ms, 1_000, "refresh keeps the original acquisition time");
    assert_eq!(row.updated_at_ms, 5_000);
}

#[test]
fn sqlite_owner_refresh_keeps_created_at() {
    let (mut store, project_id) = open_sqlite("sqlite_owner_refresh");
    owner_refresh_keeps_created_at(store.as_mut(), &project_id);
}

#[test]
fn local_owner_refresh_keeps_created_at() {
    let (mut store, project_id) = open_local("local_owner_refresh");
    owner_refresh_keeps_created_at(store.as_mut(), &project_id);
}

fn stale_lock_is_replaced(store: &mut dyn Store, project_id: &str) {
    let acquired_at = 1_000;
    store
        .upsert_lock(project_id, request("alice", "f", acquired_at), TTL_MS)
        .expect("acquire");

    // One minute past the TTL: any agent may take the slot over.
    let later = acquired_at + TTL_MS + 60_000;
    let takeover = store
        .upsert_lock(project_id, request("bob", "f", later), TTL_MS)
        .expect("takeover");
    let LockAcquire::Granted(row) = takeover else {
        panic!("stale lock must be replaced");
    };
    assert_eq!(row.agent_id, "bob");
    assert_eq!(row.created_at_ms, later);

    let locks = store.select_project_locks(project_id).expect("list locks");
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].agent_id, "bob");
}

#[test]
fn sqlite_stale_lock_is_replaced() {
    let (mut store, project_id) = open_sqlite("sqlite_stale_replaced");
    stale_lock_is_replaced(store.as_mut(), &project_id);
}

#[test]
fn local_stale_lock_is_replaced() {
    let (mut store, project_id) = open_local("local_stale_replaced");
    stale_lock_is_replaced(store.as_mut(), &project_id);
}

fn reclaim_removes_only_stale_locks(store: &mut dyn Store, project_id: &str) {
    store
        .upsert_lock(project_id, request("alice", "old", 1_000), TTL_MS)
        .expect("acquire old");
    let now_ms = 1_000 + TTL_MS + 1;
    store
        .upsert_lock(project_id, request("bob", "fresh", now_ms), TTL_MS)
        .expect("acquire fresh");

    let reclaimed = store
        .reclaim_stale_locks(project_id, TTL_MS, now_ms)
        .expect("reclaim");
    assert_eq!(reclaimed, 1);

    let locks = store.select_project_locks(project_id).expect("list locks");
    assert_eq!(locks.len(), 1);
    assert_eq!(locks[0].file_path, "fresh");
}

#[test]
fn sqlite_reclaim_removes_only_stale_locks() {
    let (mut store, project_id) = open_sqlite("sqlite_reclaim");
    reclaim_removes_only_stale_locks(store.as_mut(), &project_id);
}

#[test]
fn local_reclaim_removes_only_stale_locks() {
    let (mut store, project_id) = open_local("local_reclaim");
    reclaim_removes_only_stale_locks(store.as_mut(), &project_id);
}

fn delete_lock_reports_presence(store: &mut dyn Store, project_id: &str) {
    store
        .upsert_lock(project_id, request("alice", "src/x.ts", 1_000), TTL_MS)
        .expect("acquire");
    assert!(store.delete_lock(project_id, "src/x.ts").expect("delete"));
    assert!(!store.delete_lock(project_id, "src/x.ts").expect("second delete"));
    assert!(store.select_project_locks(project_id).expect("list").is_empty());
}

#[test]
fn sqlite_delete_lock_reports_presence() {
    let (mut store, project_id) = open_sqlite("sqlite_delete_lock");
    delete_lock_reports_presence(store.as_mut(), &project_id);
}

#[test]
fn local_delete_lock_reports_presence() {
    let (mut store, project_id) = open_local("local_delete_lock");
    delete_lock_reports_presence(store.as_mut(), &project_id);
}
