#![forbid(unsafe_code)]

use ax_core::model::{JobStatus, Priority};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRow {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: JobStatus,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub completion_key: String,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// Fully formed job record ready for insertion. Id, completion key, and
/// timestamps are minted by the caller; the store only persists.
#[derive(Clone, Debug)]
pub struct NewJob {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub dependencies: Vec<String>,
    pub completion_key: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRow {
    pub project_id: String,
    pub file_path: String,
    pub agent_id: String,
    pub intent: String,
    pub user_prompt: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl LockRow {
    /// Live test from the data model: age = now − updated_at, live iff ≤ TTL.
    pub fn is_live(&self, ttl_ms: i64, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.updated_at_ms) <= ttl_ms
    }
}

#[derive(Clone, Debug)]
pub struct LockRequest {
    pub file_path: String,
    pub agent_id: String,
    pub intent: String,
    pub user_prompt: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

/// Outcome of a conditional lock upsert.
#[derive(Clone, Debug)]
pub enum LockAcquire {
    Granted(LockRow),
    Held(LockRow),
}

#[derive(Clone, Debug)]
pub struct EmbeddingItem {
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: JsonValue,
}

#[derive(Clone, Debug)]
pub struct EmbeddingMatch {
    pub id: String,
    pub content: String,
    pub metadata: JsonValue,
    pub similarity: f32,
}
