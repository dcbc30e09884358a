#![forbid(unsafe_code)]

use ax_nerve::LockOutcome;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::{bad_request, fail};

#[derive(Deserialize)]
pub(crate) struct LocksQuery {
    #[serde(rename = "projectName")]
    project_name: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct LocksActionReq {
    action: String,
    #[serde(rename = "projectName")]
    project_name: Option<String>,
    #[serde(rename = "filePath")]
    file_path: Option<String>,
    #[serde(rename = "agentId")]
    agent_id: Option<String>,
    intent: Option<String>,
    #[serde(rename = "userPrompt")]
    user_prompt: Option<String>,
    reason: Option<String>,
}

fn lock_json(lock: &ax_storage::LockRow) -> Value {
    serde_json::to_value(lock).unwrap_or_else(|_| json!({}))
}

pub(crate) async fn locks_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LocksQuery>,
) -> (StatusCode, Json<Value>) {
    let principal = match authenticate(&state, &headers) {
        Ok(principal) => principal,
        Err(err) => return fail(state.production, &err),
    };

    let mut center = state.center.lock().await;
    let project_name = state.project_name(query.project_name.as_deref()).to_string();
    let project_id = match center.resolve_project(&project_name, &principal.owner_id) {
        Ok(id) => id,
        Err(err) => return fail(state.production, &err),
    };
    match center.list_locks(&project_id) {
        Ok(locks) => (
            StatusCode::OK,
            Json(json!({ "locks": locks.iter().map(lock_json).collect::<Vec<_>>() })),
        ),
        Err(err) => fail(state.production, &err),
    }
}

pub(crate) async fn locks_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LocksActionReq>,
) -> (StatusCode, Json<Value>) {
    let principal = match authenticate(&state, &headers) {
        Ok(principal) => principal,
        Err(err) => return fail(state.production, &err),
    };

    let mut center = state.center.lock().await;
    let project_name = state.project_name(req.project_name.as_deref()).to_string();
    let project_id = match center.resolve_project(&project_name, &principal.owner_id) {
        Ok(id) => id,
        Err(err) => return fail(state.production, &err),
    };

    let Some(file_path) = req.file_path.as_deref().map(str::trim).filter(|p| !p.is_empty())
    else {
        return bad_request(state.production, "filePath is required");
    };

    match req.action.as_str() {
        "lock" => {
            let Some(agent) = req.agent_id.as_deref() else {
                return bad_request(state.production, "agentId is required");
            };
            let Some(intent) = req.intent.as_deref().map(str::trim).filter(|i| !i.is_empty())
            else {
                return bad_request(state.production, "intent is required");
            };
            match center.propose_file_access(
                &project_id,
                agent,
                file_path,
                intent,
                req.user_prompt.as_deref().unwrap_or(""),
            ) {
                Ok(LockOutcome::Granted(lock)) => (
                    StatusCode::OK,
                    Json(json!({ "status": "GRANTED", "lock": lock_json(&lock) })),
                ),
                // The incumbent rides along so the caller can orchestrate.
                Ok(LockOutcome::RequiresOrchestration(current)) => (
                    StatusCode::CONFLICT,
                    Json(json!({ "status": "DENIED", "current_lock": lock_json(&current) })),
                ),
                Err(err) => fail(state.production, &err),
            }
        }
        "unlock" => {
            let result = match req.agent_id.as_deref() {
                Some(agent) => center.release_file_lock(&project_id, agent, file_path),
                None => center.force_unlock(
                    &project_id,
                    file_path,
                    req.reason.as_deref().unwrap_or("released via api"),
                ),
            };
            match result {
                Ok(removed) => (StatusCode::OK, Json(json!({ "success": true, "removed": removed }))),
                Err(err) => fail(state.production, &err),
            }
        }
        other => bad_request(
            state.production,
            &format!("unknown action: {other} (expected lock | unlock)"),
        ),
    }
}
