#![forbid(unsafe_code)]

use ax_core::model::{JobStatus, JobUpdate, Priority};
use ax_nerve::ClaimOutcome;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::AppState;
use crate::auth::authenticate;
use crate::error::{bad_request, fail};

#[derive(Deserialize)]
pub(crate) struct JobsQuery {
    #[serde(rename = "projectName")]
    project_name: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct JobsActionReq {
    action: String,
    #[serde(rename = "projectName")]
    project_name: Option<String>,
    title: Option<String>,
    description: Option<String>,
    priority: Option<String>,
    dependencies: Option<Vec<String>>,
    #[serde(rename = "agentId")]
    agent_id: Option<String>,
    #[serde(rename = "jobId")]
    job_id: Option<String>,
    status: Option<String>,
    assigned_to: Option<String>,
    cancel_reason: Option<String>,
}

fn job_json(job: &ax_storage::JobRow) -> Value {
    serde_json::to_value(job).unwrap_or_else(|_| json!({}))
}

pub(crate) async fn jobs_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<JobsQuery>,
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
    match center.list_jobs(&project_id) {
        Ok(jobs) => (
            StatusCode::OK,
            Json(json!({ "jobs": jobs.iter().map(job_json).collect::<Vec<_>>() })),
        ),
        Err(err) => fail(state.production, &err),
    }
}

pub(crate) async fn jobs_action(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<JobsActionReq>,
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

    match req.action.as_str() {
        "post" => {
            let Some(title) = req.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
            else {
                return bad_request(state.production, "title is required");
            };
            let priority = match req.priority.as_deref() {
                None => None,
                Some(raw) => match Priority::parse(raw) {
                    Some(priority) => Some(priority),
                    None => {
                        return bad_request(
                            state.production,
                            "priority must be one of: low | medium | high | critical",
                        );
                    }
                },
            };
            let agent = req.agent_id.as_deref().unwrap_or("api");
            match center.post_job(
                &project_id,
                agent,
                title,
                req.description.as_deref().unwrap_or(""),
                priority,
                req.dependencies.unwrap_or_default(),
            ) {
                Ok(job) => (StatusCode::CREATED, Json(job_json(&job))),
                Err(err) => fail(state.production, &err),
            }
        }
        "claim" => {
            let Some(agent) = req.agent_id.as_deref() else {
                return bad_request(state.production, "agentId is required");
            };
            match center.claim_next_job(&project_id, agent) {
                Ok(ClaimOutcome::Claimed(job)) => (
                    StatusCode::OK,
                    Json(json!({ "status": "CLAIMED", "job": job_json(&job) })),
                ),
                Ok(ClaimOutcome::NoJobsAvailable) => {
                    (StatusCode::OK, Json(json!({ "status": "NO_JOBS_AVAILABLE" })))
                }
                Err(err) => fail(state.production, &err),
            }
        }
        "update" => {
            let Some(job_id) = req.job_id.as_deref() else {
                return bad_request(state.production, "jobId is required");
            };

            // Cancellation goes through the facade so the reason lands in
            // the notepad as well.
            if req.status.as_deref().and_then(JobStatus::parse) == Some(JobStatus::Cancelled) {
                return match center.cancel_job(
                    &project_id,
                    job_id,
                    req.cancel_reason.as_deref().unwrap_or(""),
                ) {
                    Ok(job) => (StatusCode::OK, Json(job_json(&job))),
                    Err(err) => fail(state.production, &err),
                };
            }

            let mut updates = Vec::new();
            if let Some(raw) = req.status.as_deref() {
                match JobStatus::parse(raw) {
                    Some(status) => updates.push(JobUpdate::SetStatus(status)),
                    None => {
                        return bad_request(
                            state.production,
                            "status must be one of: todo | in_progress | done | cancelled",
                        );
                    }
                }
            }
            if let Some(raw) = req.priority.as_deref() {
                match Priority::parse(raw) {
                    Some(priority) => updates.push(JobUpdate::SetPriority(priority)),
                    None => {
                        return bad_request(
                            state.production,
                            "priority must be one of: low | medium | high | critical",
                        );
                    }
                }
            }
            if let Some(assignee) = &req.assigned_to {
                let assignee = assignee.trim();
                updates.push(JobUpdate::SetAssignee(if assignee.is_empty() {
                    None
                } else {
                    Some(assignee.to_string())
                }));
            }
            if let Some(reason) = &req.cancel_reason {
                updates.push(JobUpdate::SetCancelReason(reason.clone()));
            }

            match center.update_job(&project_id, job_id, updates) {
                Ok(job) => (StatusCode::OK, Json(job_json(&job))),
                Err(err) => fail(state.production, &err),
            }
        }
        other => bad_request(
            state.production,
            &format!("unknown action: {other} (expected post | claim | update)"),
        ),
    }
}
