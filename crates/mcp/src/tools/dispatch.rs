#![forbid(unsafe_code)]

use ax_core::model::Priority;
use ax_nerve::{ClaimOutcome, LockOutcome, SearchHit};
use serde_json::{Value, json};

use crate::server::McpServer;
use crate::support::{arg_str, arg_string_list, arg_usize, center_error, tool_error, tool_ok};

const DEFAULT_SEARCH_COUNT: usize = 8;

pub(crate) fn dispatch_tool(server: &mut McpServer, name: &str, args: &Value) -> Value {
    match name {
        "post_job" => post_job(server, args),
        "claim_next_job" => claim_next_job(server, args),
        "complete_job" => complete_job(server, args),
        "cancel_job" => cancel_job(server, args),
        "propose_file_access" => propose_file_access(server, args),
        "force_unlock" => force_unlock(server, args),
        "update_shared_context" => update_shared_context(server, args),
        "finalize_session" => finalize_session(server),
        "get_project_soul" => tool_ok(json!({ "soul": server.center.get_project_soul() })),
        "read_context" => read_context(server),
        "update_context" => update_context(server, args),
        "search_codebase" => search(server, args, Scope::Files),
        "search_docs" => search(server, args, Scope::Docs),
        "index_file" => index_file(server, args),
        "get_subscription_status" => get_subscription_status(server),
        "get_usage_stats" => get_usage_stats(server),
        _ => tool_error("UNKNOWN_TOOL", &format!("Unknown tool: {name}")),
    }
}

fn require_agent(server: &McpServer, args: &Value) -> Result<String, Value> {
    if let Some(agent) = arg_str(args, "agent_id") {
        return Ok(agent.to_string());
    }
    if let Some(agent) = &server.default_agent {
        return Ok(agent.clone());
    }
    Err(tool_error(
        "INVALID_INPUT",
        "agent_id is required (or start the server with --agent-id)",
    ))
}

fn require_str(args: &Value, key: &str) -> Result<String, Value> {
    arg_str(args, key)
        .map(str::to_string)
        .ok_or_else(|| tool_error("INVALID_INPUT", &format!("{key} is required")))
}

fn job_json(job: &ax_storage::JobRow) -> Value {
    serde_json::to_value(job).unwrap_or_else(|_| json!({}))
}

fn lock_json(lock: &ax_storage::LockRow) -> Value {
    serde_json::to_value(lock).unwrap_or_else(|_| json!({}))
}

fn hits_json(hits: &[SearchHit]) -> Value {
    Value::Array(
        hits.iter()
            .map(|hit| {
                json!({
                    "id": hit.id,
                    "content": hit.content,
                    "metadata": hit.metadata,
                    "similarity": hit.similarity,
                })
            })
            .collect(),
    )
}

fn post_job(server: &mut McpServer, args: &Value) -> Value {
    let agent = match require_agent(server, args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let title = match require_str(args, "title") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let description = arg_str(args, "description").unwrap_or("");
    let priority = match args.get("priority").and_then(|v| v.as_str()) {
        None => None,
        Some(raw) => match Priority::parse(raw) {
            Some(priority) => Some(priority),
            None => {
                return tool_error(
                    "INVALID_INPUT",
                    "priority must be one of: low | medium | high | critical",
                );
            }
        },
    };
    let dependencies = match arg_string_list(args, "dependencies") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let project_id = server.project_id.clone();
    match server
        .center
        .post_job(&project_id, &agent, &title, description, priority, dependencies)
    {
        Ok(job) => tool_ok(json!({
            "job_id": job.id,
            "status": "POSTED",
            "completion_key": job.completion_key,
            "job": job_json(&job),
        })),
        Err(err) => center_error(&err),
    }
}

fn claim_next_job(server: &mut McpServer, args: &Value) -> Value {
    let agent = match require_agent(server, args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let project_id = server.project_id.clone();
    match server.center.claim_next_job(&project_id, &agent) {
        Ok(ClaimOutcome::Claimed(job)) => tool_ok(json!({
            "status": "CLAIMED",
            "job": job_json(&job),
        })),
        Ok(ClaimOutcome::NoJobsAvailable) => tool_ok(json!({ "status": "NO_JOBS_AVAILABLE" })),
        Err(err) => center_error(&err),
    }
}

fn complete_job(server: &mut McpServer, args: &Value) -> Value {
    let agent = match require_agent(server, args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let job_id = match require_str(args, "job_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let outcome = arg_str(args, "outcome").unwrap_or("");
    let completion_key = arg_str(args, "completion_key");

    let project_id = server.project_id.clone();
    match server
        .center
        .complete_job(&project_id, &agent, &job_id, outcome, completion_key)
    {
        Ok(job) => tool_ok(json!({ "status": "COMPLETED", "job": job_json(&job) })),
        Err(err) => center_error(&err),
    }
}

fn cancel_job(server: &mut McpServer, args: &Value) -> Value {
    let job_id = match require_str(args, "job_id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let reason = arg_str(args, "reason").unwrap_or("");
    let project_id = server.project_id.clone();
    match server.center.cancel_job(&project_id, &job_id, reason) {
        Ok(job) => tool_ok(json!({ "status": "CANCELLED", "job": job_json(&job) })),
        Err(err) => center_error(&err),
    }
}

fn propose_file_access(server: &mut McpServer, args: &Value) -> Value {
    let agent = match require_agent(server, args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let file_path = match require_str(args, "file_path") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let intent = match require_str(args, "intent") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let user_prompt = arg_str(args, "user_prompt").unwrap_or("");

    let project_id = server.project_id.clone();
    match server
        .center
        .propose_file_access(&project_id, &agent, &file_path, &intent, user_prompt)
    {
        Ok(LockOutcome::Granted(lock)) => tool_ok(json!({
            "status": "GRANTED",
            "lock": lock_json(&lock),
        })),
        Ok(LockOutcome::RequiresOrchestration(current)) => tool_ok(json!({
            "status": "REQUIRES_ORCHESTRATION",
            "current_lock": lock_json(&current),
        })),
        Err(err) => center_error(&err),
    }
}

fn force_unlock(server: &mut McpServer, args: &Value) -> Value {
    let file_path = match require_str(args, "file_path") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let reason = arg_str(args, "reason").unwrap_or("");
    let project_id = server.project_id.clone();
    match server.center.force_unlock(&project_id, &file_path, reason) {
        Ok(removed) => tool_ok(json!({ "status": "UNLOCKED", "removed": removed })),
        Err(err) => center_error(&err),
    }
}

fn update_shared_context(server: &mut McpServer, args: &Value) -> Value {
    let agent = match require_agent(server, args) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let text = match require_str(args, "text") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let project_id = server.project_id.clone();
    match server
        .center
        .update_shared_context(&project_id, &agent, &text)
    {
        Ok(()) => tool_ok(json!({ "status": "NOTED" })),
        Err(err) => center_error(&err),
    }
}

fn finalize_session(server: &mut McpServer) -> Value {
    let project_id = server.project_id.clone();
    match server.center.finalize_session(&project_id) {
        Ok(outcome) => tool_ok(json!({
            "status": "SESSION_FINALIZED",
            "archive_path": outcome.archive_path,
        })),
        Err(err) => center_error(&err),
    }
}

fn read_context(server: &mut McpServer) -> Value {
    let project_id = server.project_id.clone();
    match server.center.get_core_context(&project_id) {
        Ok(context) => tool_ok(json!({ "context": context })),
        Err(err) => center_error(&err),
    }
}

fn update_context(server: &mut McpServer, args: &Value) -> Value {
    let text = match require_str(args, "text") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match server.center.record_activity(&text) {
        Ok(()) => tool_ok(json!({ "status": "OK" })),
        Err(err) => center_error(&err),
    }
}

enum Scope {
    Files,
    Docs,
}

fn search(server: &mut McpServer, args: &Value, scope: Scope) -> Value {
    let query = match require_str(args, "query") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let count = arg_usize(args, "count", DEFAULT_SEARCH_COUNT);
    let project_id = server.project_id.clone();
    let result = match scope {
        Scope::Files => server.center.search_codebase(&project_id, &query, count),
        Scope::Docs => server.center.search_docs(&project_id, &query, count),
    };
    match result {
        Ok(hits) => tool_ok(json!({ "results": hits_json(&hits) })),
        Err(err) => center_error(&err),
    }
}

fn index_file(server: &mut McpServer, args: &Value) -> Value {
    let path = match require_str(args, "path") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let content = match require_str(args, "content") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let project_id = server.project_id.clone();
    match server.center.index_file(&project_id, &path, &content) {
        Ok(id) => tool_ok(json!({ "id": id })),
        Err(err) => center_error(&err),
    }
}

fn get_subscription_status(server: &mut McpServer) -> Value {
    match server.center.verify_subscription() {
        Ok(status) => tool_ok(json!({
            "valid": status.valid,
            "plan": status.plan,
            "validUntil": status.valid_until,
        })),
        Err(err) => center_error(&err),
    }
}

fn get_usage_stats(server: &mut McpServer) -> Value {
    let project_id = server.project_id.clone();
    match server.center.usage_stats(&project_id) {
        Ok(stats) => tool_ok(json!({
            "jobs": {
                "todo": stats.todo,
                "in_progress": stats.in_progress,
                "done": stats.done,
                "cancelled": stats.cancelled,
            },
            "live_locks": stats.live_locks,
            "notepad_chars": stats.notepad_chars,
        })),
        Err(err) => center_error(&err),
    }
}
