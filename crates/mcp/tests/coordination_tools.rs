#![forbid(unsafe_code)]

mod support;
use support::*;

use serde_json::json;

fn pause() {
    // Posts within the same millisecond would tie on created_at.
    std::thread::sleep(std::time::Duration::from_millis(5));
}

#[test]
fn lock_conflict_reports_incumbent() {
    let mut server = Server::start_initialized("lock_conflict");

    let granted = server.call_tool(
        10,
        "propose_file_access",
        json!({ "agent_id": "A", "file_path": "src/x.ts", "intent": "edit", "user_prompt": "prompt-a" }),
    );
    assert_eq!(granted["success"].as_bool(), Some(true));
    assert_eq!(granted["result"]["status"].as_str(), Some("GRANTED"));

    let contested = server.call_tool(
        11,
        "propose_file_access",
        json!({ "agent_id": "B", "file_path": "src/x.ts", "intent": "edit", "user_prompt": "prompt-b" }),
    );
    assert_eq!(
        contested["result"]["status"].as_str(),
        Some("REQUIRES_ORCHESTRATION")
    );
    assert_eq!(
        contested["result"]["current_lock"]["agent_id"].as_str(),
        Some("A")
    );
    assert_eq!(
        contested["result"]["current_lock"]["intent"].as_str(),
        Some("edit")
    );
}

#[test]
fn post_claim_complete_with_key() {
    let mut server = Server::start_initialized("post_claim_complete");

    let posted = server.call_tool(
        10,
        "post_job",
        json!({ "agent_id": "A", "title": "Title", "description": "Desc" }),
    );
    assert_eq!(posted["result"]["status"].as_str(), Some("POSTED"));
    let job_id = posted["result"]["job_id"].as_str().expect("job id").to_string();
    let key = posted["result"]["completion_key"]
        .as_str()
        .expect("completion key")
        .to_string();
    assert_eq!(key.len(), 8);
    assert!(key.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    let claimed = server.call_tool(11, "claim_next_job", json!({ "agent_id": "A" }));
    assert_eq!(claimed["result"]["status"].as_str(), Some("CLAIMED"));
    assert_eq!(claimed["result"]["job"]["id"].as_str(), Some(job_id.as_str()));
    assert_eq!(claimed["result"]["job"]["assigned_to"].as_str(), Some("A"));

    // A non-assignee with the post-time key may close the job out.
    let completed = server.call_tool(
        12,
        "complete_job",
        json!({ "agent_id": "B", "job_id": job_id, "outcome": "done by B", "completion_key": key }),
    );
    assert_eq!(completed["success"].as_bool(), Some(true));
    assert_eq!(completed["result"]["status"].as_str(), Some("COMPLETED"));
    assert_eq!(completed["result"]["job"]["status"].as_str(), Some("done"));

    let wrong_key = server.call_tool(
        13,
        "complete_job",
        json!({ "agent_id": "C", "job_id": job_id, "outcome": "x", "completion_key": "WRONGKEY" }),
    );
    assert_eq!(wrong_key["success"].as_bool(), Some(false));
    assert_eq!(wrong_key["error"]["code"].as_str(), Some("UNAUTHORIZED"));
}

#[test]
fn completion_without_key_requires_identity() {
    let mut server = Server::start_initialized("completion_needs_identity");

    let posted = server.call_tool(
        10,
        "post_job",
        json!({ "agent_id": "A", "title": "Title", "description": "Desc" }),
    );
    let job_id = posted["result"]["job_id"].as_str().expect("job id").to_string();

    let _ = server.call_tool(11, "claim_next_job", json!({ "agent_id": "A" }));

    let denied = server.call_tool(
        12,
        "complete_job",
        json!({ "agent_id": "B", "job_id": job_id, "outcome": "done by B" }),
    );
    assert_eq!(denied["success"].as_bool(), Some(false));
    assert_eq!(denied["error"]["code"].as_str(), Some("UNAUTHORIZED"));
}

#[test]
fn claims_follow_priority_then_age() {
    let mut server = Server::start_initialized("priority_then_age");

    let j1 = server.call_tool(
        10,
        "post_job",
        json!({ "agent_id": "P", "title": "J1", "priority": "medium" }),
    );
    pause();
    let j2 = server.call_tool(
        11,
        "post_job",
        json!({ "agent_id": "P", "title": "J2", "priority": "high" }),
    );
    pause();
    let j3 = server.call_tool(
        12,
        "post_job",
        json!({ "agent_id": "P", "title": "J3", "priority": "high" }),
    );

    let expectations = [
        ("A", j2["result"]["job_id"].as_str().unwrap().to_string()),
        ("B", j3["result"]["job_id"].as_str().unwrap().to_string()),
        ("C", j1["result"]["job_id"].as_str().unwrap().to_string()),
    ];
    for (idx, (agent, expected)) in expectations.iter().enumerate() {
        let claimed = server.call_tool(
            20 + idx as u64,
            "claim_next_job",
            json!({ "agent_id": agent }),
        );
        assert_eq!(
            claimed["result"]["job"]["id"].as_str(),
            Some(expected.as_str()),
            "agent {agent} got the wrong job"
        );
    }

    let empty = server.call_tool(30, "claim_next_job", json!({ "agent_id": "D" }));
    assert_eq!(empty["result"]["status"].as_str(), Some("NO_JOBS_AVAILABLE"));
}

#[test]
fn finalize_resets_state_and_archives() {
    let mut server = Server::start_initialized("finalize_tool");

    let _ = server.call_tool(
        10,
        "update_shared_context",
        json!({ "agent_id": "A", "text": "session notes" }),
    );
    let posted = server.call_tool(11, "post_job", json!({ "agent_id": "A", "title": "Done job" }));
    let done_id = posted["result"]["job_id"].as_str().unwrap().to_string();
    pause();
    let _ = server.call_tool(12, "post_job", json!({ "agent_id": "A", "title": "Todo job" }));
    let _ = server.call_tool(13, "claim_next_job", json!({ "agent_id": "A" }));
    let _ = server.call_tool(
        14,
        "complete_job",
        json!({ "agent_id": "A", "job_id": done_id, "outcome": "ok" }),
    );
    let _ = server.call_tool(
        15,
        "propose_file_access",
        json!({ "agent_id": "A", "file_path": "src/a.rs", "intent": "edit" }),
    );

    let finalized = server.call_tool(16, "finalize_session", json!({}));
    assert_eq!(
        finalized["result"]["status"].as_str(),
        Some("SESSION_FINALIZED")
    );
    let archive_path = finalized["result"]["archive_path"].as_str().expect("path");
    assert!(std::path::Path::new(archive_path).exists(), "archive must exist");

    let context = server.call_tool(17, "read_context", json!({}));
    let text = context["result"]["context"].as_str().expect("context");
    assert!(text.contains("Session Start: "));
    assert!(!text.contains("session notes"));
    assert!(text.contains("Todo job"), "open jobs survive finalize");
    assert!(text.contains("(no active locks)"));

    let stats = server.call_tool(18, "get_usage_stats", json!({}));
    assert_eq!(stats["result"]["jobs"]["todo"].as_u64(), Some(1));
    assert_eq!(stats["result"]["jobs"]["done"].as_u64(), Some(0));
    assert_eq!(stats["result"]["live_locks"].as_u64(), Some(0));
}

#[test]
fn soul_and_activity_round_trip() {
    let mut server = Server::start_initialized("soul_activity");

    // Nothing on disk yet: the soul degrades to placeholders.
    let soul = server.call_tool(10, "get_project_soul", json!({}));
    let text = soul["result"]["soul"].as_str().expect("soul text");
    assert!(text.contains("context.md not found"));
    assert!(text.contains("conventions.md not found"));

    let updated = server.call_tool(
        11,
        "update_context",
        json!({ "text": "A is refactoring the lock registry" }),
    );
    assert_eq!(updated["success"].as_bool(), Some(true));

    let activity_path = server.work_dir.join(".axis/instructions/activity.md");
    let activity = std::fs::read_to_string(activity_path).expect("activity file");
    assert_eq!(activity, "A is refactoring the lock registry\n");
}

#[test]
fn vector_tools_degrade_without_credentials() {
    let mut server = Server::start_initialized("vector_degrade");

    let search = server.call_tool(10, "search_docs", json!({ "query": "anything" }));
    assert_eq!(search["success"].as_bool(), Some(false));
    assert_eq!(search["error"]["code"].as_str(), Some("NOT_CONFIGURED"));

    let subscription = server.call_tool(11, "get_subscription_status", json!({}));
    assert_eq!(subscription["success"].as_bool(), Some(false));
    assert_eq!(subscription["error"]["code"].as_str(), Some("NOT_CONFIGURED"));
}

#[test]
fn missing_agent_id_is_invalid_input() {
    let mut server = Server::start_initialized("missing_agent");
    let resp = server.call_tool(10, "claim_next_job", json!({}));
    assert_eq!(resp["success"].as_bool(), Some(false));
    assert_eq!(resp["error"]["code"].as_str(), Some("INVALID_INPUT"));
}

#[test]
fn default_agent_flag_fills_agent_id() {
    let mut server = Server::start_with_args("default_agent", &["--agent-id", "worker-1"]);
    server.initialize_default();

    let posted = server.call_tool(10, "post_job", json!({ "title": "By default agent" }));
    assert_eq!(posted["success"].as_bool(), Some(true));

    let claimed = server.call_tool(11, "claim_next_job", json!({}));
    assert_eq!(
        claimed["result"]["job"]["assigned_to"].as_str(),
        Some("worker-1")
    );
}
