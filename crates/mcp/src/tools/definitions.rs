#![forbid(unsafe_code)]

use serde_json::{Value, json};

fn agent_property() -> Value {
    json!({ "type": "string", "description": "Identity of the calling agent." })
}

pub(crate) fn tool_definitions() -> Vec<Value> {
    vec![
        json!({
            "name": "post_job",
            "description": "Post a job to the shared board. Returns the job id and an 8-character completion key; hand the key to whoever may need to close the job out for you.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "agent_id": agent_property(),
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high", "critical"] },
                    "dependencies": { "type": "array", "items": { "type": "string" }, "description": "Job ids that must be done before this one becomes claimable." }
                },
                "required": ["title"]
            },
        }),
        json!({
            "name": "claim_next_job",
            "description": "Atomically claim the highest-priority claimable job (critical first, oldest first on ties). Jobs with unfinished dependencies are skipped.",
            "inputSchema": {
                "type": "object",
                "properties": { "agent_id": agent_property() },
                "required": []
            },
        }),
        json!({
            "name": "complete_job",
            "description": "Mark a job done. Allowed for the assignee, or for anyone holding the job's completion key. Completing does NOT release your file locks; unlock explicitly or let finalize/TTL clean up.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "agent_id": agent_property(),
                    "job_id": { "type": "string" },
                    "outcome": { "type": "string", "description": "Short human-readable result note." },
                    "completion_key": { "type": "string" }
                },
                "required": ["job_id"]
            },
        }),
        json!({
            "name": "cancel_job",
            "description": "Cancel a job with a reason. The reason lands on the job and in the shared notepad.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "job_id": { "type": "string" },
                    "reason": { "type": "string" }
                },
                "required": ["job_id"]
            },
        }),
        json!({
            "name": "propose_file_access",
            "description": "Ask for the edit lock on a file path. GRANTED means you own it for the TTL; REQUIRES_ORCHESTRATION returns the current holder so you can work on something else. Never blocks.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "agent_id": agent_property(),
                    "file_path": { "type": "string" },
                    "intent": { "type": "string", "description": "What you are about to do with the file." },
                    "user_prompt": { "type": "string", "description": "The user request that triggered this access." }
                },
                "required": ["file_path", "intent"]
            },
        }),
        json!({
            "name": "force_unlock",
            "description": "Unconditionally remove the lock on a file path. Convention: only use this on locks you believe are stuck or stale.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "file_path": { "type": "string" },
                    "reason": { "type": "string" }
                },
                "required": ["file_path"]
            },
        }),
        json!({
            "name": "update_shared_context",
            "description": "Append a note to the shared live notepad every agent reads.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "agent_id": agent_property(),
                    "text": { "type": "string" }
                },
                "required": ["text"]
            },
        }),
        json!({
            "name": "finalize_session",
            "description": "Archive the notepad, reset it to a fresh session marker, clear all locks, and drop finished/cancelled jobs. Open jobs survive.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] },
        }),
        json!({
            "name": "get_project_soul",
            "description": "Read the project's standing instructions (context + conventions).",
            "inputSchema": { "type": "object", "properties": {}, "required": [] },
        }),
        json!({
            "name": "read_context",
            "description": "Render the live context document: open jobs, active locks, notepad.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] },
        }),
        json!({
            "name": "update_context",
            "description": "Rewrite the activity file that mirrors what is being worked on right now.",
            "inputSchema": {
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            },
        }),
        json!({
            "name": "search_codebase",
            "description": "Semantic search over files previously indexed with index_file.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "count": { "type": "integer" }
                },
                "required": ["query"]
            },
        }),
        json!({
            "name": "search_docs",
            "description": "Semantic search over indexed documents and notes.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "count": { "type": "integer" }
                },
                "required": ["query"]
            },
        }),
        json!({
            "name": "index_file",
            "description": "Embed one file's content into the project's vector index for search_codebase.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "content": { "type": "string" }
                },
                "required": ["path", "content"]
            },
        }),
        json!({
            "name": "get_subscription_status",
            "description": "Check the hosted subscription attached to this workspace.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] },
        }),
        json!({
            "name": "get_usage_stats",
            "description": "Job, lock, and notepad counters for the current project.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] },
        }),
    ]
}
