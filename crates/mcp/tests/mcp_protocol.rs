#![forbid(unsafe_code)]

mod support;
use support::*;

use serde_json::json;

#[test]
fn initialize_then_tools_list() {
    let mut server = Server::start("initialize_then_tools_list");

    let init = server.request(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": { "protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": { "name": "test", "version": "0" } }
    }));
    assert_eq!(
        init["result"]["serverInfo"]["name"].as_str(),
        Some("axis-nerve-center")
    );

    server.send(json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized",
        "params": {}
    }));

    let tools_list = server.request(json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/list",
        "params": {}
    }));
    let tools = tools_list["result"]["tools"].as_array().expect("tools array");
    let mut names: Vec<&str> = tools
        .iter()
        .filter_map(|tool| tool["name"].as_str())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "cancel_job",
            "claim_next_job",
            "complete_job",
            "finalize_session",
            "force_unlock",
            "get_project_soul",
            "get_subscription_status",
            "get_usage_stats",
            "index_file",
            "post_job",
            "propose_file_access",
            "read_context",
            "search_codebase",
            "search_docs",
            "update_context",
            "update_shared_context",
        ]
    );
}

#[test]
fn requests_before_initialize_are_rejected() {
    let mut server = Server::start("requests_before_initialize");

    let resp = server.request(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/list",
        "params": {}
    }));
    assert_eq!(resp["error"]["code"].as_i64(), Some(-32002));
}

#[test]
fn unknown_method_is_not_found() {
    let mut server = Server::start_initialized("unknown_method");
    let resp = server.request(json!({
        "jsonrpc": "2.0",
        "id": 5,
        "method": "does/not/exist",
        "params": {}
    }));
    assert_eq!(resp["error"]["code"].as_i64(), Some(-32601));
}

#[test]
fn parse_errors_do_not_kill_the_server() {
    let mut server = Server::start_initialized("parse_errors");

    server.send_raw_line("this is not json");
    let resp = server.recv();
    assert_eq!(resp["error"]["code"].as_i64(), Some(-32700));

    let ping = server.request(json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "ping",
        "params": {}
    }));
    assert!(ping["result"].is_object(), "server must keep serving after a parse error");
}

#[test]
fn unknown_tool_reports_error_frame() {
    let mut server = Server::start_initialized("unknown_tool");
    let resp = server.request(json!({
        "jsonrpc": "2.0",
        "id": 3,
        "method": "tools/call",
        "params": { "name": "no_such_tool", "arguments": {} }
    }));
    assert_eq!(resp["result"]["isError"].as_bool(), Some(true));
    let body = extract_tool_text(&resp);
    assert_eq!(body["error"]["code"].as_str(), Some("UNKNOWN_TOOL"));
}

#[test]
fn context_resource_is_listed_and_readable() {
    let mut server = Server::start_initialized("context_resource");

    let list = server.request(json!({
        "jsonrpc": "2.0",
        "id": 4,
        "method": "resources/list",
        "params": {}
    }));
    let resources = list["result"]["resources"].as_array().expect("resources");
    assert_eq!(resources.len(), 1);
    assert_eq!(
        resources[0]["uri"].as_str(),
        Some("mcp://context/current")
    );

    let read = server.request(json!({
        "jsonrpc": "2.0",
        "id": 5,
        "method": "resources/read",
        "params": { "uri": "mcp://context/current" }
    }));
    let text = read["result"]["contents"][0]["text"]
        .as_str()
        .expect("context text");
    assert!(text.starts_with("# Live Context"));
    assert!(text.contains("## Job Board"));
    assert!(text.contains("## Active Locks"));
    assert!(text.contains("## Live Notepad"));

    let bad = server.request(json!({
        "jsonrpc": "2.0",
        "id": 6,
        "method": "resources/read",
        "params": { "uri": "mcp://context/other" }
    }));
    assert_eq!(bad["error"]["code"].as_i64(), Some(-32602));
}
