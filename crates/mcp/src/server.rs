#![forbid(unsafe_code)]

use ax_nerve::NerveCenter;
use serde_json::{Value, json};

use crate::support::{JsonRpcRequest, json_rpc_error, json_rpc_response, tool_text_content};
use crate::tools;

pub(crate) const CONTEXT_RESOURCE_URI: &str = "mcp://context/current";

pub(crate) struct McpServer {
    initialized: bool,
    pub(crate) center: NerveCenter,
    pub(crate) project_id: String,
    pub(crate) default_agent: Option<String>,
}

impl McpServer {
    pub(crate) fn new(
        center: NerveCenter,
        project_id: String,
        default_agent: Option<String>,
    ) -> Self {
        Self {
            initialized: false,
            center,
            project_id,
            default_agent,
        }
    }

    pub(crate) fn handle(&mut self, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();

        if method == "initialize" {
            return Some(json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": crate::MCP_VERSION,
                    "serverInfo": { "name": crate::SERVER_NAME, "version": crate::SERVER_VERSION },
                    "capabilities": { "tools": {}, "resources": {} }
                }),
            ));
        }

        if !self.initialized && method != "notifications/initialized" {
            return Some(json_rpc_error(request.id, -32002, "Server not initialized"));
        }

        if method == "notifications/initialized" {
            self.initialized = true;
            return None;
        }

        if method == "ping" {
            return Some(json_rpc_response(request.id, json!({})));
        }

        if method == "tools/list" {
            return Some(json_rpc_response(
                request.id,
                json!({ "tools": tools::tool_definitions() }),
            ));
        }

        if method == "tools/call" {
            let Some(params_obj) = request.params.as_ref().and_then(|v| v.as_object()) else {
                return Some(json_rpc_error(request.id, -32602, "params must be an object"));
            };
            let tool_name = params_obj
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let args = params_obj
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));
            let response_body = tools::dispatch_tool(self, tool_name, &args);

            return Some(json_rpc_response(
                request.id,
                json!({
                    "content": [tool_text_content(&response_body)],
                    "isError": !response_body
                        .get("success")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false)
                }),
            ));
        }

        if method == "resources/list" {
            return Some(json_rpc_response(
                request.id,
                json!({
                    "resources": [{
                        "uri": CONTEXT_RESOURCE_URI,
                        "name": "Live Context",
                        "description": "Open jobs, active locks, and the live notepad, rendered as Markdown.",
                        "mimeType": "text/markdown"
                    }]
                }),
            ));
        }

        if method == "resources/read" {
            let uri = request
                .params
                .as_ref()
                .and_then(|v| v.get("uri"))
                .and_then(|v| v.as_str())
                .unwrap_or("");
            if uri != CONTEXT_RESOURCE_URI {
                return Some(json_rpc_error(
                    request.id,
                    -32602,
                    &format!("Unknown resource: {uri}"),
                ));
            }
            return Some(match self.center.get_core_context(&self.project_id) {
                Ok(text) => json_rpc_response(
                    request.id,
                    json!({
                        "contents": [{
                            "uri": CONTEXT_RESOURCE_URI,
                            "mimeType": "text/markdown",
                            "text": text
                        }]
                    }),
                ),
                Err(err) => json_rpc_error(request.id, -32603, &err.to_string()),
            });
        }

        Some(json_rpc_error(
            request.id,
            -32601,
            &format!("Method not found: {method}"),
        ))
    }
}
