#![forbid(unsafe_code)]
//! JSON-RPC plumbing and the tool response envelope.

use ax_nerve::CenterError;
use ax_storage::now_rfc3339;
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub(crate) struct JsonRpcRequest {
    #[serde(default)]
    #[serde(rename = "jsonrpc")]
    pub _jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
}

pub(crate) fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub(crate) fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

/// Every tool returns one text-content frame; the text is the pretty-printed
/// response body.
pub(crate) fn tool_text_content(payload: &Value) -> Value {
    json!({
        "type": "text",
        "text": serde_json::to_string_pretty(payload).unwrap_or_else(|_| "{}".to_string()),
    })
}

pub(crate) fn tool_ok(result: Value) -> Value {
    json!({
        "success": true,
        "result": result,
        "error": null,
        "timestamp": now_rfc3339(),
    })
}

pub(crate) fn tool_error(code: &str, message: &str) -> Value {
    json!({
        "success": false,
        "result": null,
        "error": { "code": code, "message": message },
        "timestamp": now_rfc3339(),
    })
}

pub(crate) fn center_error(err: &CenterError) -> Value {
    tool_error(err.code(), &err.to_string())
}

pub(crate) fn arg_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub(crate) fn arg_string_list(args: &Value, key: &str) -> Result<Vec<String>, Value> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => {
            let mut out = Vec::with_capacity(values.len());
            for value in values {
                let Some(item) = value.as_str() else {
                    return Err(tool_error(
                        "INVALID_INPUT",
                        &format!("{key} must be an array of strings"),
                    ));
                };
                out.push(item.to_string());
            }
            Ok(out)
        }
        Some(_) => Err(tool_error(
            "INVALID_INPUT",
            &format!("{key} must be an array of strings"),
        )),
    }
}

pub(crate) fn arg_usize(args: &Value, key: &str, default: usize) -> usize {
    args.get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}
