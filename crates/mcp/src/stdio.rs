#![forbid(unsafe_code)]
//! Stdio transport. Clients differ: most speak newline-delimited JSON, some
//! frame with Content-Length headers. The first line decides the mode.

use crate::server::McpServer;
use crate::support::{JsonRpcRequest, json_rpc_error};
use serde_json::Value;
use std::io::{BufRead, BufReader, Read, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StdioMode {
    NewlineJson,
    ContentLength,
}

fn detect_mode_from_first_line(line: &str) -> Option<StdioMode> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(StdioMode::NewlineJson);
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("content-length:") || lower.starts_with("content-type:") {
        return Some(StdioMode::ContentLength);
    }
    None
}

fn parse_content_length_header(line: &str) -> Option<usize> {
    let trimmed = line.trim();
    let (key, value) = trimmed.split_once(':')?;
    if !key.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    value.trim().parse::<usize>().ok()
}

fn read_content_length_frame(
    reader: &mut BufReader<std::io::StdinLock<'_>>,
    mut header: String,
) -> std::io::Result<Option<Vec<u8>>> {
    const MAX_CONTENT_LENGTH_BYTES: usize = 16 * 1024 * 1024;

    let mut content_length: Option<usize> = parse_content_length_header(&header);
    loop {
        if header.trim_end().is_empty() {
            break;
        }
        header.clear();
        let read = reader.read_line(&mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if content_length.is_none() {
            content_length = parse_content_length_header(&header);
        }
    }

    let Some(len) = content_length else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        ));
    };
    if len > MAX_CONTENT_LENGTH_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Content-Length exceeds max allowed size",
        ));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    Ok(Some(body))
}

fn write_response(
    stdout: &mut std::io::StdoutLock<'_>,
    mode: StdioMode,
    resp: &Value,
) -> Result<(), Box<dyn std::error::Error>> {
    match mode {
        StdioMode::NewlineJson => {
            writeln!(stdout, "{}", serde_json::to_string(resp)?)?;
        }
        StdioMode::ContentLength => {
            let body = serde_json::to_vec(resp)?;
            write!(stdout, "Content-Length: {}\r\n\r\n", body.len())?;
            stdout.write_all(&body)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

fn handle_raw(
    server: &mut McpServer,
    raw: &[u8],
    stdout: &mut std::io::StdoutLock<'_>,
    mode: StdioMode,
) -> Result<(), Box<dyn std::error::Error>> {
    let parsed: Result<Value, _> = serde_json::from_slice(raw);
    let data = match parsed {
        Ok(v) => v,
        Err(err) => {
            let resp = json_rpc_error(None, -32700, &format!("Parse error: {err}"));
            return write_response(stdout, mode, &resp);
        }
    };

    let (id, has_method) = match data.as_object() {
        Some(obj) => (obj.get("id").cloned(), obj.contains_key("method")),
        None => {
            let resp = json_rpc_error(None, -32600, "Invalid Request");
            return write_response(stdout, mode, &resp);
        }
    };
    if !has_method {
        let resp = json_rpc_error(id, -32600, "Invalid Request");
        return write_response(stdout, mode, &resp);
    }

    let request: JsonRpcRequest = match serde_json::from_value(data) {
        Ok(v) => v,
        Err(err) => {
            let resp = json_rpc_error(id, -32600, &format!("Invalid Request: {err}"));
            return write_response(stdout, mode, &resp);
        }
    };

    if let Some(resp) = server.handle(request) {
        write_response(stdout, mode, &resp)?;
    }
    Ok(())
}

pub(crate) fn run(mut server: McpServer) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();

    let mut mode: Option<StdioMode> = None;
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let detected = match mode {
            Some(m) => m,
            None => match detect_mode_from_first_line(&line) {
                Some(m) => {
                    mode = Some(m);
                    m
                }
                None => continue,
            },
        };

        match detected {
            StdioMode::NewlineJson => {
                handle_raw(&mut server, line.trim().as_bytes(), &mut stdout, detected)?;
            }
            StdioMode::ContentLength => {
                let Some(body) = read_content_length_frame(&mut reader, line)? else {
                    break;
                };
                handle_raw(&mut server, &body, &mut stdout, detected)?;
            }
        }
    }
    Ok(())
}
