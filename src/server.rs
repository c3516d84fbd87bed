//! MCP-style stdio server: newline-delimited JSON-RPC 2.0 on stdin/stdout.
//!
//! Stdout carries protocol messages only; logs go to stderr.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::coordinator::Coordinator;
use crate::tools;

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

/// Serves the coordinator's tools over a line-oriented stream.
#[derive(Clone, Debug)]
pub struct StdioServer {
    coordinator: Arc<Coordinator>,
}

impl StdioServer {
    /// Creates a server over a shared coordinator.
    #[must_use]
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }

    /// Serves stdin/stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading stdin or writing stdout fails.
    pub async fn run(&self) -> std::io::Result<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serves an arbitrary reader/writer pair until the reader is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if reading or writing fails.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        trace_info!("stdio server started");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(line) {
                let mut bytes = response.into_bytes();
                bytes.push(b'\n');
                writer.write_all(&bytes).await?;
                writer.flush().await?;
            }
        }

        trace_info!("stdio server stopped");
        Ok(())
    }

    /// Handles one JSON-RPC message; `None` for notifications.
    #[must_use]
    pub fn handle_message(&self, line: &str) -> Option<String> {
        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                return Some(error_response(
                    Value::Null,
                    PARSE_ERROR,
                    &format!("parse error: {e}"),
                ));
            }
        };

        // requests without an id are notifications and get no reply
        let id = request.get("id").cloned()?;
        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        trace_debug!(method, "request received");

        let response = match method {
            "initialize" => success_response(id, initialize_result()),
            "ping" => success_response(id, json!({})),
            "tools/list" => success_response(id, json!({ "tools": tools::tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, &params),
            other => error_response(id, METHOD_NOT_FOUND, &format!("method not found: {other}")),
        };
        Some(response)
    }

    fn handle_tools_call(&self, id: Value, params: &Value) -> String {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return error_response(id, INVALID_PARAMS, "tools/call requires a string 'name'");
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let output = tools::call_tool(&self.coordinator, name, &arguments);
        let is_error = tools::is_error(&output);
        let text = output.to_string();

        success_response(
            id,
            json!({
                "content": [{ "type": "text", "text": text }],
                "structuredContent": output,
                "isError": is_error,
            }),
        )
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

fn success_response(id: Value, result: Value) -> String {
    json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string()
}

fn error_response(id: Value, code: i64, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
    .to_string()
}
