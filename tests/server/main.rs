//! Stdio JSON-RPC server tests.
//!
//! These tests are only compiled when the `server` feature is enabled.

#![cfg(feature = "server")]

use std::sync::Arc;

use forge_optimizer::Coordinator;
use forge_optimizer::server::StdioServer;
use serde_json::{Value, json};

fn server() -> StdioServer {
    StdioServer::new(Arc::new(Coordinator::new()))
}

fn request(server: &StdioServer, message: &Value) -> Value {
    let reply = server
        .handle_message(&message.to_string())
        .expect("request should get a reply");
    serde_json::from_str(&reply).unwrap()
}

fn call(server: &StdioServer, id: u64, name: &str, arguments: Value) -> Value {
    request(
        server,
        &json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        }),
    )
}

#[test]
fn initialize_reports_tools_capability() {
    let server = server();
    let reply = request(
        &server,
        &json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }),
    );

    assert_eq!(reply["id"], json!(1));
    assert_eq!(reply["result"]["serverInfo"]["name"], json!("forge-optimizer"));
    assert!(reply["result"]["capabilities"]["tools"].is_object());
    assert!(reply["result"]["protocolVersion"].is_string());
}

#[test]
fn tools_list_names_every_tool() {
    let server = server();
    let reply = request(&server, &json!({ "jsonrpc": "2.0", "id": "a", "method": "tools/list" }));

    let tools = reply["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        ["suggest_trial", "record_feedback", "get_best_config", "get_trial_history"]
    );
    assert_eq!(reply["id"], json!("a"));
}

#[test]
fn tools_call_round_trip() {
    let server = server();
    let reply = call(
        &server,
        2,
        "suggest_trial",
        json!({
            "server_id": "svc-a",
            "param_space": {
                "x": { "type": "float", "low": 0.0, "high": 1.0 },
                "y": { "type": "float", "low": 0.0, "high": 1.0 }
            }
        }),
    );
    let result = &reply["result"];
    assert_eq!(result["isError"], json!(false));
    assert_eq!(result["structuredContent"]["sampler"], json!("cmaes"));

    let text: Value =
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(text, result["structuredContent"]);

    let trial_id = result["structuredContent"]["trial_id"].clone();
    let reply = call(
        &server,
        3,
        "record_feedback",
        json!({ "trial_id": trial_id, "reward": 0.5 }),
    );
    assert_eq!(reply["result"]["structuredContent"]["best_value"], json!(0.5));
}

#[test]
fn tool_failure_is_flagged_not_rpc_error() {
    let server = server();
    let reply = call(
        &server,
        4,
        "record_feedback",
        json!({ "trial_id": "t_missing", "reward": 1.0 }),
    );

    assert!(reply.get("error").is_none());
    assert_eq!(reply["result"]["isError"], json!(true));
    assert_eq!(
        reply["result"]["structuredContent"]["kind"],
        json!("unknown_trial")
    );
}

#[test]
fn protocol_errors() {
    let server = server();

    let reply: Value = serde_json::from_str(&server.handle_message("{not json").unwrap()).unwrap();
    assert_eq!(reply["error"]["code"], json!(-32700));
    assert_eq!(reply["id"], Value::Null);

    let reply = request(&server, &json!({ "jsonrpc": "2.0", "id": 5, "method": "resources/list" }));
    assert_eq!(reply["error"]["code"], json!(-32601));

    let reply = request(
        &server,
        &json!({ "jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {} }),
    );
    assert_eq!(reply["error"]["code"], json!(-32602));
}

#[test]
fn notifications_get_no_reply() {
    let server = server();
    let message = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
    assert!(server.handle_message(&message.to_string()).is_none());
}

#[tokio::test]
async fn serve_answers_each_request_line() {
    let server = server();
    let input = [
        json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {} }).to_string(),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
        String::new(),
        json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" }).to_string(),
        json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/list" }).to_string(),
    ]
    .join("\n");

    let mut output = Vec::new();
    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let replies: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(replies.len(), 3);
    assert_eq!(
        replies.iter().map(|r| r["id"].clone()).collect::<Vec<_>>(),
        vec![json!(1), json!(2), json!(3)]
    );
    assert_eq!(replies[1]["result"], json!({}));
}
