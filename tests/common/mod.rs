//! Shared fixtures for integration tests

#![allow(dead_code)]

use promptharvest::capture::{CaptureContext, CapturePolicy, CaptureServer};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

/// Start a capture server on an ephemeral loopback port
pub async fn start_capture_server() -> (CaptureServer, Arc<CaptureContext>) {
    serve(CaptureContext::new(CapturePolicy::default(), "/v1/messages")).await
}

/// Start an inspect-mode server on an ephemeral loopback port
pub async fn start_inspect_server() -> (CaptureServer, Arc<CaptureContext>) {
    serve(CaptureContext::inspect("/v1/messages")).await
}

async fn serve(ctx: CaptureContext) -> (CaptureServer, Arc<CaptureContext>) {
    let ctx = Arc::new(ctx);
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let server = CaptureServer::bind(addr, Arc::clone(&ctx)).await.unwrap();
    (server, ctx)
}

/// Body of the primary request: long system prompt split in blocks, tools
pub fn primary_request(marker: &str) -> Value {
    json!({
        "model": "claude-sonnet-4",
        "max_tokens": 32000,
        "system": [
            {"type": "text", "text": "You are Claude Code, Anthropic's official CLI for Claude."},
            {"type": "text", "text": format!("{marker}\n{}\nWorking directory: /private/tmp/claude-code-1.0.1-abc/", "x".repeat(1200))}
        ],
        "tools": [
            {
                "name": "Bash",
                "description": "Executes a bash command",
                "input_schema": {
                    "type": "object",
                    "properties": {"command": {"type": "string"}},
                    "required": ["command"]
                }
            },
            {
                "name": "Read",
                "description": "Reads a file",
                "input_schema": {"type": "object", "properties": {"file_path": {"type": "string"}}}
            }
        ],
        "messages": [{"role": "user", "content": "hi"}]
    })
}

/// Body of a warm-up call: short prompt, no tools
pub fn probe_request() -> Value {
    json!({
        "model": "claude-haiku",
        "max_tokens": 1,
        "system": "Analyze if this message indicates a new conversation topic.",
        "messages": [{"role": "user", "content": "quota"}]
    })
}

pub async fn post_messages(base_url: &str, body: &Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base_url}/v1/messages?beta=true"))
        .json(body)
        .send()
        .await
        .unwrap()
}
