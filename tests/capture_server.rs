mod common;

use common::{
    post_messages, primary_request, probe_request, start_capture_server, start_inspect_server,
};
use serde_json::{Value, json};
use std::time::Duration;

#[tokio::test]
async fn probe_requests_are_answered_but_never_captured() {
    let (server, ctx) = start_capture_server().await;
    let base_url = server.base_url();

    for _ in 0..5 {
        let resp = post_messages(&base_url, &probe_request()).await;
        assert_eq!(resp.status(), 200);
    }

    // Tools present but prompt too short
    let mut short = primary_request("short");
    short["system"] = json!("x".repeat(1000));
    assert_eq!(post_messages(&base_url, &short).await.status(), 200);

    // Long prompt but no tools
    let mut toolless = primary_request("toolless");
    toolless["tools"] = json!([]);
    assert_eq!(post_messages(&base_url, &toolless).await.status(), 200);

    assert!(ctx.pending.is_empty());
    assert!(!ctx.pending.is_latched());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn first_qualifying_request_wins() {
    let (server, ctx) = start_capture_server().await;
    let base_url = server.base_url();

    let resp = post_messages(&base_url, &primary_request("first")).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], "msg_intercepted");
    assert_eq!(body["type"], "message");
    assert_eq!(body["role"], "assistant");
    assert_eq!(body["model"], "claude-sonnet-4");
    assert_eq!(body["stop_reason"], "end_turn");
    assert_eq!(body["content"].as_array().unwrap().len(), 1);

    let resp = post_messages(&base_url, &primary_request("second")).await;
    assert_eq!(resp.status(), 200);

    let payload = tokio::time::timeout(Duration::from_secs(1), ctx.pending.wait())
        .await
        .unwrap()
        .unwrap();
    assert!(payload.system_prompt.contains("first"));
    assert!(!payload.system_prompt.contains("second"));
    assert_eq!(payload.tools.len(), 2);
    assert_eq!(payload.tools[0].name, "Bash");
    assert!(ctx.pending.is_empty());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn waiting_subscriber_receives_capture() {
    let (server, ctx) = start_capture_server().await;
    let base_url = server.base_url();

    let waiter = {
        let ctx = ctx.clone();
        tokio::spawn(async move { ctx.pending.wait().await })
    };
    while ctx.pending.is_empty() {
        tokio::task::yield_now().await;
    }

    post_messages(&base_url, &primary_request("handoff")).await;

    let payload = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(payload.system_prompt.starts_with("You are Claude Code"));
    assert!(ctx.pending.is_empty());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_a_server_error() {
    let (server, ctx) = start_capture_server().await;

    let resp = reqwest::Client::new()
        .post(format!("{}/v1/messages", server.base_url()))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert!(ctx.pending.is_empty());

    // Still serving afterwards
    let resp = post_messages(&server.base_url(), &probe_request()).await;
    assert_eq!(resp.status(), 200);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn other_routes_are_not_found() {
    let (server, ctx) = start_capture_server().await;
    let client = reqwest::Client::new();
    let base_url = server.base_url();

    let resp = client
        .get(format!("{base_url}/v1/messages"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(format!("{base_url}/v1/complete"))
        .json(&primary_request("elsewhere"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert!(!ctx.pending.is_latched());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn token_count_subpath_is_answered() {
    let (server, ctx) = start_capture_server().await;

    let resp = reqwest::Client::new()
        .post(format!("{}/v1/messages/count_tokens", server.base_url()))
        .json(&probe_request())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(ctx.pending.is_empty());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unexpected_field_shapes_are_still_answered() {
    let (server, ctx) = start_capture_server().await;
    let base_url = server.base_url();

    let resp = post_messages(&base_url, &json!({"model": "m", "tools": null})).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["model"], "m");

    let resp = post_messages(&base_url, &json!({"model": "m", "system": 42})).await;
    assert_eq!(resp.status(), 200);
    assert!(ctx.pending.is_empty());

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn nameless_tool_does_not_block_capture() {
    let (server, ctx) = start_capture_server().await;

    let mut request = primary_request("odd tool");
    request["tools"]
        .as_array_mut()
        .unwrap()
        .push(json!({"description": "registered without a name"}));

    let resp = post_messages(&server.base_url(), &request).await;
    assert_eq!(resp.status(), 200);

    let payload = tokio::time::timeout(Duration::from_secs(1), ctx.pending.wait())
        .await
        .unwrap()
        .unwrap();
    assert!(payload.system_prompt.contains("odd tool"));
    assert_eq!(payload.tools.len(), 3);
    assert_eq!(payload.tools[2].name, "");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn inspect_mode_answers_without_capturing() {
    let (server, ctx) = start_inspect_server().await;
    let base_url = server.base_url();

    let resp = post_messages(&base_url, &primary_request("inspected")).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["model"], "claude-sonnet-4");

    // Unrouted and malformed requests keep their status codes
    let client = reqwest::Client::new();
    let resp = client.get(format!("{base_url}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let resp = client
        .post(format!("{base_url}/v1/messages"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);

    assert!(ctx.pending.is_empty());
    assert!(!ctx.pending.is_latched());

    server.shutdown().await.unwrap();
}
