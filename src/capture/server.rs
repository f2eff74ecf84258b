use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::payload::{MessagesRequest, MessagesResponse};
use super::slot::CaptureOutcome;
use super::{CaptureContext, ServerMode};

/// Requests carry the full system prompt plus every tool schema
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Characters of the request body logged in inspect mode
const PREVIEW_CHARS: usize = 500;

/// Build the mock API router
///
/// Every route goes through one fallback handler so that the path match can
/// be a prefix match configured at runtime.
pub fn router(ctx: Arc<CaptureContext>) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(ctx)
}

async fn handle_request(
    State(ctx): State<Arc<CaptureContext>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path();
    let is_messages_endpoint = method == Method::POST && ctx.is_messages_path(path);

    log::info!("[Interceptor] {method} {uri} - messages endpoint: {is_messages_endpoint}");

    if ctx.mode == ServerMode::Inspect {
        log_request(&headers, &body);
    }

    if !is_messages_endpoint {
        return StatusCode::NOT_FOUND.into_response();
    }

    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            log::error!("[Interceptor] Error parsing request body ({} bytes): {e}", body.len());
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let request = MessagesRequest::from_json(body);
    let model = request.model.clone();

    if ctx.mode == ServerMode::Capture {
        offer(&ctx, request);
    }

    Json(MessagesResponse::intercepted(model)).into_response()
}

fn offer(ctx: &CaptureContext, request: MessagesRequest) {
    let payload = request.into_payload();
    let tool_count = payload.tools.len();
    let prompt_chars = payload.system_prompt.chars().count();

    if !ctx.policy.qualifies(&payload) {
        log::info!(
            "[Interceptor] ✗ Skipping request ({tool_count} tools, {prompt_chars} chars prompt, captured: {})",
            ctx.pending.is_latched()
        );
        return;
    }

    match ctx.pending.capture(payload) {
        CaptureOutcome::Delivered | CaptureOutcome::Buffered => {
            log::info!(
                "[Interceptor] ✓ Captured data with {tool_count} tools, {prompt_chars} chars system prompt"
            );
        }
        CaptureOutcome::AlreadyCaptured => {
            log::info!(
                "[Interceptor] ✗ Skipping request ({tool_count} tools, {prompt_chars} chars prompt, captured: true)"
            );
        }
    }
}

fn log_request(headers: &HeaderMap, body: &[u8]) {
    for (name, value) in headers {
        log::info!(
            "[Inspect] {name}: {}",
            value.to_str().unwrap_or("<binary>")
        );
    }

    let pretty = serde_json::from_slice::<Value>(body)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned());
    let preview: String = pretty.chars().take(PREVIEW_CHARS).collect();
    log::info!("[Inspect] Request body (first {PREVIEW_CHARS} chars):\n{preview}");
}

/// Running mock API listener
///
/// Lives for the whole run. Dropping it signals shutdown; call
/// [`CaptureServer::shutdown`] to also wait for in-flight requests.
pub struct CaptureServer {
    local_addr: SocketAddr,
    shutdown_token: CancellationToken,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl CaptureServer {
    /// Bind `addr` and start serving in a background task
    pub async fn bind(addr: SocketAddr, ctx: Arc<CaptureContext>) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind capture server on {addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read capture server address")?;

        let shutdown_token = CancellationToken::new();
        let token = shutdown_token.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, router(ctx))
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        });

        log::info!("Interceptor listening on {local_addr}");

        Ok(Self {
            local_addr,
            shutdown_token,
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL handed to the target CLI
    pub fn base_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting connections and wait for the serve task to finish
    pub async fn shutdown(mut self) -> Result<()> {
        self.shutdown_token.cancel();
        if let Some(task) = self.task.take() {
            task.await
                .context("Capture server task panicked")?
                .context("Capture server failed")?;
        }
        log::info!("Interceptor on {} stopped", self.local_addr);
        Ok(())
    }
}

impl Drop for CaptureServer {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}
