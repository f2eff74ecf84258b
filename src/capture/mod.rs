//! Mock messages endpoint and the capture hand-off it feeds

pub mod payload;
pub mod server;
pub mod slot;

pub use payload::{CapturedPayload, MessagesRequest, MessagesResponse, ToolDefinition};
pub use server::{CaptureServer, router};
pub use slot::{CaptureOutcome, PendingCapture, SlotError};

/// Heuristic separating the primary request from probe calls
///
/// The target CLI sends token-counting and warm-up requests before the real
/// conversation turn. Those carry no tools or only a short system prompt.
#[derive(Debug, Clone)]
pub struct CapturePolicy {
    /// System prompt must be strictly longer than this many characters
    pub min_system_chars: usize,
    /// Require at least one tool definition
    pub require_tools: bool,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self {
            min_system_chars: 1000,
            require_tools: true,
        }
    }
}

impl CapturePolicy {
    pub fn qualifies(&self, payload: &CapturedPayload) -> bool {
        let has_tools = !self.require_tools || !payload.tools.is_empty();
        has_tools && payload.system_prompt.chars().count() > self.min_system_chars
    }
}

/// How the server treats parseable requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Offer qualifying requests to the pending-capture slot
    Capture,
    /// Log headers and a body preview of every request, never capture
    Inspect,
}

/// Per-run state shared between the listener and the orchestrator
#[derive(Debug)]
pub struct CaptureContext {
    pub pending: PendingCapture,
    pub policy: CapturePolicy,
    pub mode: ServerMode,
    /// Path prefix of the messages endpoint, e.g. `/v1/messages`
    pub messages_path: String,
}

impl CaptureContext {
    pub fn new(policy: CapturePolicy, messages_path: impl Into<String>) -> Self {
        Self {
            pending: PendingCapture::new(),
            policy,
            mode: ServerMode::Capture,
            messages_path: messages_path.into(),
        }
    }

    pub fn inspect(messages_path: impl Into<String>) -> Self {
        Self {
            mode: ServerMode::Inspect,
            ..Self::new(CapturePolicy::default(), messages_path)
        }
    }

    /// Whether `path` (without query string) addresses the messages endpoint
    ///
    /// Sub-paths such as `/v1/messages/count_tokens` match too, so probe
    /// calls get a well-formed answer instead of a 404.
    pub fn is_messages_path(&self, path: &str) -> bool {
        let prefix = self.messages_path.trim_end_matches('/');
        match path.strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}
