use std::path::PathBuf;
use std::time::Duration;

/// Failure of one version run
///
/// Every variant is fatal to the version being processed and to nothing
/// else; the orchestrator logs it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("Failed to query versions of {package}: {message}")]
    Registry { package: String, message: String },

    #[error("Failed to install version {version}: {message}")]
    Install { version: String, message: String },

    #[error("Target binary not found: {}", path.display())]
    BinaryMissing { path: PathBuf },

    #[error("Failed to launch target binary {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout waiting for capture after {}s", timeout.as_secs_f32())]
    CaptureTimeout { timeout: Duration },

    #[error("Capture wait abandoned before a payload arrived")]
    CaptureAbandoned,

    #[error("Failed to write {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed: {message}")]
    Commit { command: String, message: String },

    #[error("Failed to read git history: {0}")]
    History(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CollectResult<T> = std::result::Result<T, CollectError>;
