use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::error::{CollectError, CollectResult};
use super::process::{ProcessOutcome, preview, run_with_timeout};

/// Characters of child stdout/stderr kept in log lines
const OUTPUT_PREVIEW_CHARS: usize = 500;

/// Starts the installed target so that it talks to the capture server
#[allow(async_fn_in_trait)]
pub trait Launcher {
    /// Run the target installed in `install_dir` against `base_url`
    ///
    /// A timeout or non-zero exit is reported through the outcome, not as an
    /// error: only whether a capture happened matters to the caller.
    async fn launch(&self, install_dir: &Path, base_url: &str) -> CollectResult<ProcessOutcome>;
}

#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Binary name under `node_modules/.bin`
    pub bin_name: String,
    /// Prompt passed with `-p`
    pub prompt: String,
    /// Placeholder key; requests never reach the real API
    pub api_key: String,
    /// Wall-clock limit for the child process
    pub timeout: Duration,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            bin_name: "claude".to_string(),
            prompt: "hi".to_string(),
            api_key: "fake-key-for-testing".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Launches the npm-installed CLI in non-interactive print mode
#[derive(Debug, Clone, Default)]
pub struct CliLauncher {
    config: LaunchConfig,
}

impl CliLauncher {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    /// Path of the installed binary inside `install_dir`
    pub fn binary_path(&self, install_dir: &Path) -> PathBuf {
        install_dir
            .join("node_modules")
            .join(".bin")
            .join(&self.config.bin_name)
    }

    fn find_binary(&self, install_dir: &Path) -> CollectResult<PathBuf> {
        let path = self.binary_path(install_dir);
        if path.exists() {
            log::info!("✓ Target binary found at: {}", path.display());
            Ok(path)
        } else {
            log::error!("✗ Target binary NOT found at: {}", path.display());
            Err(CollectError::BinaryMissing { path })
        }
    }
}

impl Launcher for CliLauncher {
    async fn launch(&self, install_dir: &Path, base_url: &str) -> CollectResult<ProcessOutcome> {
        let binary = self.find_binary(install_dir)?;

        log::info!("Command: \"{}\" -p \"{}\"", binary.display(), self.config.prompt);
        log::info!("Env vars: ANTHROPIC_BASE_URL={base_url} ANTHROPIC_API_KEY=***");

        let mut cmd = Command::new(&binary);
        cmd.arg("-p")
            .arg(&self.config.prompt)
            .current_dir(install_dir)
            .env("ANTHROPIC_BASE_URL", base_url)
            .env("ANTHROPIC_API_KEY", &self.config.api_key)
            .env("NODE_ENV", "production")
            // Empty stdin so the CLI never blocks on interactive input
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let outcome = run_with_timeout(&mut cmd, self.config.timeout)
            .await
            .map_err(|source| CollectError::Launch {
                path: binary.clone(),
                source,
            })?;

        match &outcome {
            ProcessOutcome::Exited {
                status,
                stdout,
                stderr,
            } => {
                if status.success() {
                    log::info!("✓ Target completed successfully");
                } else {
                    log::warn!("⚠ Target command failed with: {status}");
                }
                log::debug!("Target stdout: {}", preview(stdout, OUTPUT_PREVIEW_CHARS));
                log::debug!("Target stderr: {}", preview(stderr, OUTPUT_PREVIEW_CHARS));
            }
            ProcessOutcome::TimedOut => {
                log::warn!(
                    "⚠ Target command was killed (timeout after {:?})",
                    self.config.timeout
                );
            }
        }

        Ok(outcome)
    }
}
