//! Version-by-version harvest loop
//!
//! Per version: skip check, isolated install, launch against the capture
//! server, wait for a capture, persist, record, clean up. Versions run
//! strictly one after another because the capture slot is shared by the
//! whole run.

pub mod error;
pub mod launcher;
pub mod process;
pub mod registry;
pub mod store;
pub mod vcs;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use error::{CollectError, CollectResult};
pub use launcher::{CliLauncher, LaunchConfig, Launcher};
pub use process::ProcessOutcome;
pub use registry::{NpmRegistry, Registry};
pub use store::MetadataStore;
pub use vcs::{GitRepo, VersionControl};

use crate::capture::{CaptureContext, CapturedPayload};

/// Which slice of the published versions to process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionScope {
    /// Every version, oldest to newest
    All,
    /// Only the newest `n` versions, still oldest to newest
    Latest(usize),
}

impl VersionScope {
    pub fn select<'a>(&self, versions: &'a [String]) -> &'a [String] {
        match *self {
            Self::All => versions,
            Self::Latest(n) => &versions[versions.len().saturating_sub(n)..],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectConfig {
    pub scope: VersionScope,
    /// Limit on waiting for a capture, counted from launch
    pub capture_timeout: Duration,
    /// Delay after each processed version
    pub pause: Duration,
    /// Parent of the per-version install directories
    pub work_dir: PathBuf,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            scope: VersionScope::All,
            capture_timeout: Duration::from_secs(15),
            pause: Duration::from_secs(1),
            work_dir: PathBuf::from("/tmp"),
        }
    }
}

/// Counts reported once the loop finishes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Drives one harvest run over a registry, a launcher and a repository
pub struct Collector<R, L, V> {
    registry: R,
    launcher: L,
    vcs: V,
    store: MetadataStore,
    ctx: Arc<CaptureContext>,
    base_url: String,
    config: CollectConfig,
}

impl<R, L, V> Collector<R, L, V>
where
    R: Registry,
    L: Launcher,
    V: VersionControl,
{
    pub fn new(
        registry: R,
        launcher: L,
        vcs: V,
        store: MetadataStore,
        ctx: Arc<CaptureContext>,
        base_url: impl Into<String>,
        config: CollectConfig,
    ) -> Self {
        Self {
            registry,
            launcher,
            vcs,
            store,
            ctx,
            base_url: base_url.into(),
            config,
        }
    }

    /// Process every selected version
    ///
    /// Only a failure to list versions aborts the run; per-version failures
    /// are logged and counted.
    pub async fn run(&self) -> CollectResult<RunSummary> {
        let all_versions = self.registry.versions().await?;
        let versions = self.config.scope.select(&all_versions);

        if let VersionScope::Latest(_) = self.config.scope {
            log::info!("TEST MODE: Processing last {} versions only", versions.len());
        }
        log::info!(
            "Found {} versions total, processing {}",
            all_versions.len(),
            versions.len()
        );

        let mut summary = RunSummary {
            total: versions.len(),
            ..RunSummary::default()
        };

        for (i, version) in versions.iter().enumerate() {
            log::info!("Progress: {}/{}", i + 1, versions.len());

            match self.vcs.is_recorded(version).await {
                Ok(true) => {
                    log::info!("⊘ Skipping {version} (already processed)");
                    summary.skipped.push(version.clone());
                    continue;
                }
                Ok(false) => log::info!("→ Processing {version} (new version)"),
                Err(e) => {
                    log::warn!("Could not check history for {version}, processing anyway: {e}");
                }
            }

            match self.process_version(version).await {
                Ok(()) => {
                    log::info!("✓ Successfully processed version {version}");
                    summary.processed.push(version.clone());
                }
                Err(e) => {
                    log::error!("✗ Failed to process version {version}: {e}");
                    summary.failed.push(version.clone());
                }
            }

            if !self.config.pause.is_zero() {
                tokio::time::sleep(self.config.pause).await;
            }
        }

        log::info!(
            "✓ All versions processed! ({} new, {} skipped, {} failed)",
            summary.processed.len(),
            summary.skipped.len(),
            summary.failed.len()
        );

        Ok(summary)
    }

    /// Install, launch, capture, persist and record one version
    ///
    /// The install directory is removed whatever the outcome.
    pub async fn process_version(&self, version: &str) -> CollectResult<()> {
        log::info!("{}", "=".repeat(60));
        log::info!("Processing version {version}");
        log::info!("{}", "=".repeat(60));

        self.ctx.pending.reset();

        let install_dir = tempfile::Builder::new()
            .prefix(&format!("claude-code-{version}-"))
            .tempdir_in(&self.config.work_dir)?;

        let result = self.harvest(version, install_dir.path()).await;

        let path = install_dir.path().to_path_buf();
        if let Err(e) = install_dir.close() {
            log::warn!("Failed to clean up {}: {e}", path.display());
        }

        result
    }

    async fn harvest(&self, version: &str, install_dir: &Path) -> CollectResult<()> {
        self.registry.install(version, install_dir).await?;

        let payload = self.launch_and_capture(install_dir).await?;

        self.store.save(&payload).await?;
        self.vcs.record(version).await
    }

    /// Race the capture signal against the capture deadline while the target
    /// runs under its own timeout
    ///
    /// Whichever of capture and deadline fires first settles the version. A
    /// finished launch only stops being polled; a launch that fails before
    /// the target starts (missing binary) aborts immediately. Dropping the
    /// pending launch kills the child.
    async fn launch_and_capture(&self, install_dir: &Path) -> CollectResult<CapturedPayload> {
        log::info!("Running target to trigger API call...");

        let deadline = tokio::time::sleep(self.config.capture_timeout);
        let launch = self.launcher.launch(install_dir, &self.base_url);
        let capture = self.ctx.pending.wait();
        tokio::pin!(deadline, launch, capture);

        let mut launch_done = false;
        loop {
            tokio::select! {
                captured = &mut capture => {
                    return captured.map_err(|_| CollectError::CaptureAbandoned);
                }
                outcome = &mut launch, if !launch_done => {
                    launch_done = true;
                    if let Err(e) = outcome {
                        return Err(e);
                    }
                }
                () = &mut deadline => {
                    return Err(CollectError::CaptureTimeout {
                        timeout: self.config.capture_timeout,
                    });
                }
            }
        }
    }
}
