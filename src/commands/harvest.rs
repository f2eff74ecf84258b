use anyhow::{Context, Result};
use std::sync::Arc;

use crate::capture::{CaptureContext, CaptureServer};
use crate::cli::{HarvestArgs, ServerArgs};
use crate::collect::{CliLauncher, Collector, GitRepo, MetadataStore, NpmRegistry, RunSummary};

/// Handle the default harvest mode
///
/// Starts the mock server once, then walks the selected versions. The server
/// is shut down whether or not the run succeeds.
pub async fn handle_harvest(server: ServerArgs, harvest: HarvestArgs) -> Result<RunSummary> {
    let output_dir = harvest
        .output_dir
        .canonicalize()
        .with_context(|| format!("Output directory {:?} does not exist", harvest.output_dir))?;

    let registry = NpmRegistry::new(&harvest.package)?;
    let vcs = GitRepo::new(&output_dir, &harvest.package)?;
    let launcher = CliLauncher::new(harvest.launch_config());
    let store = MetadataStore::new(&output_dir);

    let ctx = Arc::new(CaptureContext::new(
        harvest.capture_policy(),
        server.messages_path.clone(),
    ));
    let capture_server = CaptureServer::bind(server.listen_addr(), Arc::clone(&ctx)).await?;

    let base_url = capture_server.base_url();

    let collector = Collector::new(
        registry,
        launcher,
        vcs,
        store,
        ctx,
        base_url,
        harvest.collect_config(),
    );

    let result = collector.run().await;

    if let Err(e) = capture_server.shutdown().await {
        log::warn!("Capture server did not shut down cleanly: {e}");
    }

    result.context("Failed to enumerate versions")
}
