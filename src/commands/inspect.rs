use anyhow::Result;
use std::sync::Arc;

use crate::capture::{CaptureContext, CaptureServer};
use crate::cli::ServerArgs;

/// Handle `promptharvest inspect`
///
/// Logs every request the mock server receives until interrupted.
pub async fn handle_inspect(server: ServerArgs) -> Result<()> {
    let ctx = Arc::new(CaptureContext::inspect(server.messages_path.clone()));
    let capture_server = CaptureServer::bind(server.listen_addr(), ctx).await?;

    log::info!(
        "Inspecting requests on {}; press Ctrl+C to exit",
        capture_server.base_url()
    );

    wait_for_interrupt().await;
    log::debug!("Received interrupt signal, stopping inspector");

    capture_server.shutdown().await
}

/// Resolve on Ctrl-C, or on SIGTERM where the platform has it
///
/// A signal that cannot be registered is logged and never fires.
async fn wait_for_interrupt() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
