use anyhow::Result;
use clap::Parser;

use promptharvest::cli::{Cli, Commands};
use promptharvest::commands;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging, `info` unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse CLI arguments
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Inspect) => commands::handle_inspect(cli.server).await,
        None => {
            let summary = commands::handle_harvest(cli.server, cli.harvest).await?;
            if !summary.failed.is_empty() {
                log::warn!("Failed versions: {}", summary.failed.join(", "));
            }
            Ok(())
        }
    }
}
