use clap::{Args, Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::CapturePolicy;
use crate::collect::{CollectConfig, LaunchConfig, VersionScope};

/// promptharvest - record the system prompt and tool definitions of every
/// published version of a CLI agent
///
/// Each version is installed into a throwaway directory and launched with its
/// API base URL pointed at a local mock server. The first real request it
/// sends is written to `system_prompt.md` and `tools/*.md` in the output
/// directory and committed with git.
#[derive(Parser, Debug)]
#[command(name = "promptharvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run (defaults to harvesting)
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub harvest: HarvestArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the mock server alone and log every request it receives
    ///
    /// Point a target at it with ANTHROPIC_BASE_URL=http://localhost:<port>.
    /// Stops on Ctrl-C.
    Inspect,
}

/// Options shared by every mode that runs the mock server
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Local port of the mock API server
    #[arg(long, env = "PROMPTHARVEST_PORT", default_value = "3000")]
    pub port: u16,

    /// Path prefix of the messages endpoint
    #[arg(long, env = "PROMPTHARVEST_MESSAGES_PATH", default_value = "/v1/messages")]
    pub messages_path: String,
}

/// Options of the harvest loop
#[derive(Args, Debug, Clone)]
pub struct HarvestArgs {
    /// npm package to harvest
    #[arg(long, env = "PROMPTHARVEST_PACKAGE", default_value = "@anthropic-ai/claude-code")]
    pub package: String,

    /// Binary name installed under node_modules/.bin
    #[arg(long, env = "PROMPTHARVEST_BIN", default_value = "claude")]
    pub bin_name: String,

    /// Prompt passed to the target with -p
    #[arg(long, env = "PROMPTHARVEST_PROMPT", default_value = "hi")]
    pub prompt: String,

    /// Placeholder API key exported to the target
    #[arg(long, env = "PROMPTHARVEST_API_KEY", default_value = "fake-key-for-testing")]
    pub api_key: String,

    /// Only process the most recent versions (see --test-count)
    #[arg(long, env = "PROMPTHARVEST_TEST")]
    pub test: bool,

    /// Number of versions processed in test mode
    #[arg(long, value_name = "COUNT", env = "PROMPTHARVEST_TEST_COUNT", default_value = "3")]
    pub test_count: usize,

    /// Seconds before the launched target is killed
    #[arg(long, value_name = "SECONDS", env = "PROMPTHARVEST_LAUNCH_TIMEOUT", default_value = "10")]
    pub launch_timeout: u64,

    /// Seconds to wait for a captured request, counted from launch
    #[arg(long, value_name = "SECONDS", env = "PROMPTHARVEST_CAPTURE_TIMEOUT", default_value = "15")]
    pub capture_timeout: u64,

    /// A request qualifies only if its system prompt is longer than this
    #[arg(long, value_name = "CHARS", env = "PROMPTHARVEST_MIN_PROMPT_CHARS", default_value = "1000")]
    pub min_prompt_chars: usize,

    /// Milliseconds to pause between versions
    #[arg(long, value_name = "MS", env = "PROMPTHARVEST_PAUSE_MS", default_value = "1000")]
    pub pause_ms: u64,

    /// Git working tree receiving system_prompt.md and tools/
    #[arg(long, value_name = "PATH", env = "PROMPTHARVEST_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Parent directory of the per-version install directories
    #[arg(long, value_name = "PATH", env = "PROMPTHARVEST_WORK_DIR", default_value = "/tmp")]
    pub work_dir: PathBuf,
}

impl ServerArgs {
    /// Loopback address the mock server binds
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), self.port)
    }
}

impl HarvestArgs {
    pub fn scope(&self) -> VersionScope {
        if self.test {
            VersionScope::Latest(self.test_count)
        } else {
            VersionScope::All
        }
    }

    pub fn capture_policy(&self) -> CapturePolicy {
        CapturePolicy {
            min_system_chars: self.min_prompt_chars,
            ..CapturePolicy::default()
        }
    }

    pub fn launch_config(&self) -> LaunchConfig {
        LaunchConfig {
            bin_name: self.bin_name.clone(),
            prompt: self.prompt.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.launch_timeout),
        }
    }

    pub fn collect_config(&self) -> CollectConfig {
        CollectConfig {
            scope: self.scope(),
            capture_timeout: Duration::from_secs(self.capture_timeout),
            pause: Duration::from_millis(self.pause_ms),
            work_dir: self.work_dir.clone(),
        }
    }
}
