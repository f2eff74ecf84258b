mod types;

pub use types::{Cli, Commands, HarvestArgs, ServerArgs};
