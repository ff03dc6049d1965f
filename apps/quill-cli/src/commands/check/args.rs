use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Serial port to probe for a connected board, e.g. /dev/ttyACM0
    #[arg(long)]
    pub port: Option<PathBuf>,
}
