use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Args)]
pub struct ReleaseArgs {
    /// PlatformIO project directory
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Build environment to release; repeat for several. Defaults to all
    /// production targets.
    #[arg(long)]
    pub target: Vec<String>,

    /// Restore the backed-up configuration and exit without building
    #[arg(long)]
    pub recover: bool,
}
