use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Build environment to deploy, e.g. esp32c3-dev
    #[arg(long)]
    pub target: String,

    /// PlatformIO project directory
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Stop after the firmware upload instead of opening the serial monitor
    #[arg(long)]
    pub skip_monitor: bool,
}
