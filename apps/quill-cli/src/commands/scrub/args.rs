use std::path::PathBuf;

use clap::Args;

#[derive(Debug, Args)]
pub struct ScrubArgs {
    /// PlatformIO project directory
    #[arg(long, default_value = ".")]
    pub project_dir: PathBuf,

    /// Pre-build hook mode: quiet on success, and a missing header is
    /// skipped instead of failing the build
    #[arg(long)]
    pub hook: bool,
}
