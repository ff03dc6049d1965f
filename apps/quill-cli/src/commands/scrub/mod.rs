use std::fs;

use anyhow::{bail, Context, Result};
use log::{debug, warn};

use quill_release::backup::path_with_suffix;
use quill_release::release::config_path;
use quill_release::template::{self, EXAMPLE_SUFFIX};
use quill_release::{Scrubber, SecretPatterns};

pub mod args;

pub use args::ScrubArgs;

/// Regenerate the committed configuration template from the live header.
///
/// The live header is only read, never written; the scrubbed text goes into
/// the `.example` file alone. Residual secrets in the scrubbed text fail the
/// command before anything is written.
pub fn handle_scrub(args: ScrubArgs) -> Result<()> {
    let live_path = config_path(&args.project_dir);
    if !live_path.is_file() {
        if args.hook {
            // Fresh checkouts build before anyone creates the live header.
            warn!(
                "{} not found, skipping template generation",
                live_path.display()
            );
            return Ok(());
        }
        bail!("no configuration header at {}", live_path.display());
    }

    let source = fs::read_to_string(&live_path)
        .with_context(|| format!("reading {}", live_path.display()))?;

    let patterns = SecretPatterns::standard();
    let outcome = Scrubber::new(&patterns).scrub(&source)?;

    let example_path = path_with_suffix(&live_path, EXAMPLE_SUFFIX);
    fs::write(&example_path, template::render_template(&outcome.text))
        .with_context(|| format!("writing {}", example_path.display()))?;

    if args.hook {
        debug!(
            "generated {} ({} redactions)",
            example_path.display(),
            outcome.redactions
        );
    } else {
        println!(
            "Generated {} ({} values redacted)",
            example_path.display(),
            outcome.redactions
        );
        if outcome.redactions == 0 {
            println!("The live header held no secret values.");
        }
    }
    Ok(())
}
