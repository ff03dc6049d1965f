use anyhow::{bail, Result};

use quill_release::preflight::{self, ToolStatus};
use quill_release::runner::SystemRunner;

pub mod args;

pub use args::CheckArgs;

/// Probe the external tools the pipeline shells out to, and optionally a
/// serial port, before anyone sinks time into a build that cannot finish.
pub fn handle_check(args: CheckArgs) -> Result<()> {
    let mut runner = SystemRunner;
    let reports = preflight::check_host_tools(&mut runner);

    let mut problems = 0;
    for report in &reports {
        match &report.status {
            ToolStatus::Found(version) if version.is_empty() => {
                println!("  {:<10} ok", report.tool);
            }
            ToolStatus::Found(version) => {
                println!("  {:<10} ok    {version}", report.tool);
            }
            ToolStatus::Missing => {
                println!("  {:<10} missing ({})", report.tool, report.hint);
                problems += 1;
            }
            ToolStatus::Broken(reason) => {
                println!("  {:<10} broken: {reason}", report.tool);
                problems += 1;
            }
        }
    }

    if let Some(port) = &args.port {
        if preflight::serial_port_present(port) {
            println!("  {:<10} present", port.display());
        } else {
            println!("  {:<10} not found (is the board plugged in?)", port.display());
            problems += 1;
        }
    }

    if problems > 0 {
        bail!("{problems} preflight check(s) failed");
    }
    println!("Everything the pipeline needs is installed.");
    Ok(())
}
