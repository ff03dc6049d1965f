use anyhow::{bail, Context, Result};

use quill_release::error::RunnerError;
use quill_release::runner::{Invocation, SystemRunner, ToolRunner};

pub mod args;

pub use args::DeployArgs;

pub fn handle_deploy(args: DeployArgs) -> Result<()> {
    run_deploy(&args, &mut SystemRunner)
}

/// Build everything and put it on a connected board: frontend assets,
/// filesystem image, firmware, then the serial monitor. The first failed
/// step aborts the rest.
fn run_deploy(args: &DeployArgs, runner: &mut dyn ToolRunner) -> Result<()> {
    let project_dir = &args.project_dir;
    if !project_dir.join("platformio.ini").exists() {
        bail!("{} is not a PlatformIO project", project_dir.display());
    }

    let total = if args.skip_monitor { 3 } else { 4 };
    let target = args.target.as_str();
    let steps = [
        ("building frontend", Invocation::new("npm", ["run", "build"])),
        (
            "uploading filesystem",
            Invocation::new("pio", ["run", "-e", target, "-t", "uploadfs"]),
        ),
        (
            "uploading firmware",
            Invocation::new("pio", ["run", "-e", target, "-t", "upload"]),
        ),
    ];

    for (index, (label, invocation)) in steps.into_iter().enumerate() {
        println!("[{}/{total}] {label}", index + 1);
        runner
            .run(&invocation.in_dir(project_dir).interactive())
            .with_context(|| format!("{label} failed"))?;
    }

    if args.skip_monitor {
        println!("Deploy finished, skipping the serial monitor.");
        return Ok(());
    }

    println!("[4/{total}] starting serial monitor (Ctrl-C to exit)");
    let monitor =
        Invocation::new("pio", ["run", "-e", target, "-t", "monitor"])
            .in_dir(project_dir)
            .interactive();
    match runner.run(&monitor) {
        Ok(_) => Ok(()),
        // Leaving the monitor with Ctrl-C is a normal exit, not a failure.
        Err(RunnerError::Failed { .. }) => Ok(()),
        Err(err) => Err(err).context("could not start the serial monitor"),
    }
}
