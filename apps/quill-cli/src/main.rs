use clap::{Parser, Subcommand};
use log::error;

use quill_cli::commands::{check, deploy, release, scrub, sim};

#[derive(Parser)]
#[command(
    name = "quill",
    version,
    about = "Build, release, and test tooling for Quill printer firmware"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrub secrets and build flashable release images for every target
    Release(release::ReleaseArgs),
    /// Generate the committed configuration template from the live header
    Scrub(scrub::ScrubArgs),
    /// Build, upload, and monitor one development board
    Deploy(deploy::DeployArgs),
    /// Verify the external tools the pipeline shells out to are installed
    Check(check::CheckArgs),
    /// Simulate networked printers for discovery testing
    Sim(sim::SimArgs),
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Release(args) => release::handle_release(args),
        Command::Scrub(args) => scrub::handle_scrub(args),
        Command::Deploy(args) => deploy::handle_deploy(args),
        Command::Check(args) => check::handle_check(args),
        Command::Sim(args) => sim::handle_sim(args),
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_release_defaults() {
        let cli = Cli::try_parse_from(["quill", "release"]).unwrap();
        let Command::Release(args) = cli.command else {
            panic!("expected the release subcommand");
        };
        assert_eq!(args.project_dir, Path::new("."));
        assert!(args.target.is_empty(), "no explicit targets by default");
        assert!(!args.recover);
    }

    #[test]
    fn test_release_accepts_repeated_targets() {
        let cli = Cli::try_parse_from([
            "quill",
            "release",
            "--target",
            "esp32c3-prod",
            "--target",
            "lolin32lite-no-leds",
        ])
        .unwrap();
        let Command::Release(args) = cli.command else {
            panic!("expected the release subcommand");
        };
        assert_eq!(args.target, ["esp32c3-prod", "lolin32lite-no-leds"]);
    }

    #[test]
    fn test_deploy_requires_a_target() {
        assert!(Cli::try_parse_from(["quill", "deploy"]).is_err());

        let cli =
            Cli::try_parse_from(["quill", "deploy", "--target", "esp32c3-dev"])
                .unwrap();
        let Command::Deploy(args) = cli.command else {
            panic!("expected the deploy subcommand");
        };
        assert_eq!(args.target, "esp32c3-dev");
        assert!(!args.skip_monitor);
    }

    #[test]
    fn test_scrub_hook_flag() {
        let cli = Cli::try_parse_from(["quill", "scrub", "--hook"]).unwrap();
        let Command::Scrub(args) = cli.command else {
            panic!("expected the scrub subcommand");
        };
        assert!(args.hook);
    }

    #[test]
    fn test_sim_tls_flags_conflict() {
        let result =
            Cli::try_parse_from(["quill", "sim", "--tls", "--no-tls"]);
        assert!(result.is_err(), "--tls and --no-tls together must not parse");
    }

    #[test]
    fn test_sim_broker_overrides() {
        let cli = Cli::try_parse_from([
            "quill",
            "sim",
            "--scenario",
            "office",
            "--host",
            "broker.local",
            "--port",
            "1884",
        ])
        .unwrap();
        let Command::Sim(args) = cli.command else {
            panic!("expected the sim subcommand");
        };
        assert_eq!(args.scenario.as_deref(), Some("office"));
        assert_eq!(args.host.as_deref(), Some("broker.local"));
        assert_eq!(args.port, Some(1884));
        assert!(args.username.is_none());
    }

    #[test]
    fn test_check_accepts_a_port_probe() {
        let cli =
            Cli::try_parse_from(["quill", "check", "--port", "/dev/ttyACM0"])
                .unwrap();
        let Command::Check(args) = cli.command else {
            panic!("expected the check subcommand");
        };
        assert_eq!(args.port.as_deref(), Some(Path::new("/dev/ttyACM0")));
    }
}
