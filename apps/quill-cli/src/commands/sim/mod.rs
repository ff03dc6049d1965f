use std::io::{self, BufRead};

use anyhow::{Context, Result};
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use log::warn;

use quill_sim::scenario::{self, ALL_SCENARIOS};
use quill_sim::{BrokerSettings, PrinterFleet, ScenarioKind, StopMode};

pub mod args;

pub use args::SimArgs;

/// Simulate printers announcing themselves over MQTT.
///
/// With `--scenario` the fleet plays one canned script and stays online
/// until Enter is pressed, so the discovery UI can be inspected. Without
/// it, an interactive prompt drives individual printers.
pub fn handle_sim(args: SimArgs) -> Result<()> {
    let settings = BrokerSettings::from_env()
        .context("reading QUILL_MQTT_* environment")?
        .merge_cli(
            args.host.clone(),
            args.port,
            args.username.clone(),
            args.password.clone(),
            args.tls_choice(),
        );

    println!(
        "Connecting printers to {}:{} (TLS {})",
        settings.host,
        settings.port,
        if settings.tls { "on" } else { "off" }
    );

    let mut fleet = PrinterFleet::new(settings);
    let result = match &args.scenario {
        Some(name) => run_scenario_and_hold(name, &mut fleet),
        None => run_interactive(&mut fleet),
    };

    // Whatever happened, take the fleet down cleanly so no retained
    // online status outlives the simulator.
    fleet.stop_all(StopMode::Graceful);
    println!("All simulated printers stopped.");
    result
}

fn run_scenario_and_hold(name: &str, fleet: &mut PrinterFleet) -> Result<()> {
    let kind: ScenarioKind = name.parse()?;
    scenario::run(kind, fleet)?;

    println!();
    println!("Scenario {kind} finished; {} printer(s) online.", fleet.len());
    println!("Check the printer discovery page, then press Enter to stop.");
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("waiting for Enter")?;
    Ok(())
}

fn run_interactive(fleet: &mut PrinterFleet) -> Result<()> {
    print_help();

    loop {
        let line: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("quill-sim")
            .allow_empty(true)
            .interact_text()
            .context("reading command")?;
        let words: Vec<&str> = line.split_whitespace().collect();

        let outcome = match words.as_slice() {
            [] => Ok(()),
            ["quit" | "exit"] => break,
            ["start", name, rest @ ..] => {
                let firmware = rest.first().copied().unwrap_or("1.0.0");
                fleet.start(name, firmware, next_ip_suffix(fleet.len()))
            }
            ["stop", name] => fleet.stop(name, StopMode::Graceful),
            ["kill", name] => fleet.stop(name, StopMode::Abrupt),
            ["status", name, status] => fleet.update_status(name, status),
            ["list"] => {
                list_printers(fleet);
                Ok(())
            }
            ["scenario", name] => match name.parse::<ScenarioKind>() {
                Ok(kind) => scenario::run(kind, fleet),
                Err(err) => Err(err),
            },
            ["help"] => {
                print_help();
                Ok(())
            }
            _ => {
                println!("Unknown command. Type 'help' for available commands.");
                Ok(())
            }
        };

        // Per-command errors stay in the loop; only I/O on the prompt
        // itself ends the session.
        if let Err(err) = outcome {
            warn!("{err}");
        }
    }
    Ok(())
}

/// Host suffix for the next simulated printer. Devices live at
/// 192.168.1.101-254; the suffix wraps around rather than running off the
/// end of a u8.
fn next_ip_suffix(active_sessions: usize) -> u8 {
    101 + (active_sessions % 154) as u8
}

fn list_printers(fleet: &PrinterFleet) {
    if fleet.is_empty() {
        println!("No active printers");
        return;
    }
    println!("Active printers:");
    for status in fleet.statuses() {
        println!(
            "  {} ({}, firmware {}, ip {})",
            status.name, status.status, status.firmware_version, status.ip_address
        );
    }
}

fn print_help() {
    println!("Commands:");
    println!("  start <name> [firmware]  start a printer (e.g. 'start Alice 1.2.0')");
    println!("  stop <name>              stop a printer cleanly");
    println!("  kill <name>              drop a printer's connection (fires its LWT)");
    println!("  status <name> <status>   republish a printer's status value");
    println!("  list                     list active printers");
    println!("  scenario <name>          run a canned scenario");
    println!("  help                     show this help");
    println!("  quit                     stop everything and exit");
    println!();
    println!("Scenarios:");
    for kind in ALL_SCENARIOS {
        println!("  {:<8} {}", kind.name(), kind.description());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_suffix_counts_up_from_101() {
        assert_eq!(next_ip_suffix(0), 101);
        assert_eq!(next_ip_suffix(1), 102);
        assert_eq!(next_ip_suffix(153), 254);
    }

    #[test]
    fn test_ip_suffix_wraps_instead_of_overflowing() {
        assert_eq!(next_ip_suffix(154), 101);
        assert_eq!(next_ip_suffix(155), 102);
        // Anything a long chaos session could reach stays in range.
        for count in 0..1000 {
            let suffix = next_ip_suffix(count);
            assert!((101..=254).contains(&suffix), "count {count} gave {suffix}");
        }
    }
}
