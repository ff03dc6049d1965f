//! CLI subcommand implementations.

pub mod check;
pub mod deploy;
pub mod release;
pub mod scrub;
pub mod sim;
