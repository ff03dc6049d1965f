//! Quill firmware tooling CLI.
//!
//! This library exposes the CLI functionality for use in tests.
//! It provides:
//! - The full release pipeline and standalone template generation
//! - Board deploy and host preflight commands
//! - The MQTT printer discovery simulator

pub mod commands;
