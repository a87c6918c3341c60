//! Attendance checkpoint controller CLI.
//!
//! Wires the core scan-and-session state machine to the REST store adapter
//! and to host-side stand-ins for the checkpoint hardware.

mod cli;
pub mod commands;
mod config;
pub mod hardware;

pub use cli::{Cli, Commands};
pub use config::Config;
