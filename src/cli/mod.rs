//! CLI command handling module
//!
//! Handles the configuration subcommands, the interactive line commands of
//! `watch`, and logging setup.

mod commands;
mod interactive;
mod logging;
mod version;

pub use commands::{ConfigSubcommand, handle_config_command};
pub use interactive::{LineCommand, parse_line, run_interactive};
pub use logging::*;
pub use version::display_version;
