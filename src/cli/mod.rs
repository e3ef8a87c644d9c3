//! Command-line interface.
//!
//! With no subcommand the binary launches the TUI; the subcommands cover
//! account and lookup tasks that are handy from a shell.

mod commands;
mod common;
pub mod completions;

pub use commands::{Cli, Commands};
pub use common::*;
