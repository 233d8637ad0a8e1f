#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod action;
mod args;
mod commands;
mod parser;

pub use action::{CliAction, GlobalOptions, OutputFormat};
pub use args::{suggest_commands, VALID_COMMANDS};
pub use commands::CliCommand;
pub use parser::{parse_cli_args, parse_global_options, CliError};

#[cfg(test)]
mod tests;
