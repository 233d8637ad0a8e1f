#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use super::parser::CliError;

pub const VALID_COMMANDS: &[&str] = &[
    "help",
    "init-db",
    "wallet",
    "credit",
    "debit",
    "record-usage",
    "check-balance",
    "usage",
    "audit",
    "register-agent",
    "apply-event",
];

const GLOBAL_FLAGS: &[&str] = &["--config", "--database-url", "--output"];

/// Flags a command accepts, globals included. `None` for unknown commands.
#[must_use]
pub fn allowed_flags(command: &str) -> Option<Vec<&'static str>> {
    let specific: &[&'static str] = match command {
        "help" | "?" => &[],
        "init-db" => &["--schema"],
        "wallet" | "check-balance" | "audit" => &["--user-id"],
        "credit" => &[
            "--user-id",
            "--amount",
            "--type",
            "--payment-reference",
            "--description",
        ],
        "debit" => &["--user-id", "--amount", "--call-id", "--description"],
        "record-usage" => &["--user-id", "--call-id", "--duration-seconds"],
        "usage" => &["--user-id", "--period", "--limit"],
        "register-agent" => &["--agent-id", "--user-id", "--name", "--status"],
        "apply-event" => &["--file"],
        _ => return None,
    };

    Some(specific.iter().chain(GLOBAL_FLAGS).copied().collect())
}

/// # Errors
/// Returns `CliError::UnknownCommand` if an unknown flag is found.
pub fn ensure_no_unknown_flags(args: &[String], allowed_flags: &[&str]) -> Result<(), CliError> {
    let invalid = args
        .iter()
        .skip(1)
        .find(|arg| {
            arg.starts_with("--")
                && !matches!(arg.as_str(), "--help" | "-h")
                && !allowed_flags.iter().any(|allowed| allowed == &arg.as_str())
        })
        .cloned();

    invalid.map_or(Ok(()), |flag| Err(CliError::UnknownCommand { cmd: flag }))
}

#[must_use]
pub fn suggest_commands(typo: &str) -> Vec<String> {
    VALID_COMMANDS
        .iter()
        .map(|cmd| (cmd, strsim::levenshtein(typo, cmd)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(cmd, _)| vec![cmd.to_string()])
        .unwrap_or_default()
}
