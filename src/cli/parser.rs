#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use super::action::{CliAction, GlobalOptions};
use super::args::{allowed_flags, ensure_no_unknown_flags};
use super::commands::CliCommand;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CliError {
    #[error("Missing required argument: {}", arg)]
    MissingRequiredArg { arg: String },
    #[error("Unknown command: {}", cmd)]
    UnknownCommand { cmd: String },
    #[error("Invalid type for {}", arg)]
    InvalidArgType { arg: String },
    #[error("Invalid argument value for {}: {}", arg, error)]
    InvalidArgValue { arg: String, error: String },
}

/// Parses `args` (program name already stripped) into an action.
///
/// # Errors
/// Returns a `CliError` for unknown commands or flags and for missing or
/// malformed arguments.
pub fn parse_cli_args(args: &[String]) -> Result<CliAction, CliError> {
    if args
        .get(1)
        .is_some_and(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        return Ok(CliAction::ShowHelp);
    }

    let Some(command) = args.first().map(String::as_str) else {
        return Ok(CliAction::ShowHelp);
    };

    if let Some(flags) = allowed_flags(command) {
        ensure_no_unknown_flags(args, &flags)?;
    }

    match command {
        "-h" | "--help" => Ok(CliAction::ShowHelp),
        "-v" | "--version" => Ok(CliAction::ShowVersion),
        "?" | "help" => Ok(CliAction::Command(CliCommand::Help)),
        "init-db" => Ok(CliAction::Command(CliCommand::InitDb {
            schema: parse_optional_arg(args, "schema")?,
        })),
        "wallet" => Ok(CliAction::Command(CliCommand::Wallet {
            user_id: parse_required_arg(args, "user_id")?,
        })),
        "credit" => {
            let user_id = parse_required_arg(args, "user_id")?;
            let amount = parse_required_arg(args, "amount")?;
            let kind = parse_optional_arg(args, "type")?;
            let payment_reference = parse_optional_arg(args, "payment_reference")?;
            let description = parse_optional_arg(args, "description")?;
            Ok(CliAction::Command(CliCommand::Credit {
                user_id,
                amount,
                kind,
                payment_reference,
                description,
            }))
        }
        "debit" => {
            let user_id = parse_required_arg(args, "user_id")?;
            let amount = parse_required_arg(args, "amount")?;
            let call_id = parse_optional_arg(args, "call_id")?;
            let description = parse_optional_arg(args, "description")?;
            Ok(CliAction::Command(CliCommand::Debit {
                user_id,
                amount,
                call_id,
                description,
            }))
        }
        "record-usage" => {
            let user_id = parse_required_arg(args, "user_id")?;
            let call_id = parse_required_arg(args, "call_id")?;
            let duration_seconds = parse_required_arg(args, "duration_seconds")?;
            Ok(CliAction::Command(CliCommand::RecordUsage {
                user_id,
                call_id,
                duration_seconds,
            }))
        }
        "check-balance" => Ok(CliAction::Command(CliCommand::CheckBalance {
            user_id: parse_required_arg(args, "user_id")?,
        })),
        "usage" => {
            let user_id = parse_required_arg(args, "user_id")?;
            let period = parse_optional_arg(args, "period")?;
            let limit = parse_optional_arg(args, "limit")?;
            Ok(CliAction::Command(CliCommand::Usage {
                user_id,
                period,
                limit,
            }))
        }
        "audit" => Ok(CliAction::Command(CliCommand::Audit {
            user_id: parse_required_arg(args, "user_id")?,
        })),
        "register-agent" => {
            let agent_id = parse_required_arg(args, "agent_id")?;
            let user_id = parse_required_arg(args, "user_id")?;
            let name = parse_optional_arg(args, "name")?;
            let status = parse_optional_arg(args, "status")?;
            Ok(CliAction::Command(CliCommand::RegisterAgent {
                agent_id,
                user_id,
                name,
                status,
            }))
        }
        "apply-event" => Ok(CliAction::Command(CliCommand::ApplyEvent {
            file: parse_required_arg(args, "file")?,
        })),
        cmd => Err(CliError::UnknownCommand {
            cmd: cmd.to_string(),
        }),
    }
}

/// # Errors
/// Returns `InvalidArgValue` for an unsupported `--output` format.
pub fn parse_global_options(args: &[String]) -> Result<GlobalOptions, CliError> {
    Ok(GlobalOptions {
        config: parse_optional_arg(args, "config")?,
        database_url: parse_optional_arg(args, "database_url")?,
        output: parse_optional_arg(args, "output")?.unwrap_or_default(),
    })
}

fn parse_required_arg<T>(args: &[String], name: &str) -> Result<T, CliError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let flag = format!("--{}", name.replace('_', "-"));
    let Some(position) = args.iter().position(|a| a.as_str() == flag) else {
        return Err(CliError::MissingRequiredArg {
            arg: name.to_string(),
        });
    };

    let Some(raw_value) = args.get(position + 1) else {
        return Err(CliError::MissingRequiredArg {
            arg: name.to_string(),
        });
    };

    if raw_value.starts_with("--") {
        return Err(CliError::MissingRequiredArg {
            arg: name.to_string(),
        });
    }

    raw_value
        .parse::<T>()
        .map_err(|_| CliError::InvalidArgType {
            arg: name.to_string(),
        })
}

fn parse_optional_arg<T>(args: &[String], name: &str) -> Result<Option<T>, CliError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let flag = format!("--{}", name.replace('_', "-"));
    let position = args.iter().position(|a| a.as_str() == flag);

    match position {
        None => Ok(None),
        Some(i) => args
            .get(i + 1)
            .filter(|v| !v.starts_with("--"))
            .map_or_else(
                || {
                    Err(CliError::MissingRequiredArg {
                        arg: name.to_string(),
                    })
                },
                |v| {
                    v.parse::<T>()
                        .map(Some)
                        .map_err(|e| CliError::InvalidArgValue {
                            arg: name.to_string(),
                            error: format!("{e}"),
                        })
                },
            ),
    }
}
