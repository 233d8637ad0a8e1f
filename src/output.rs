use crate::cli::{CliError, OutputFormat};
use ledger::error::{code, get_error_info};
use ledger::LedgerError;
use serde_json::json;

/// Exit status for malformed invocations.
pub const USAGE_EXIT_CODE: i32 = 64;

/// A command failure as reported to the shell.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error(transparent)]
    Usage(#[from] CliError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl Failure {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Usage(_) => code::CLI_ERROR,
            Self::Ledger(error) => error.code(),
        }
    }

    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => USAGE_EXIT_CODE,
            Self::Ledger(error) => error.exit_code(),
        }
    }
}

pub fn render_output(output: OutputFormat, command: &str, payload: &serde_json::Value) -> String {
    match output {
        OutputFormat::Text => payload
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map_or_else(|| payload.to_string(), ToString::to_string),
        OutputFormat::Json => json!({
            "command": command,
            "status": "ok",
            "payload": payload,
        })
        .to_string(),
    }
}

pub fn emit_output(output: OutputFormat, command: &str, payload: &serde_json::Value) {
    println!("{}", render_output(output, command, payload));
}

pub fn render_failure(command: &str, failure: &Failure, suggestions: &[String]) -> String {
    let error_code = failure.code();
    let fix = get_error_info(error_code).map(|(_, fix)| fix);
    json!({
        "command": command,
        "status": "error",
        "code": error_code,
        "message": failure.to_string(),
        "fix": fix,
        "suggestions": suggestions,
    })
    .to_string()
}

pub fn emit_failure(command: &str, failure: &Failure, suggestions: &[String]) {
    eprintln!("{}", render_failure(command, failure, suggestions));
}
