#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

mod cli;
mod commands;
mod output;

use cli::{parse_cli_args, parse_global_options, suggest_commands, CliAction, CliError};
use output::{emit_failure, emit_output, Failure};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(Level::INFO.as_str()))
                .add_directive("sqlx=warn".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().cloned().unwrap_or_else(|| "help".to_string());

    if let Err(failure) = run(&args).await {
        let suggestions = match &failure {
            Failure::Usage(CliError::UnknownCommand { cmd }) if !cmd.starts_with("--") => {
                suggest_commands(cmd)
            }
            _ => Vec::new(),
        };
        emit_failure(&command, &failure, &suggestions);
        std::process::exit(failure.exit_code());
    }
    Ok(())
}

async fn run(args: &[String]) -> Result<(), Failure> {
    let options = parse_global_options(args)?;
    match parse_cli_args(args)? {
        CliAction::ShowHelp => {
            emit_output(options.output, "help", &commands::help_payload());
            Ok(())
        }
        CliAction::ShowVersion => {
            emit_output(options.output, "version", &commands::version_payload());
            Ok(())
        }
        CliAction::Command(command) => commands::dispatch(command, &options)
            .await
            .or_else(|error| {
                if error.is_benign() {
                    tracing::info!(error = %error, "duplicate delivery ignored");
                    Ok(())
                } else {
                    Err(Failure::from(error))
                }
            }),
    }
}
