#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod bdd_tests {
    use crate::cli::{
        parse_cli_args, parse_global_options, suggest_commands, CliAction, CliCommand, CliError,
        OutputFormat,
    };
    use ledger::{AgentStatus, TransactionType, UsagePeriod};
    use rust_decimal_macros::dec;

    fn given_cli_args(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn when_no_args_then_show_help() {
        let args = given_cli_args(&[]);
        let action = parse_cli_args(&args).expect("parse");

        assert!(matches!(action, CliAction::ShowHelp));
    }

    #[test]
    fn when_version_flag_then_show_version() {
        let args = given_cli_args(&["--version"]);
        let action = parse_cli_args(&args).expect("parse");

        assert!(matches!(action, CliAction::ShowVersion));
    }

    #[test]
    fn when_command_followed_by_help_then_show_help() {
        let args = given_cli_args(&["credit", "--help"]);
        let action = parse_cli_args(&args).expect("parse");

        assert!(matches!(action, CliAction::ShowHelp));
    }

    #[test]
    fn when_credit_with_reference_then_credit_action_with_decimal_amount() {
        let args = given_cli_args(&[
            "credit",
            "--user-id",
            "user-1",
            "--amount",
            "10.50",
            "--payment-reference",
            "pi_123",
        ]);
        let action = parse_cli_args(&args).expect("parse");

        match action {
            CliAction::Command(CliCommand::Credit {
                user_id,
                amount,
                kind,
                payment_reference,
                description,
            }) => {
                assert_eq!(user_id, "user-1");
                assert_eq!(amount, dec!(10.50));
                assert_eq!(kind, None);
                assert_eq!(payment_reference.as_deref(), Some("pi_123"));
                assert_eq!(description, None);
            }
            other => panic!("Expected Credit command, got {other:?}"),
        }
    }

    #[test]
    fn when_credit_with_refund_type_then_kind_is_parsed() {
        let args = given_cli_args(&[
            "credit", "--user-id", "u", "--amount", "1", "--type", "refund",
        ]);
        let action = parse_cli_args(&args).expect("parse");

        assert!(matches!(
            action,
            CliAction::Command(CliCommand::Credit {
                kind: Some(TransactionType::Refund),
                ..
            })
        ));
    }

    #[test]
    fn when_record_usage_then_duration_is_parsed_as_seconds() {
        let args = given_cli_args(&[
            "record-usage",
            "--user-id",
            "u",
            "--call-id",
            "call-9",
            "--duration-seconds",
            "120",
        ]);
        let action = parse_cli_args(&args).expect("parse");

        match action {
            CliAction::Command(CliCommand::RecordUsage {
                call_id,
                duration_seconds,
                ..
            }) => {
                assert_eq!(call_id, "call-9");
                assert_eq!(duration_seconds, 120);
            }
            other => panic!("Expected RecordUsage command, got {other:?}"),
        }
    }

    #[test]
    fn when_usage_with_period_then_period_is_parsed() {
        let args = given_cli_args(&["usage", "--user-id", "u", "--period", "week"]);
        let action = parse_cli_args(&args).expect("parse");

        assert!(matches!(
            action,
            CliAction::Command(CliCommand::Usage {
                period: Some(UsagePeriod::Week),
                limit: None,
                ..
            })
        ));
    }

    #[test]
    fn when_register_agent_with_status_then_status_is_parsed() {
        let args = given_cli_args(&[
            "register-agent",
            "--agent-id",
            "agent-1",
            "--user-id",
            "u",
            "--status",
            "paused_no_balance",
        ]);
        let action = parse_cli_args(&args).expect("parse");

        assert!(matches!(
            action,
            CliAction::Command(CliCommand::RegisterAgent {
                status: Some(AgentStatus::PausedNoBalance),
                ..
            })
        ));
    }

    #[test]
    fn given_missing_user_id_when_parsing_wallet_then_missing_required_arg() {
        let args = given_cli_args(&["wallet"]);
        let err = parse_cli_args(&args).unwrap_err();

        assert!(matches!(err, CliError::MissingRequiredArg { ref arg } if arg == "user_id"));
    }

    #[test]
    fn given_flag_without_value_when_parsing_then_missing_required_arg() {
        let args = given_cli_args(&["wallet", "--user-id", "--output", "json"]);
        let err = parse_cli_args(&args).unwrap_err();

        assert!(matches!(err, CliError::MissingRequiredArg { .. }));
    }

    #[test]
    fn given_non_numeric_amount_when_parsing_debit_then_invalid_arg_type() {
        let args = given_cli_args(&["debit", "--user-id", "u", "--amount", "ten"]);
        let err = parse_cli_args(&args).unwrap_err();

        assert!(matches!(err, CliError::InvalidArgType { ref arg } if arg == "amount"));
    }

    #[test]
    fn given_unknown_period_when_parsing_usage_then_invalid_arg_value() {
        let args = given_cli_args(&["usage", "--user-id", "u", "--period", "year"]);
        let err = parse_cli_args(&args).unwrap_err();

        assert!(matches!(err, CliError::InvalidArgValue { ref arg, .. } if arg == "period"));
    }

    #[test]
    fn given_flag_of_another_command_when_parsing_then_unknown_flag_is_rejected() {
        let args = given_cli_args(&["wallet", "--user-id", "u", "--amount", "5"]);
        let err = parse_cli_args(&args).unwrap_err();

        assert!(matches!(err, CliError::UnknownCommand { ref cmd } if cmd == "--amount"));
    }

    #[test]
    fn given_unknown_command_when_parsing_then_unknown_command_error() {
        let args = given_cli_args(&["refill"]);
        let err = parse_cli_args(&args).unwrap_err();

        assert!(matches!(err, CliError::UnknownCommand { ref cmd } if cmd == "refill"));
    }

    #[test]
    fn given_typo_when_suggesting_then_closest_command_is_returned() {
        assert_eq!(suggest_commands("walet"), vec!["wallet".to_string()]);
        assert_eq!(suggest_commands("credt"), vec!["credit".to_string()]);
        assert!(suggest_commands("xxxxxxxxxxxx").is_empty());
    }

    #[test]
    fn given_global_flags_when_parsed_then_options_are_collected() {
        let args = given_cli_args(&[
            "wallet",
            "--user-id",
            "u",
            "--output",
            "json",
            "--database-url",
            "postgres://localhost/ledger",
        ]);
        let options = parse_global_options(&args).expect("options");

        assert_eq!(options.output, OutputFormat::Json);
        assert_eq!(
            options.database_url.as_deref(),
            Some("postgres://localhost/ledger")
        );
        assert_eq!(options.config, None);
    }

    #[test]
    fn given_no_output_flag_when_parsed_then_text_is_default() {
        let args = given_cli_args(&["audit", "--user-id", "u"]);
        let options = parse_global_options(&args).expect("options");

        assert_eq!(options.output, OutputFormat::Text);
    }

    #[test]
    fn given_unsupported_output_when_parsed_then_invalid_arg_value() {
        let args = given_cli_args(&["audit", "--user-id", "u", "--output", "yaml"]);

        assert!(matches!(
            parse_global_options(&args),
            Err(CliError::InvalidArgValue { .. })
        ));
    }
}
