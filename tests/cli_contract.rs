use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

fn parse_json_stdout(output: &[u8]) -> Result<Value, String> {
    let raw = String::from_utf8_lossy(output).trim().to_string();
    serde_json::from_str::<Value>(&raw).map_err(|err| {
        format!(
            "Given CLI JSON output, When parsed, Then parsing should succeed: {err}. Raw: {raw}"
        )
    })
}

fn ledger_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("ledger"))
}

#[test]
fn given_version_flag_when_invoked_then_name_and_version_are_reported() -> Result<(), String> {
    let assert = ledger_cmd()
        .args(["--version", "--output", "json"])
        .assert()
        .success();

    let json = parse_json_stdout(&assert.get_output().stdout)?;
    if json["payload"]["name"] != Value::String("ledger".to_string()) {
        return Err(format!(
            "Given --version, When command executes, Then name should be ledger. Got: {json}"
        ));
    }
    if !json["payload"]["version"].is_string() {
        return Err(format!(
            "Given --version, When command executes, Then version should be present. Got: {json}"
        ));
    }
    Ok(())
}

#[test]
fn given_help_command_when_invoked_then_commands_are_listed() {
    ledger_cmd()
        .args(["help"])
        .assert()
        .success()
        .stdout(contains("record-usage"))
        .stdout(contains("apply-event"));
}

#[test]
fn given_misspelled_command_when_invoked_then_closest_command_is_suggested(
) -> Result<(), String> {
    let assert = ledger_cmd().args(["walet"]).assert().failure().code(64);
    let raw = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    let json = raw
        .lines()
        .rev()
        .find_map(|line| serde_json::from_str::<Value>(line).ok())
        .ok_or_else(|| format!("Given a typo, Then stderr should carry a JSON error. Got: {raw}"))?;

    if json["code"] != Value::String("CLI_ERROR".to_string()) {
        return Err(format!("expected CLI_ERROR code, got {json}"));
    }
    if json["suggestions"][0] != Value::String("wallet".to_string()) {
        return Err(format!("expected wallet suggestion, got {json}"));
    }
    Ok(())
}

#[test]
fn given_credit_without_amount_when_invoked_then_missing_required_argument_is_reported() {
    ledger_cmd()
        .args(["credit", "--user-id", "user-1"])
        .assert()
        .failure()
        .code(64)
        .stderr(contains("Missing required argument: amount"));
}

#[test]
fn given_flag_of_another_command_when_invoked_then_it_is_rejected() {
    ledger_cmd()
        .args(["wallet", "--user-id", "user-1", "--duration-seconds", "10"])
        .assert()
        .failure()
        .stderr(contains("Unknown command: --duration-seconds"));
}
