use crate::cli::{CliCommand, GlobalOptions, VALID_COMMANDS};
use crate::output::emit_output;
use itertools::Itertools;
use ledger::config::{database_url_candidates, load_config, mask_database_url, LedgerConfig};
use ledger::ledger_service::{
    BillingEvent, BillingOutcome, BillingService, CallCompletion, LedgerRequest, ManualCredit,
    PaymentConfirmation, UsageOutcome,
};
use ledger::{
    AgentId, AgentStatus, CallId, CorrelationKey, LedgerDb, LedgerError, LedgerService,
    PaymentReference, Result, TransactionType, UserId,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, warn};

const CONNECT_TIMEOUT_MS: u64 = 3_000;
const MANUAL_DEBIT_DESCRIPTION: &str = "Manual debit";

pub async fn dispatch(command: CliCommand, options: &GlobalOptions) -> Result<()> {
    let name = command.name();
    if matches!(command, CliCommand::Help) {
        emit_output(options.output, name, &help_payload());
        return Ok(());
    }

    let config = load_config(options.config.clone()).await?;
    let db = connect(options, &config).await?;

    if let CliCommand::InitDb { schema } = &command {
        return init_db(&db, schema.as_deref(), options).await;
    }
    if let CliCommand::RegisterAgent {
        agent_id,
        user_id,
        name: agent_name,
        status,
    } = &command
    {
        return register_agent(&db, agent_id, user_id, agent_name.as_deref(), *status, options)
            .await;
    }

    let billing = BillingService::new(LedgerService::new(db, config.settings));
    let payload = run_ledger_command(&billing, command).await?;
    emit_output(options.output, name, &payload);
    Ok(())
}

#[must_use]
pub fn help_payload() -> Value {
    json!({
        "message": format!(
            "ledger <command> [--output text|json] [--config PATH] [--database-url URL]\ncommands: {}",
            VALID_COMMANDS.iter().join(", ")
        ),
        "commands": VALID_COMMANDS,
    })
}

#[must_use]
pub fn version_payload() -> Value {
    let version = env!("CARGO_PKG_VERSION");
    json!({
        "message": format!("ledger {version}"),
        "name": "ledger",
        "version": version,
    })
}

async fn connect(options: &GlobalOptions, config: &LedgerConfig) -> Result<LedgerDb> {
    let candidates = options
        .database_url
        .clone()
        .map_or_else(|| database_url_candidates(config), |url| vec![url]);

    let mut last_error = None;
    for url in candidates {
        match LedgerDb::new_with_timeout(&url, CONNECT_TIMEOUT_MS).await {
            Ok(db) => {
                debug!(database_url = %mask_database_url(&url), "database candidate connected");
                return Ok(db);
            }
            Err(error) => {
                warn!(
                    database_url = %mask_database_url(&url),
                    error = %error,
                    "database candidate unavailable"
                );
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        LedgerError::ConfigError("no database URL candidates configured".to_string())
    }))
}

async fn init_db(db: &LedgerDb, schema: Option<&Path>, options: &GlobalOptions) -> Result<()> {
    match schema {
        Some(path) => {
            let sql = tokio::fs::read_to_string(path).await?;
            db.initialize_schema_from_sql(&sql).await?;
        }
        None => db.initialize_schema().await?,
    }

    emit_output(
        options.output,
        "init-db",
        &json!({
            "message": "Ledger schema initialized",
            "schema": schema.map_or_else(|| "built-in".to_string(), |p| p.display().to_string()),
        }),
    );
    Ok(())
}

async fn register_agent(
    db: &LedgerDb,
    agent_id: &str,
    user_id: &str,
    name: Option<&str>,
    status: Option<AgentStatus>,
    options: &GlobalOptions,
) -> Result<()> {
    let agent_id = AgentId::new(agent_id);
    let user_id = UserId::parse(user_id)?;
    let status = status.unwrap_or(AgentStatus::Active);
    let name = name.unwrap_or_else(|| agent_id.value());

    db.register_agent(&agent_id, &user_id, name, status).await?;
    emit_output(
        options.output,
        "register-agent",
        &json!({
            "message": format!("Agent {agent_id} registered for {user_id} as {status}"),
            "agentId": agent_id,
            "userId": user_id,
            "status": status,
        }),
    );
    Ok(())
}

async fn run_ledger_command(billing: &BillingService<LedgerDb>, command: CliCommand) -> Result<Value> {
    let ledger = billing.ledger();
    match command {
        CliCommand::Wallet { user_id } => {
            let snapshot = ledger.wallet_snapshot(&UserId::parse(&user_id)?).await?;
            let message = format!(
                "Balance for {}: ${}{}",
                snapshot.wallet.user_id,
                snapshot.wallet.balance,
                if snapshot.low_balance { " (low)" } else { "" }
            );
            with_message(serde_json::to_value(&snapshot)?, message)
        }
        CliCommand::Credit {
            user_id,
            amount,
            kind,
            payment_reference,
            description,
        } => {
            let event = credit_event(user_id, amount, kind, payment_reference, description)?;
            outcome_payload(billing.handle(&event).await?)
        }
        CliCommand::Debit {
            user_id,
            amount,
            call_id,
            description,
        } => {
            let mut request = LedgerRequest::new(
                UserId::parse(&user_id)?,
                amount,
                TransactionType::UsageDeduction,
                description.unwrap_or_else(|| MANUAL_DEBIT_DESCRIPTION.to_string()),
            );
            if let Some(call_id) = call_id {
                request = request.with_correlation(CorrelationKey::Call(CallId::parse(&call_id)?));
            }
            let receipt = ledger.debit(request).await?;
            let message = format!(
                "Debited {} from {}; balance ${}",
                -receipt.transaction.amount,
                receipt.wallet.user_id,
                receipt.wallet.balance
            );
            with_message(serde_json::to_value(&receipt)?, message)
        }
        CliCommand::RecordUsage {
            user_id,
            call_id,
            duration_seconds,
        } => {
            let event = BillingEvent::CallCompleted(CallCompletion {
                user_id: UserId::parse(&user_id)?,
                call_id: CallId::parse(&call_id)?,
                duration_seconds,
            });
            match billing.handle(&event).await? {
                BillingOutcome::Metered(outcome) => {
                    outcome_payload(BillingOutcome::Metered(outcome.into_result()?))
                }
                other => outcome_payload(other),
            }
        }
        CliCommand::CheckBalance { user_id } => {
            let check = ledger.check_balance(&UserId::parse(&user_id)?).await?;
            let message = if check.has_balance {
                format!("Balance ${} covers the ${} minimum", check.balance, check.minimum_required)
            } else {
                format!("Balance ${} is short by ${}", check.balance, check.shortfall)
            };
            with_message(serde_json::to_value(check)?, message)
        }
        CliCommand::Usage {
            user_id,
            period,
            limit,
        } => {
            let history = ledger
                .usage_history(&UserId::parse(&user_id)?, period.unwrap_or_default(), limit)
                .await?;
            let message = format!(
                "{} calls, {} minutes, ${} over {}",
                history.stats.call_count,
                history.stats.total_minutes,
                history.stats.total_cost,
                history.period.as_str()
            );
            with_message(serde_json::to_value(&history)?, message)
        }
        CliCommand::Audit { user_id } => {
            let audit = ledger.audit(&UserId::parse(&user_id)?).await?;
            let message = if audit.is_consistent() {
                format!("Wallet {} consistent at ${}", audit.user_id, audit.balance)
            } else {
                format!(
                    "Wallet {} drifted: balance ${}, ledger sum ${}",
                    audit.user_id, audit.balance, audit.ledger_sum
                )
            };
            let mut payload = serde_json::to_value(&audit)?;
            if let Value::Object(map) = &mut payload {
                map.insert("consistent".to_string(), json!(audit.is_consistent()));
            }
            with_message(payload, message)
        }
        CliCommand::ApplyEvent { file } => {
            let raw = tokio::fs::read_to_string(&file).await?;
            let payload: Value = serde_json::from_str(&raw)?;
            let outcome = if payload.get("event").is_some() {
                let event: BillingEvent = serde_json::from_value(payload)?;
                billing.handle(&event).await?
            } else {
                billing.handle_webhook(&payload).await?
            };
            outcome_payload(outcome)
        }
        CliCommand::Help | CliCommand::InitDb { .. } | CliCommand::RegisterAgent { .. } => Err(
            LedgerError::Internal(format!("{} is not a ledger command", command.name())),
        ),
    }
}

/// Builds the billing event for `credit`. A payment reference makes the
/// credit an idempotent top-up; otherwise it is a manual credit.
fn credit_event(
    user_id: String,
    amount: Decimal,
    kind: Option<TransactionType>,
    payment_reference: Option<String>,
    description: Option<String>,
) -> Result<BillingEvent> {
    let user_id = UserId::parse(&user_id)?;
    match payment_reference {
        Some(reference) => {
            if kind.is_some_and(|kind| kind != TransactionType::TopUp) {
                return Err(LedgerError::InvalidInput(
                    "--payment-reference only applies to top_up credits".to_string(),
                ));
            }
            Ok(BillingEvent::PaymentConfirmed(PaymentConfirmation {
                user_id,
                amount_dollars: amount,
                payment_reference: PaymentReference::parse(&reference)?,
            }))
        }
        None => Ok(BillingEvent::ManualCredit(ManualCredit {
            user_id,
            amount_dollars: amount,
            kind: kind.unwrap_or(TransactionType::TopUp),
            description,
        })),
    }
}

fn outcome_payload(outcome: BillingOutcome) -> Result<Value> {
    let message = match &outcome {
        BillingOutcome::Credited(receipt) => format!(
            "Credited {} to {}{}; balance ${}",
            receipt.transaction.amount,
            receipt.wallet.user_id,
            if receipt.replayed { " (already applied)" } else { "" },
            receipt.wallet.balance
        ),
        BillingOutcome::Metered(UsageOutcome::Charged {
            usage,
            wallet,
            low_balance,
            ..
        }) => format!(
            "Charged ${} for {} minutes on call {}; balance ${}{}",
            usage.total_cost,
            usage.minutes,
            usage.call_id,
            wallet.balance,
            if *low_balance { " (low)" } else { "" }
        ),
        BillingOutcome::Metered(UsageOutcome::Unpaid { usage, shortfall }) => format!(
            "Recorded call {} unpaid; short by ${}",
            usage.call_id, shortfall.shortfall
        ),
        BillingOutcome::Metered(UsageOutcome::NoWallet { usage }) => {
            format!("Recorded call {} for a user without a wallet", usage.call_id)
        }
        BillingOutcome::Metered(UsageOutcome::NoCharge { charge }) => {
            format!("Call {} had no billable duration", charge.call_id)
        }
        BillingOutcome::Ignored { reason } => format!("Ignored: {reason}"),
    };
    with_message(serde_json::to_value(&outcome)?, message)
}

fn with_message(mut payload: Value, message: String) -> Result<Value> {
    match &mut payload {
        Value::Object(map) => {
            map.insert("message".to_string(), Value::String(message));
            Ok(payload)
        }
        _ => Ok(json!({ "message": message, "result": payload })),
    }
}
