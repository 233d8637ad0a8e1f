use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
pub(crate) struct WalletRow {
    pub(crate) id: Uuid,
    pub(crate) user_id: String,
    pub(crate) balance: Decimal,
    pub(crate) low_balance_threshold: Decimal,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub(crate) struct TransactionRow {
    pub(crate) id: i64,
    pub(crate) wallet_id: Uuid,
    pub(crate) transaction_type: String,
    pub(crate) amount: Decimal,
    pub(crate) balance_after: Decimal,
    pub(crate) description: String,
    pub(crate) payment_reference: Option<String>,
    pub(crate) call_id: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub(crate) struct UsageRow {
    pub(crate) id: i64,
    pub(crate) user_id: String,
    pub(crate) call_id: String,
    pub(crate) minutes: Decimal,
    pub(crate) cost_rate: Decimal,
    pub(crate) total_cost: Decimal,
    pub(crate) base_cost: Decimal,
    pub(crate) margin: Decimal,
    pub(crate) transaction_id: Option<i64>,
    pub(crate) created_at: DateTime<Utc>,
}

#[derive(FromRow)]
pub(crate) struct UsageTotalsRow {
    pub(crate) total_minutes: Decimal,
    pub(crate) total_cost: Decimal,
    pub(crate) total_margin: Decimal,
    pub(crate) call_count: i64,
}

#[derive(FromRow)]
pub(crate) struct DailyUsageRow {
    pub(crate) day: NaiveDate,
    pub(crate) minutes: Decimal,
    pub(crate) total_cost: Decimal,
    pub(crate) call_count: i64,
}

#[derive(FromRow)]
pub(crate) struct AuditRow {
    pub(crate) balance: Decimal,
    pub(crate) ledger_sum: Decimal,
    pub(crate) last_balance_after: Option<Decimal>,
    pub(crate) transaction_count: i64,
}

pub(crate) const WALLET_COLUMNS: &str =
    "id, user_id, balance, low_balance_threshold, created_at, updated_at";

pub(crate) const TRANSACTION_COLUMNS: &str = "id, wallet_id, transaction_type, amount, \
     balance_after, description, payment_reference, call_id, created_at";

pub(crate) const USAGE_COLUMNS: &str = "id, user_id, call_id, minutes, cost_rate, total_cost, \
     base_cost, margin, transaction_id, created_at";
