use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::mappers::{transaction_from_row, usage_from_row, wallet_from_row};
use crate::db::read_ops::{
    TransactionRow, UsageRow, WalletRow, TRANSACTION_COLUMNS, USAGE_COLUMNS, WALLET_COLUMNS,
};
use crate::error::{LedgerError, Result};
use crate::ledger_service::SettlementRequest;
use crate::types::{CallId, CorrelationKey, LedgerEntry, PaymentReference, Transaction, UsageRecord, UserId, Wallet};

/// Row-locks the wallet until the surrounding transaction ends.
pub(super) async fn lock_wallet(conn: &mut PgConnection, user_id: &UserId) -> Result<Option<Wallet>> {
    sqlx::query_as::<_, WalletRow>(&format!(
        "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1 FOR UPDATE"
    ))
    .bind(user_id.value())
    .fetch_optional(&mut *conn)
    .await
    .map(|row| row.map(wallet_from_row))
    .map_err(|e| LedgerError::from_db("Failed to lock wallet", &e))
}

/// `None` when a correlation index already holds the key.
pub(super) async fn insert_transaction(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    entry: &LedgerEntry,
    balance_after: Decimal,
) -> Result<Option<Transaction>> {
    let payment_reference = entry
        .correlation
        .as_ref()
        .and_then(CorrelationKey::payment_reference)
        .map(PaymentReference::value);
    let call_id = entry
        .correlation
        .as_ref()
        .and_then(CorrelationKey::call_id)
        .map(CallId::value);

    sqlx::query_as::<_, TransactionRow>(&format!(
        "INSERT INTO wallet_transactions
             (wallet_id, transaction_type, amount, balance_after, description, payment_reference, call_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT DO NOTHING
         RETURNING {TRANSACTION_COLUMNS}"
    ))
    .bind(wallet_id)
    .bind(entry.transaction_type.as_str())
    .bind(entry.amount)
    .bind(balance_after)
    .bind(entry.description.as_str())
    .bind(payment_reference)
    .bind(call_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| LedgerError::from_db("Failed to append transaction", &e))?
    .map(transaction_from_row)
    .transpose()
}

pub(super) async fn store_balance(
    conn: &mut PgConnection,
    wallet_id: Uuid,
    balance: Decimal,
) -> Result<Wallet> {
    sqlx::query_as::<_, WalletRow>(&format!(
        "UPDATE wallets SET balance = $1, updated_at = NOW() WHERE id = $2
         RETURNING {WALLET_COLUMNS}"
    ))
    .bind(balance)
    .bind(wallet_id)
    .fetch_one(&mut *conn)
    .await
    .map(wallet_from_row)
    .map_err(|e| LedgerError::from_db("Failed to update wallet balance", &e))
}

/// `None` when the call was already metered.
pub(super) async fn insert_usage(
    conn: &mut PgConnection,
    request: &SettlementRequest,
    transaction_id: Option<i64>,
) -> Result<Option<UsageRecord>> {
    let charge = &request.charge;
    sqlx::query_as::<_, UsageRow>(&format!(
        "INSERT INTO voice_usage
             (user_id, call_id, minutes, cost_rate, total_cost, base_cost, margin, transaction_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (call_id) DO NOTHING
         RETURNING {USAGE_COLUMNS}"
    ))
    .bind(request.user_id.value())
    .bind(charge.call_id.value())
    .bind(charge.minutes)
    .bind(charge.cost_rate)
    .bind(charge.total_cost)
    .bind(charge.base_cost)
    .bind(charge.margin)
    .bind(transaction_id)
    .fetch_optional(&mut *conn)
    .await
    .map(|row| row.map(usage_from_row))
    .map_err(|e| LedgerError::from_db("Failed to record usage", &e))
}

pub(super) fn foreign_correlation(key: &CorrelationKey) -> LedgerError {
    LedgerError::InvalidInput(format!("{key} is already recorded on another wallet"))
}

pub(super) fn unreadable_conflict(key: &CorrelationKey) -> LedgerError {
    LedgerError::StorageConflict(format!("{key} conflicted but could not be read back"))
}
