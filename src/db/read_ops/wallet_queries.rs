use crate::db::mappers::{audit_from_row, transaction_from_row, wallet_from_row};
use crate::db::LedgerDb;
use crate::error::{LedgerError, Result};
use crate::types::{
    AgentId, AgentStatus, CorrelationKey, Transaction, TransactionType, UserId, Wallet,
    WalletAudit,
};
use sqlx::PgExecutor;

use super::types::{AuditRow, TransactionRow, WalletRow, TRANSACTION_COLUMNS, WALLET_COLUMNS};

/// Payment references match on any type; call references only within `kind`.
pub(crate) async fn find_correlated<'e, E>(
    executor: E,
    key: &CorrelationKey,
    kind: TransactionType,
) -> Result<Option<Transaction>>
where
    E: PgExecutor<'e>,
{
    let (filter, value, kind_filter) = match key {
        CorrelationKey::Payment(reference) => ("payment_reference = $1", reference.value(), None),
        CorrelationKey::Call(call_id) => (
            "call_id = $1 AND transaction_type = $2",
            call_id.value(),
            Some(kind.as_str()),
        ),
    };
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions WHERE {filter}");

    let mut query = sqlx::query_as::<_, TransactionRow>(&sql).bind(value);
    if let Some(kind) = kind_filter {
        query = query.bind(kind);
    }
    query
        .fetch_optional(executor)
        .await
        .map_err(|e| LedgerError::from_db("Failed to look up correlated transaction", &e))?
        .map(transaction_from_row)
        .transpose()
}

impl LedgerDb {
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn load_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        sqlx::query_as::<_, WalletRow>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1"
        ))
        .bind(user_id.value())
        .fetch_optional(self.pool())
        .await
        .map(|row| row.map(wallet_from_row))
        .map_err(|e| LedgerError::from_db("Failed to load wallet", &e))
    }

    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn transaction_by_correlation(
        &self,
        key: &CorrelationKey,
        kind: TransactionType,
    ) -> Result<Option<Transaction>> {
        find_correlated(self.pool(), key, kind).await
    }

    /// # Errors
    /// Returns an error if the query fails or a row holds an unknown transaction type.
    pub async fn list_recent_transactions(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<Transaction>> {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM wallet_transactions
             WHERE wallet_id = (SELECT id FROM wallets WHERE user_id = $1)
             ORDER BY id DESC
             LIMIT $2"
        ))
        .bind(user_id.value())
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| LedgerError::from_db("Failed to list transactions", &e))?
        .into_iter()
        .map(transaction_from_row)
        .collect()
    }

    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn wallet_audit(&self, user_id: &UserId) -> Result<Option<WalletAudit>> {
        sqlx::query_as::<_, AuditRow>(
            "SELECT w.balance,
                    COALESCE(SUM(t.amount), 0) AS ledger_sum,
                    (SELECT balance_after FROM wallet_transactions
                      WHERE wallet_id = w.id ORDER BY id DESC LIMIT 1) AS last_balance_after,
                    COUNT(t.id) AS transaction_count
             FROM wallets w
             LEFT JOIN wallet_transactions t ON t.wallet_id = w.id
             WHERE w.user_id = $1
             GROUP BY w.id, w.balance",
        )
        .bind(user_id.value())
        .fetch_optional(self.pool())
        .await
        .map(|row| row.map(|row| audit_from_row(user_id, row)))
        .map_err(|e| LedgerError::from_db("Failed to audit wallet", &e))
    }

    /// # Errors
    /// Returns an error if the query fails or the stored status is unknown.
    pub async fn agent_status(&self, agent_id: &AgentId) -> Result<Option<AgentStatus>> {
        sqlx::query_scalar::<_, String>("SELECT status FROM voice_agents WHERE id = $1")
            .bind(agent_id.value())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| LedgerError::from_db("Failed to read agent status", &e))?
            .map(|status| {
                AgentStatus::try_from(status.as_str()).map_err(LedgerError::DatabaseError)
            })
            .transpose()
    }
}
