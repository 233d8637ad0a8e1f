use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::ports::{
    AgentLifecycleStore, AppendOutcome, PortFuture, Settlement, SettlementRequest, UsageStore,
    WalletStore,
};
use crate::error::{LedgerError, Result};
use crate::types::{
    checked_balance, AgentId, AgentStatus, CallId, CorrelationKey, DailyUsage, LedgerEntry,
    Transaction, TransactionType, UsageRecord, UsageTotals, UserId, Wallet, WalletAudit,
    WalletSeed,
};

#[derive(Debug, Default)]
struct MemoryState {
    wallets: HashMap<UserId, Wallet>,
    transactions: Vec<Transaction>,
    usage: Vec<UsageRecord>,
    agents: BTreeMap<AgentId, (UserId, AgentStatus)>,
    agent_transitions_fail: bool,
    pending_conflicts: u32,
}

impl MemoryState {
    fn take_conflict(&mut self, operation: &str) -> Result<()> {
        if self.pending_conflicts == 0 {
            return Ok(());
        }
        self.pending_conflicts -= 1;
        Err(LedgerError::StorageConflict(format!(
            "simulated serialization failure during {operation}"
        )))
    }

    fn wallet_transactions(&self, wallet_id: Uuid) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(move |transaction| transaction.wallet_id == wallet_id)
    }

    fn find_correlated(&self, key: &CorrelationKey, kind: TransactionType) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|transaction| transaction.matches_correlation(key, kind))
    }

    fn apply_entry(&mut self, entry: LedgerEntry) -> Result<AppendOutcome> {
        let wallet = self
            .wallets
            .get(&entry.user_id)
            .cloned()
            .ok_or_else(|| LedgerError::WalletNotFound {
                user_id: entry.user_id.clone(),
            })?;

        if let Some(key) = entry.correlation.as_ref() {
            if let Some(existing) = self.find_correlated(key, entry.transaction_type) {
                if existing.wallet_id != wallet.id {
                    return Err(LedgerError::InvalidInput(format!(
                        "{key} is already recorded on another wallet"
                    )));
                }
                return Ok(AppendOutcome::Replayed {
                    wallet,
                    transaction: existing.clone(),
                });
            }
        }

        let now = Utc::now();
        let balance_after = checked_balance(wallet.balance, entry.amount)?;
        let transaction = Transaction {
            id: i64::try_from(self.transactions.len())
                .map_err(|e| LedgerError::Internal(format!("transaction id overflow: {e}")))?
                + 1,
            wallet_id: wallet.id,
            transaction_type: entry.transaction_type,
            amount: entry.amount,
            balance_after,
            description: entry.description,
            payment_reference: entry
                .correlation
                .as_ref()
                .and_then(CorrelationKey::payment_reference)
                .cloned(),
            call_id: entry
                .correlation
                .as_ref()
                .and_then(CorrelationKey::call_id)
                .cloned(),
            created_at: now,
        };
        let updated = Wallet {
            balance: balance_after,
            updated_at: now,
            ..wallet
        };

        self.transactions.push(transaction.clone());
        self.wallets.insert(entry.user_id, updated.clone());
        Ok(AppendOutcome::Applied {
            wallet: updated,
            transaction,
        })
    }

    fn user_usage(
        &self,
        user_id: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> impl Iterator<Item = &UsageRecord> {
        let user_id = user_id.clone();
        self.usage.iter().filter(move |record| {
            record.user_id == user_id && since.map_or(true, |since| record.created_at >= since)
        })
    }
}

/// Process-local ledger backend guarded by a single lock.
///
/// Every port call takes the lock for its whole duration, which gives the
/// same per-wallet serialization the Postgres adapter gets from row locks.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLedgerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_agent(self, user_id: &UserId, agent_id: AgentId, status: AgentStatus) -> Self {
        let mut state = self.state.lock().await;
        state.agents.insert(agent_id, (user_id.clone(), status));
        drop(state);
        self
    }

    pub async fn agent_status(&self, agent_id: &AgentId) -> Option<AgentStatus> {
        self.state
            .lock()
            .await
            .agents
            .get(agent_id)
            .map(|(_, status)| *status)
    }

    /// Oldest first.
    pub async fn transactions_for(&self, user_id: &UserId) -> Vec<Transaction> {
        let state = self.state.lock().await;
        state
            .wallets
            .get(user_id)
            .map(|wallet| state.wallet_transactions(wallet.id).cloned().collect())
            .unwrap_or_default()
    }

    pub async fn usage_for(&self, user_id: &UserId) -> Vec<UsageRecord> {
        self.state
            .lock()
            .await
            .user_usage(user_id, None)
            .cloned()
            .collect()
    }

    pub async fn set_agent_transitions_failing(&self, failing: bool) {
        self.state.lock().await.agent_transitions_fail = failing;
    }

    /// The next `count` ledger writes fail with `StorageConflict`.
    pub async fn inject_conflicts(&self, count: u32) {
        self.state.lock().await.pending_conflicts = count;
    }

    pub async fn backdate_usage(&self, call_id: &CallId, created_at: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        if let Some(record) = state
            .usage
            .iter_mut()
            .find(|record| &record.call_id == call_id)
        {
            record.created_at = created_at;
        }
    }
}

impl WalletStore for MemoryLedgerStore {
    fn find_wallet<'a>(&'a self, user_id: &'a UserId) -> PortFuture<'a, Option<Wallet>> {
        Box::pin(async move { Ok(self.state.lock().await.wallets.get(user_id).cloned()) })
    }

    fn get_or_create_wallet<'a>(
        &'a self,
        user_id: &'a UserId,
        seed: &'a WalletSeed,
    ) -> PortFuture<'a, Wallet> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if let Some(wallet) = state.wallets.get(user_id) {
                return Ok(wallet.clone());
            }

            let now = Utc::now();
            let wallet = Wallet {
                id: Uuid::new_v4(),
                user_id: user_id.clone(),
                balance: Decimal::ZERO,
                low_balance_threshold: seed.low_balance_threshold,
                created_at: now,
                updated_at: now,
            };
            state.wallets.insert(user_id.clone(), wallet.clone());

            if seed.welcome_bonus <= Decimal::ZERO {
                return Ok(wallet);
            }
            let (wallet, _) = state
                .apply_entry(LedgerEntry {
                    user_id: user_id.clone(),
                    transaction_type: TransactionType::Bonus,
                    amount: seed.welcome_bonus,
                    correlation: None,
                    description: seed.description.clone(),
                })?
                .into_parts();
            Ok(wallet)
        })
    }

    fn append_transaction(&self, entry: LedgerEntry) -> PortFuture<'_, AppendOutcome> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.take_conflict("append_transaction")?;
            state.apply_entry(entry)
        })
    }

    fn find_by_correlation<'a>(
        &'a self,
        key: &'a CorrelationKey,
        kind: TransactionType,
    ) -> PortFuture<'a, Option<Transaction>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .await
                .find_correlated(key, kind)
                .cloned())
        })
    }

    fn recent_transactions<'a>(
        &'a self,
        user_id: &'a UserId,
        limit: u32,
    ) -> PortFuture<'a, Vec<Transaction>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let Some(wallet) = state.wallets.get(user_id) else {
                return Ok(Vec::new());
            };
            let mut rows: Vec<Transaction> = state.wallet_transactions(wallet.id).cloned().collect();
            rows.reverse();
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(rows)
        })
    }

    fn audit_wallet<'a>(&'a self, user_id: &'a UserId) -> PortFuture<'a, Option<WalletAudit>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state.wallets.get(user_id).map(|wallet| {
                let rows: Vec<&Transaction> = state.wallet_transactions(wallet.id).collect();
                WalletAudit {
                    user_id: user_id.clone(),
                    balance: wallet.balance,
                    ledger_sum: rows.iter().map(|row| row.amount).sum(),
                    last_balance_after: rows.last().map(|row| row.balance_after),
                    transaction_count: i64::try_from(rows.len()).unwrap_or(i64::MAX),
                }
            }))
        })
    }
}

impl UsageStore for MemoryLedgerStore {
    fn find_usage<'a>(&'a self, call_id: &'a CallId) -> PortFuture<'a, Option<UsageRecord>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .await
                .usage
                .iter()
                .find(|record| &record.call_id == call_id)
                .cloned())
        })
    }

    fn settle_usage(&self, request: SettlementRequest) -> PortFuture<'_, Settlement> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.take_conflict("settle_usage")?;

            let call_id = request.charge.call_id.clone();
            if let Some(existing) = state.usage.iter().find(|record| record.call_id == call_id) {
                return Ok(Settlement::AlreadyRecorded {
                    usage: existing.clone(),
                });
            }

            let mut usage = UsageRecord {
                id: i64::try_from(state.usage.len())
                    .map_err(|e| LedgerError::Internal(format!("usage id overflow: {e}")))?
                    + 1,
                user_id: request.user_id.clone(),
                call_id: call_id.clone(),
                minutes: request.charge.minutes,
                cost_rate: request.charge.cost_rate,
                total_cost: request.charge.total_cost,
                base_cost: request.charge.base_cost,
                margin: request.charge.margin,
                transaction_id: None,
                created_at: Utc::now(),
            };

            let Some(wallet) = state.wallets.get(&request.user_id).cloned() else {
                state.usage.push(usage.clone());
                return Ok(Settlement::NoWallet { usage });
            };
            if wallet.balance < usage.total_cost {
                state.usage.push(usage.clone());
                return Ok(Settlement::Unpaid {
                    usage,
                    balance: wallet.balance,
                });
            }

            let outcome = state.apply_entry(LedgerEntry {
                user_id: request.user_id,
                transaction_type: TransactionType::UsageDeduction,
                amount: -usage.total_cost,
                correlation: Some(CorrelationKey::Call(call_id)),
                description: request.description,
            })?;
            if let AppendOutcome::Replayed { transaction, .. } = &outcome {
                request.charge.check_existing_debit(transaction)?;
            }
            let (wallet, transaction) = outcome.into_parts();
            usage.transaction_id = Some(transaction.id);
            state.usage.push(usage.clone());
            Ok(Settlement::Charged {
                usage,
                wallet,
                transaction,
            })
        })
    }

    fn list_usage<'a>(
        &'a self,
        user_id: &'a UserId,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> PortFuture<'a, Vec<UsageRecord>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut rows: Vec<UsageRecord> = state.user_usage(user_id, since).cloned().collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(rows)
        })
    }

    fn usage_totals<'a>(
        &'a self,
        user_id: &'a UserId,
        since: Option<DateTime<Utc>>,
    ) -> PortFuture<'a, UsageTotals> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(UsageTotals::from_records(state.user_usage(user_id, since)))
        })
    }

    fn daily_usage<'a>(
        &'a self,
        user_id: &'a UserId,
        since: Option<DateTime<Utc>>,
    ) -> PortFuture<'a, Vec<DailyUsage>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            let mut days: BTreeMap<chrono::NaiveDate, DailyUsage> = BTreeMap::new();
            for record in state.user_usage(user_id, since) {
                let day = record.created_at.date_naive();
                let entry = days.entry(day).or_insert_with(|| DailyUsage {
                    day,
                    minutes: Decimal::ZERO,
                    total_cost: Decimal::ZERO,
                    call_count: 0,
                });
                entry.minutes += record.minutes;
                entry.total_cost += record.total_cost;
                entry.call_count += 1;
            }
            Ok(days.into_values().collect())
        })
    }
}

impl AgentLifecycleStore for MemoryLedgerStore {
    fn transition_agents<'a>(
        &'a self,
        user_id: &'a UserId,
        from: AgentStatus,
        to: AgentStatus,
    ) -> PortFuture<'a, u64> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.agent_transitions_fail {
                return Err(LedgerError::DatabaseError(
                    "simulated agent store outage".to_string(),
                ));
            }
            let moved = state
                .agents
                .values_mut()
                .filter(|(owner, status)| owner == user_id && *status == from)
                .fold(0_u64, |count, (_, status)| {
                    *status = to;
                    count + 1
                });
            Ok(moved)
        })
    }
}
