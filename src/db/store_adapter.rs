use chrono::{DateTime, Utc};

use crate::db::LedgerDb;
use crate::ledger_service::{
    AgentLifecycleStore, AppendOutcome, PortFuture, Settlement, SettlementRequest, UsageStore,
    WalletStore,
};
use crate::types::{
    AgentStatus, CallId, CorrelationKey, DailyUsage, LedgerEntry, Transaction, TransactionType,
    UsageRecord, UsageTotals, UserId, Wallet, WalletAudit, WalletSeed,
};

impl WalletStore for LedgerDb {
    fn find_wallet<'a>(&'a self, user_id: &'a UserId) -> PortFuture<'a, Option<Wallet>> {
        Box::pin(self.load_wallet(user_id))
    }

    fn get_or_create_wallet<'a>(
        &'a self,
        user_id: &'a UserId,
        seed: &'a WalletSeed,
    ) -> PortFuture<'a, Wallet> {
        Box::pin(async move {
            match self.load_wallet(user_id).await? {
                Some(wallet) => Ok(wallet),
                None => self.open_wallet(user_id, seed).await,
            }
        })
    }

    fn append_transaction(&self, entry: LedgerEntry) -> PortFuture<'_, AppendOutcome> {
        Box::pin(self.append_entry(entry))
    }

    fn find_by_correlation<'a>(
        &'a self,
        key: &'a CorrelationKey,
        kind: TransactionType,
    ) -> PortFuture<'a, Option<Transaction>> {
        Box::pin(self.transaction_by_correlation(key, kind))
    }

    fn recent_transactions<'a>(
        &'a self,
        user_id: &'a UserId,
        limit: u32,
    ) -> PortFuture<'a, Vec<Transaction>> {
        Box::pin(self.list_recent_transactions(user_id, limit))
    }

    fn audit_wallet<'a>(&'a self, user_id: &'a UserId) -> PortFuture<'a, Option<WalletAudit>> {
        Box::pin(self.wallet_audit(user_id))
    }
}

impl UsageStore for LedgerDb {
    fn find_usage<'a>(&'a self, call_id: &'a CallId) -> PortFuture<'a, Option<UsageRecord>> {
        Box::pin(self.usage_by_call(call_id))
    }

    fn settle_usage(&self, request: SettlementRequest) -> PortFuture<'_, Settlement> {
        Box::pin(self.settle_call_usage(request))
    }

    fn list_usage<'a>(
        &'a self,
        user_id: &'a UserId,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> PortFuture<'a, Vec<UsageRecord>> {
        Box::pin(self.usage_since(user_id, since, limit))
    }

    fn usage_totals<'a>(
        &'a self,
        user_id: &'a UserId,
        since: Option<DateTime<Utc>>,
    ) -> PortFuture<'a, UsageTotals> {
        Box::pin(self.usage_totals_since(user_id, since))
    }

    fn daily_usage<'a>(
        &'a self,
        user_id: &'a UserId,
        since: Option<DateTime<Utc>>,
    ) -> PortFuture<'a, Vec<DailyUsage>> {
        Box::pin(self.daily_usage_since(user_id, since))
    }
}

impl AgentLifecycleStore for LedgerDb {
    fn transition_agents<'a>(
        &'a self,
        user_id: &'a UserId,
        from: AgentStatus,
        to: AgentStatus,
    ) -> PortFuture<'a, u64> {
        Box::pin(self.move_agents(user_id, from, to))
    }
}
