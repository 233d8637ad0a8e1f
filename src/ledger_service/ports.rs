use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::types::{
    AgentStatus, CallId, CorrelationKey, DailyUsage, LedgerEntry, PaymentReference, Transaction,
    TransactionType, UsageCharge, UsageRecord, UsageTotals, UserId, Wallet, WalletAudit,
    WalletSeed,
};

pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Result of appending one entry to a wallet's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Applied {
        wallet: Wallet,
        transaction: Transaction,
    },
    /// The correlation key was already on the log; nothing changed.
    Replayed {
        wallet: Wallet,
        transaction: Transaction,
    },
}

impl AppendOutcome {
    #[must_use]
    pub const fn is_replayed(&self) -> bool {
        matches!(self, Self::Replayed { .. })
    }

    #[must_use]
    pub fn into_parts(self) -> (Wallet, Transaction) {
        match self {
            Self::Applied {
                wallet,
                transaction,
            }
            | Self::Replayed {
                wallet,
                transaction,
            } => (wallet, transaction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementRequest {
    pub user_id: UserId,
    pub charge: UsageCharge,
    pub description: String,
}

/// What the store did with a priced call, decided under the wallet lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Charged {
        usage: UsageRecord,
        wallet: Wallet,
        transaction: Transaction,
    },
    Unpaid {
        usage: UsageRecord,
        balance: Decimal,
    },
    NoWallet {
        usage: UsageRecord,
    },
    AlreadyRecorded {
        usage: UsageRecord,
    },
}

pub trait WalletStore {
    fn find_wallet<'a>(&'a self, user_id: &'a UserId) -> PortFuture<'a, Option<Wallet>>;

    /// Create-if-absent. A losing racer returns the winner's wallet and no
    /// second bonus row is written.
    fn get_or_create_wallet<'a>(
        &'a self,
        user_id: &'a UserId,
        seed: &'a WalletSeed,
    ) -> PortFuture<'a, Wallet>;

    /// Locks the wallet, applies `entry.amount` and appends the row in one unit.
    fn append_transaction(&self, entry: LedgerEntry) -> PortFuture<'_, AppendOutcome>;

    fn find_by_correlation<'a>(
        &'a self,
        key: &'a CorrelationKey,
        kind: TransactionType,
    ) -> PortFuture<'a, Option<Transaction>>;

    /// Most recent first.
    fn recent_transactions<'a>(
        &'a self,
        user_id: &'a UserId,
        limit: u32,
    ) -> PortFuture<'a, Vec<Transaction>>;

    fn audit_wallet<'a>(&'a self, user_id: &'a UserId) -> PortFuture<'a, Option<WalletAudit>>;
}

pub trait UsageStore {
    fn find_usage<'a>(&'a self, call_id: &'a CallId) -> PortFuture<'a, Option<UsageRecord>>;

    /// Records usage and, when the wallet covers it, the matching debit.
    fn settle_usage(&self, request: SettlementRequest) -> PortFuture<'_, Settlement>;

    /// Newest first, bounded by `limit`.
    fn list_usage<'a>(
        &'a self,
        user_id: &'a UserId,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> PortFuture<'a, Vec<UsageRecord>>;

    fn usage_totals<'a>(
        &'a self,
        user_id: &'a UserId,
        since: Option<DateTime<Utc>>,
    ) -> PortFuture<'a, UsageTotals>;

    /// Oldest day first.
    fn daily_usage<'a>(
        &'a self,
        user_id: &'a UserId,
        since: Option<DateTime<Utc>>,
    ) -> PortFuture<'a, Vec<DailyUsage>>;
}

pub trait AgentLifecycleStore {
    /// Moves every agent of `user_id` in `from` to `to`; returns how many moved.
    fn transition_agents<'a>(
        &'a self,
        user_id: &'a UserId,
        from: AgentStatus,
        to: AgentStatus,
    ) -> PortFuture<'a, u64>;
}

pub trait LedgerPorts: WalletStore + UsageStore + AgentLifecycleStore {}

impl<T> LedgerPorts for T where T: WalletStore + UsageStore + AgentLifecycleStore {}

/// A confirmed payment ready to be credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmation {
    pub user_id: UserId,
    pub amount_dollars: Decimal,
    pub payment_reference: PaymentReference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    Confirmed(PaymentConfirmation),
    Failed {
        payment_reference: Option<PaymentReference>,
        reason: Option<String>,
    },
    /// A success event missing its user or carrying a non-positive amount.
    Invalid {
        event_type: String,
        reason: String,
    },
    Ignored {
        event_type: String,
    },
}

/// Translates a payment processor callback into ledger terms.
pub trait PaymentEventSource {
    /// # Errors
    /// Returns `InvalidInput` when the payload is not a processor event at all.
    fn translate(&self, payload: &serde_json::Value) -> Result<PaymentEvent>;
}
