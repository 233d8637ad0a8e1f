use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CallId, PaymentReference, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    TopUp,
    UsageDeduction,
    Bonus,
    Refund,
}

impl TransactionType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TopUp => "top_up",
            Self::UsageDeduction => "usage_deduction",
            Self::Bonus => "bonus",
            Self::Refund => "refund",
        }
    }

    /// Credits carry positive amounts, debits negative ones.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::TopUp | Self::Bonus | Self::Refund)
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, String> {
        match s {
            "top_up" => Ok(Self::TopUp),
            "usage_deduction" => Ok(Self::UsageDeduction),
            "bonus" => Ok(Self::Bonus),
            "refund" => Ok(Self::Refund),
            _ => Err(format!("Unknown transaction type: {s}")),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        Self::try_from(s)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// External idempotency token attached to a ledger mutation.
///
/// Payment references are unique across the whole log. Call references are
/// unique per transaction type, so a refund may cite the call it refunds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CorrelationKey {
    Payment(PaymentReference),
    Call(CallId),
}

impl CorrelationKey {
    #[must_use]
    pub const fn payment_reference(&self) -> Option<&PaymentReference> {
        match self {
            Self::Payment(reference) => Some(reference),
            Self::Call(_) => None,
        }
    }

    #[must_use]
    pub const fn call_id(&self) -> Option<&CallId> {
        match self {
            Self::Call(call_id) => Some(call_id),
            Self::Payment(_) => None,
        }
    }
}

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Payment(reference) => write!(f, "payment:{reference}"),
            Self::Call(call_id) => write!(f, "call:{call_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: UserId,
    pub balance: Decimal,
    pub low_balance_threshold: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    #[must_use]
    pub fn is_low_balance(&self) -> bool {
        self.balance < self.low_balance_threshold
    }
}

/// Immutable ledger row. `balance_after` is the running sum up to and
/// including this row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub wallet_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub description: String,
    pub payment_reference: Option<PaymentReference>,
    pub call_id: Option<CallId>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[must_use]
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        self.payment_reference
            .clone()
            .map(CorrelationKey::Payment)
            .or_else(|| self.call_id.clone().map(CorrelationKey::Call))
    }

    /// Whether this row answers an idempotent lookup for `key` of `kind`.
    #[must_use]
    pub fn matches_correlation(&self, key: &CorrelationKey, kind: TransactionType) -> bool {
        match key {
            CorrelationKey::Payment(reference) => {
                self.payment_reference.as_ref() == Some(reference)
            }
            CorrelationKey::Call(call_id) => {
                self.call_id.as_ref() == Some(call_id) && self.transaction_type == kind
            }
        }
    }
}

/// A signed mutation to append to one user's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user_id: UserId,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub correlation: Option<CorrelationKey>,
    pub description: String,
}

/// How a lazily created wallet is seeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSeed {
    pub welcome_bonus: Decimal,
    pub low_balance_threshold: Decimal,
    pub description: String,
}

impl WalletSeed {
    pub const WELCOME_DESCRIPTION: &'static str = "Welcome credit - Start making calls!";
}

/// Read model served to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub low_balance: bool,
    pub transactions: Vec<Transaction>,
    pub monthly_minutes: Decimal,
    pub monthly_cost: Decimal,
}

/// Cross-check of the cached balance against the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAudit {
    pub user_id: UserId,
    pub balance: Decimal,
    pub ledger_sum: Decimal,
    pub last_balance_after: Option<Decimal>,
    pub transaction_count: i64,
}

impl WalletAudit {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ledger_sum
            && self
                .last_balance_after
                .map_or(self.balance.is_zero(), |last| last == self.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::{CorrelationKey, Transaction, TransactionType, WalletAudit};
    use crate::types::{CallId, PaymentReference, UserId};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn deduction(call: &str) -> Transaction {
        Transaction {
            id: 1,
            wallet_id: Uuid::new_v4(),
            transaction_type: TransactionType::UsageDeduction,
            amount: dec!(-0.2),
            balance_after: dec!(4.8),
            description: "Voice call".to_string(),
            payment_reference: None,
            call_id: Some(CallId::new(call)),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn transaction_type_round_trips_through_storage_names() {
        for kind in [
            TransactionType::TopUp,
            TransactionType::UsageDeduction,
            TransactionType::Bonus,
            TransactionType::Refund,
        ] {
            assert_eq!(TransactionType::try_from(kind.as_str()), Ok(kind));
        }
        assert!(TransactionType::try_from("chargeback").is_err());
        assert!(!TransactionType::UsageDeduction.is_credit());
    }

    #[test]
    fn call_correlation_is_scoped_to_transaction_type() {
        let row = deduction("call-1");
        let key = CorrelationKey::Call(CallId::new("call-1"));

        assert!(row.matches_correlation(&key, TransactionType::UsageDeduction));
        assert!(!row.matches_correlation(&key, TransactionType::Refund));
        assert!(!row.matches_correlation(
            &CorrelationKey::Payment(PaymentReference::new("call-1")),
            TransactionType::TopUp
        ));
        assert_eq!(row.correlation_key(), Some(key));
    }

    #[test]
    fn audit_flags_drift_between_balance_and_log() {
        let consistent = WalletAudit {
            user_id: UserId::new("u"),
            balance: dec!(4.8),
            ledger_sum: dec!(4.8),
            last_balance_after: Some(dec!(4.8)),
            transaction_count: 2,
        };
        let drifted = WalletAudit {
            ledger_sum: dec!(5),
            ..consistent.clone()
        };
        let empty = WalletAudit {
            balance: Decimal::ZERO,
            ledger_sum: Decimal::ZERO,
            last_balance_after: None,
            transaction_count: 0,
            ..consistent.clone()
        };

        assert!(consistent.is_consistent());
        assert!(!drifted.is_consistent());
        assert!(empty.is_consistent());
    }
}
