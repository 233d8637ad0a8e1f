use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::ports::{AppendOutcome, LedgerPorts};
use super::LedgerService;
use crate::error::{LedgerError, Result};
use crate::types::{
    positive_amount, start_of_month, CorrelationKey, LedgerEntry, Transaction, TransactionType,
    UserId, Wallet, WalletAudit, WalletSnapshot,
};

/// One credit or debit as requested by a caller. `amount` is always positive;
/// the direction comes from the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRequest {
    pub user_id: UserId,
    pub amount: Decimal,
    pub kind: TransactionType,
    pub correlation: Option<CorrelationKey>,
    pub description: String,
}

impl LedgerRequest {
    #[must_use]
    pub fn new(
        user_id: UserId,
        amount: Decimal,
        kind: TransactionType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            amount,
            kind,
            correlation: None,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn with_correlation(mut self, key: CorrelationKey) -> Self {
        self.correlation = Some(key);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    pub wallet: Wallet,
    pub transaction: Transaction,
    /// The correlation key had already been applied.
    pub replayed: bool,
    /// Agents moved by the follow-up policy run; `None` when it failed.
    pub agents_transitioned: Option<u64>,
}

enum Direction {
    Credit,
    Debit,
}

impl<P> LedgerService<P>
where
    P: LedgerPorts + Sync,
{
    /// Returns the user's wallet, seeding a new one with the welcome bonus.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn get_or_create_wallet(&self, user_id: &UserId) -> Result<Wallet> {
        let seed = self.settings.wallet_seed();
        self.ports.get_or_create_wallet(user_id, &seed).await
    }

    /// Adds funds. A repeated correlation key returns the original row.
    ///
    /// # Errors
    /// `InvalidAmount` for non-positive amounts, `InvalidInput` for a debit kind
    /// or a correlation key owned by another wallet, and storage failures.
    pub async fn credit(&self, request: LedgerRequest) -> Result<LedgerReceipt> {
        let amount = Self::validate(&request, &Direction::Credit)?;

        if let Some(receipt) = self.replay(&request).await? {
            let agents_transitioned = self.reactivate_after_credit(&request.user_id).await;
            return Ok(LedgerReceipt {
                agents_transitioned,
                ..receipt
            });
        }

        self.get_or_create_wallet(&request.user_id).await?;
        let outcome = self
            .ports
            .append_transaction(Self::entry(request, amount))
            .await?;
        let mut receipt = Self::receipt(outcome);
        receipt.agents_transitioned = self.reactivate_after_credit(&receipt.wallet.user_id).await;
        Ok(receipt)
    }

    /// Removes funds. The balance may go negative; solvency is the policy's concern.
    ///
    /// # Errors
    /// `WalletNotFound` when the user never opened a wallet, plus the same
    /// validation errors as [`Self::credit`].
    pub async fn debit(&self, request: LedgerRequest) -> Result<LedgerReceipt> {
        let amount = Self::validate(&request, &Direction::Debit)?;

        if let Some(receipt) = self.replay(&request).await? {
            return Ok(receipt);
        }

        let outcome = self
            .ports
            .append_transaction(Self::entry(request, -amount))
            .await?;
        let mut receipt = Self::receipt(outcome);
        if !receipt.replayed {
            receipt.agents_transitioned = self.pause_after_debit(&receipt.wallet.user_id).await;
        }
        Ok(receipt)
    }

    /// Wallet with recent activity and month-to-date usage. Opens the wallet
    /// on first access.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn wallet_snapshot(&self, user_id: &UserId) -> Result<WalletSnapshot> {
        let wallet = self.get_or_create_wallet(user_id).await?;
        let transactions = self
            .ports
            .recent_transactions(user_id, self.settings.recent_transaction_limit)
            .await?;
        let month = self
            .ports
            .usage_totals(user_id, Some(start_of_month(chrono::Utc::now())))
            .await?;

        Ok(WalletSnapshot {
            low_balance: wallet.is_low_balance(),
            wallet,
            transactions,
            monthly_minutes: month.total_minutes,
            monthly_cost: month.total_cost,
        })
    }

    /// # Errors
    /// `WalletNotFound` when the user has no wallet.
    pub async fn audit(&self, user_id: &UserId) -> Result<WalletAudit> {
        let audit = self
            .ports
            .audit_wallet(user_id)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound {
                user_id: user_id.clone(),
            })?;
        if !audit.is_consistent() {
            warn!(
                user_id = %user_id,
                balance = %audit.balance,
                ledger_sum = %audit.ledger_sum,
                "wallet balance drifted from its ledger"
            );
        }
        Ok(audit)
    }

    fn validate(request: &LedgerRequest, direction: &Direction) -> Result<Decimal> {
        let amount = positive_amount(request.amount)?;
        let expected_credit = matches!(direction, Direction::Credit);
        if request.kind.is_credit() != expected_credit {
            return Err(LedgerError::InvalidInput(format!(
                "{} cannot be used for a {}",
                request.kind,
                if expected_credit { "credit" } else { "debit" }
            )));
        }
        Ok(amount)
    }

    async fn replay(&self, request: &LedgerRequest) -> Result<Option<LedgerReceipt>> {
        let Some(key) = request.correlation.as_ref() else {
            return Ok(None);
        };
        let Some(existing) = self.ports.find_by_correlation(key, request.kind).await? else {
            return Ok(None);
        };
        let wallet = self
            .ports
            .find_wallet(&request.user_id)
            .await?
            .filter(|wallet| wallet.id == existing.wallet_id)
            .ok_or_else(|| {
                LedgerError::InvalidInput(format!("{key} is already recorded on another wallet"))
            })?;

        debug!(user_id = %request.user_id, correlation = %key, "ledger request already applied");
        Ok(Some(LedgerReceipt {
            wallet,
            transaction: existing,
            replayed: true,
            agents_transitioned: None,
        }))
    }

    fn entry(request: LedgerRequest, signed_amount: Decimal) -> LedgerEntry {
        LedgerEntry {
            user_id: request.user_id,
            transaction_type: request.kind,
            amount: signed_amount,
            correlation: request.correlation,
            description: request.description,
        }
    }

    fn receipt(outcome: AppendOutcome) -> LedgerReceipt {
        let replayed = outcome.is_replayed();
        let (wallet, transaction) = outcome.into_parts();
        if replayed {
            debug!(
                user_id = %wallet.user_id,
                transaction_id = transaction.id,
                "correlation key matched during append"
            );
        } else {
            info!(
                user_id = %wallet.user_id,
                kind = %transaction.transaction_type,
                amount = %transaction.amount,
                balance_after = %transaction.balance_after,
                "ledger transaction applied"
            );
        }
        LedgerReceipt {
            wallet,
            transaction,
            replayed,
            agents_transitioned: None,
        }
    }

    async fn reactivate_after_credit(&self, user_id: &UserId) -> Option<u64> {
        match self.reactivate_agents_if_sufficient(user_id).await {
            Ok(count) => Some(count),
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "agent reactivation failed after credit");
                None
            }
        }
    }

    pub(super) async fn pause_after_debit(&self, user_id: &UserId) -> Option<u64> {
        match self.pause_agents_if_insufficient(user_id).await {
            Ok(count) => Some(count),
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "agent pause failed after debit");
                None
            }
        }
    }
}
