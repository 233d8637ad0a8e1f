use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::ports::{LedgerPorts, Settlement, SettlementRequest};
use super::LedgerService;
use crate::error::{LedgerError, Result};
use crate::types::{
    CallId, Shortfall, Transaction, UsageCharge, UsageHistory, UsagePeriod, UsageRecord, UserId,
    Wallet,
};

/// How a completed call was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UsageOutcome {
    #[serde(rename_all = "camelCase")]
    Charged {
        usage: UsageRecord,
        wallet: Wallet,
        transaction: Transaction,
        low_balance: bool,
        paused_agents: Option<u64>,
    },
    /// Recorded but not debited; the wallet could not cover the cost.
    Unpaid {
        usage: UsageRecord,
        shortfall: Shortfall,
    },
    /// Recorded for a user without a wallet.
    NoWallet { usage: UsageRecord },
    /// Zero-length call; nothing to record.
    NoCharge { charge: UsageCharge },
}

impl UsageOutcome {
    /// Surfaces an unpaid call as `InsufficientBalance`.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` for [`UsageOutcome::Unpaid`].
    pub fn into_result(self) -> Result<Self> {
        match self {
            Self::Unpaid { shortfall, .. } => Err(LedgerError::InsufficientBalance(shortfall)),
            other => Ok(other),
        }
    }

    #[must_use]
    pub const fn usage(&self) -> Option<&UsageRecord> {
        match self {
            Self::Charged { usage, .. } | Self::Unpaid { usage, .. } | Self::NoWallet { usage } => {
                Some(usage)
            }
            Self::NoCharge { .. } => None,
        }
    }
}

impl<P> LedgerService<P>
where
    P: LedgerPorts + Sync,
{
    /// Prices a completed call and settles it against the wallet.
    ///
    /// # Errors
    /// `AlreadyRecorded` when the call was metered before, plus storage failures.
    pub async fn record_usage(
        &self,
        user_id: &UserId,
        call_id: &CallId,
        duration_seconds: u64,
    ) -> Result<UsageOutcome> {
        if self.ports.find_usage(call_id).await?.is_some() {
            debug!(call_id = %call_id, "usage already recorded");
            return Err(LedgerError::AlreadyRecorded {
                call_id: call_id.clone(),
            });
        }

        let charge = self
            .settings
            .pricing
            .charge_for(call_id.clone(), duration_seconds);
        if charge.is_free() {
            debug!(call_id = %call_id, duration_seconds, "call too short to bill");
            return Ok(UsageOutcome::NoCharge { charge });
        }

        let description = charge.description();
        let settlement = self
            .ports
            .settle_usage(SettlementRequest {
                user_id: user_id.clone(),
                charge,
                description,
            })
            .await?;

        match settlement {
            Settlement::AlreadyRecorded { usage } => {
                debug!(call_id = %usage.call_id, "usage recorded by a concurrent delivery");
                Err(LedgerError::AlreadyRecorded {
                    call_id: usage.call_id,
                })
            }
            Settlement::NoWallet { usage } => {
                warn!(user_id = %user_id, call_id = %call_id, "usage recorded for user without wallet");
                Ok(UsageOutcome::NoWallet { usage })
            }
            Settlement::Unpaid { usage, balance } => {
                let shortfall = Shortfall::new(balance, usage.total_cost);
                warn!(
                    user_id = %user_id,
                    call_id = %call_id,
                    balance = %shortfall.balance,
                    required = %shortfall.required,
                    "insufficient balance for call"
                );
                Ok(UsageOutcome::Unpaid { usage, shortfall })
            }
            Settlement::Charged {
                usage,
                wallet,
                transaction,
            } => {
                info!(
                    user_id = %user_id,
                    call_id = %call_id,
                    minutes = %usage.minutes,
                    cost = %usage.total_cost,
                    balance_after = %wallet.balance,
                    "usage charged"
                );
                let paused_agents = self.pause_after_debit(user_id).await;
                Ok(UsageOutcome::Charged {
                    low_balance: wallet.is_low_balance(),
                    usage,
                    wallet,
                    transaction,
                    paused_agents,
                })
            }
        }
    }

    /// # Errors
    /// Propagates storage failures.
    pub async fn usage_history(
        &self,
        user_id: &UserId,
        period: UsagePeriod,
        limit: Option<u32>,
    ) -> Result<UsageHistory> {
        self.usage_history_at(user_id, period, limit, Utc::now())
            .await
    }

    /// Usage history for the window ending at `now`.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn usage_history_at(
        &self,
        user_id: &UserId,
        period: UsagePeriod,
        limit: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<UsageHistory> {
        let since = period.since(now);
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(self.settings.usage_history_limit);

        let usage = self.ports.list_usage(user_id, since, limit).await?;
        let stats = self.ports.usage_totals(user_id, since).await?;
        let daily_usage = self.ports.daily_usage(user_id, since).await?;

        Ok(UsageHistory {
            period,
            since,
            usage,
            stats,
            daily_usage,
            pricing: self.settings.pricing,
        })
    }
}
