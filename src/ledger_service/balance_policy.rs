use rust_decimal::Decimal;
use tracing::info;

use super::ports::LedgerPorts;
use super::LedgerService;
use crate::error::Result;
use crate::types::{AgentStatus, BalanceCheck, UserId};

impl<P> LedgerService<P>
where
    P: LedgerPorts + Sync,
{
    /// Solvency from the live balance. A user without a wallet has balance 0.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn check_balance(&self, user_id: &UserId) -> Result<BalanceCheck> {
        let balance = self
            .ports
            .find_wallet(user_id)
            .await?
            .map_or(Decimal::ZERO, |wallet| wallet.balance);
        Ok(BalanceCheck::evaluate(
            balance,
            self.settings.minimum_balance,
        ))
    }

    /// Moves every `active` agent to `paused_no_balance` when insufficient.
    ///
    /// # Errors
    /// Propagates storage failures from the balance read or the agent update.
    pub async fn pause_agents_if_insufficient(&self, user_id: &UserId) -> Result<u64> {
        let check = self.check_balance(user_id).await?;
        if check.has_balance {
            return Ok(0);
        }

        let paused = self
            .ports
            .transition_agents(user_id, AgentStatus::Active, AgentStatus::PausedNoBalance)
            .await?;
        if paused > 0 {
            info!(
                user_id = %user_id,
                paused,
                balance = %check.balance,
                shortfall = %check.shortfall,
                "paused agents for insufficient balance"
            );
        }
        Ok(paused)
    }

    /// Moves every `paused_no_balance` agent back to `active` when sufficient.
    /// Manually paused agents are left alone.
    ///
    /// # Errors
    /// Propagates storage failures from the balance read or the agent update.
    pub async fn reactivate_agents_if_sufficient(&self, user_id: &UserId) -> Result<u64> {
        let check = self.check_balance(user_id).await?;
        if !check.has_balance {
            return Ok(0);
        }

        let reactivated = self
            .ports
            .transition_agents(user_id, AgentStatus::PausedNoBalance, AgentStatus::Active)
            .await?;
        if reactivated > 0 {
            info!(
                user_id = %user_id,
                reactivated,
                balance = %check.balance,
                "reactivated agents after top-up"
            );
        }
        Ok(reactivated)
    }
}
