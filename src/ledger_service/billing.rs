use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::payment_events::CheckoutWebhookSource;
use super::ports::{LedgerPorts, PaymentConfirmation, PaymentEvent, PaymentEventSource};
use super::usage_meter::UsageOutcome;
use super::wallet_ledger::{LedgerReceipt, LedgerRequest};
use super::LedgerService;
use crate::error::{LedgerError, Result};
use crate::types::{CallId, CorrelationKey, TransactionType, UserId};

const RETRY_BACKOFF_MS: u64 = 25;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCompletion {
    pub user_id: UserId,
    pub call_id: CallId,
    pub duration_seconds: u64,
}

/// Admin credit; never idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualCredit {
    pub user_id: UserId,
    pub amount_dollars: Decimal,
    #[serde(default = "ManualCredit::default_kind", rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub description: Option<String>,
}

impl ManualCredit {
    const fn default_kind() -> TransactionType {
        TransactionType::TopUp
    }

    #[must_use]
    pub fn description_or_default(&self) -> String {
        self.description
            .clone()
            .filter(|description| !description.trim().is_empty())
            .unwrap_or_else(|| format!("Added {:.2} to wallet", self.amount_dollars.round_dp(2)))
    }
}

/// Inbound events that move money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BillingEvent {
    PaymentConfirmed(PaymentConfirmation),
    CallCompleted(CallCompletion),
    ManualCredit(ManualCredit),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BillingOutcome {
    Credited(LedgerReceipt),
    Metered(UsageOutcome),
    Ignored { reason: String },
}

/// Entry point for payment callbacks, call completions and admin credits.
pub struct BillingService<P, S = CheckoutWebhookSource> {
    ledger: LedgerService<P>,
    source: S,
}

impl<P> BillingService<P>
where
    P: LedgerPorts + Sync,
{
    #[must_use]
    pub const fn new(ledger: LedgerService<P>) -> Self {
        Self {
            ledger,
            source: CheckoutWebhookSource,
        }
    }
}

impl<P, S> BillingService<P, S>
where
    P: LedgerPorts + Sync,
    S: PaymentEventSource + Sync,
{
    #[must_use]
    pub const fn with_source(ledger: LedgerService<P>, source: S) -> Self {
        Self { ledger, source }
    }

    #[must_use]
    pub const fn ledger(&self) -> &LedgerService<P> {
        &self.ledger
    }

    /// Applies one event, retrying storage conflicts with the same key.
    ///
    /// # Errors
    /// Ledger and metering errors; `StorageConflict` once retries run out.
    pub async fn handle(&self, event: &BillingEvent) -> Result<BillingOutcome> {
        let attempts = self.ledger.settings().conflict_retry_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.apply(event).await {
                Err(error) if error.is_retryable() && attempt < attempts => {
                    warn!(attempt, attempts, error = %error, "retrying billing event");
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt)))
                        .await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Translates a processor webhook and applies it.
    ///
    /// # Errors
    /// `InvalidInput` for payloads that are not processor events, plus the
    /// errors of [`Self::handle`].
    pub async fn handle_webhook(&self, payload: &serde_json::Value) -> Result<BillingOutcome> {
        match self.source.translate(payload)? {
            PaymentEvent::Confirmed(confirmation) => {
                self.handle(&BillingEvent::PaymentConfirmed(confirmation))
                    .await
            }
            PaymentEvent::Failed {
                payment_reference, ..
            } => Ok(BillingOutcome::Ignored {
                reason: format!(
                    "payment failed: {}",
                    payment_reference.map_or_else(|| "<unknown>".to_string(), |r| r.to_string())
                ),
            }),
            PaymentEvent::Invalid { event_type, reason } => Ok(BillingOutcome::Ignored {
                reason: format!("invalid {event_type}: {reason}"),
            }),
            PaymentEvent::Ignored { event_type } => Ok(BillingOutcome::Ignored {
                reason: format!("unhandled event type {event_type}"),
            }),
        }
    }

    async fn apply(&self, event: &BillingEvent) -> Result<BillingOutcome> {
        match event {
            BillingEvent::PaymentConfirmed(confirmation) => {
                let request = LedgerRequest::new(
                    confirmation.user_id.clone(),
                    confirmation.amount_dollars,
                    TransactionType::TopUp,
                    CheckoutWebhookSource::TOP_UP_DESCRIPTION,
                )
                .with_correlation(CorrelationKey::Payment(
                    confirmation.payment_reference.clone(),
                ));
                let receipt = self.ledger.credit(request).await?;
                if !receipt.replayed {
                    info!(
                        user_id = %confirmation.user_id,
                        payment_reference = %confirmation.payment_reference,
                        balance = %receipt.wallet.balance,
                        "payment credited"
                    );
                }
                Ok(BillingOutcome::Credited(receipt))
            }
            BillingEvent::CallCompleted(call) => {
                let outcome = self
                    .ledger
                    .record_usage(&call.user_id, &call.call_id, call.duration_seconds)
                    .await;
                match outcome {
                    Ok(outcome) => Ok(BillingOutcome::Metered(outcome)),
                    Err(LedgerError::AlreadyRecorded { call_id }) => {
                        debug!(call_id = %call_id, "duplicate call completion");
                        Ok(BillingOutcome::Ignored {
                            reason: format!("usage already recorded for call {call_id}"),
                        })
                    }
                    Err(error) => Err(error),
                }
            }
            BillingEvent::ManualCredit(credit) => {
                let request = LedgerRequest::new(
                    credit.user_id.clone(),
                    credit.amount_dollars,
                    credit.kind,
                    credit.description_or_default(),
                );
                self.ledger.credit(request).await.map(BillingOutcome::Credited)
            }
        }
    }
}
