use serde_json::Value;
use tracing::{error, info, warn};

use super::ports::{PaymentConfirmation, PaymentEvent, PaymentEventSource};
use crate::error::{LedgerError, Result};
use crate::types::{dollars_from_cents, PaymentReference, UserId};

const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const INTENT_SUCCEEDED: &str = "payment_intent.succeeded";
const INTENT_FAILED: &str = "payment_intent.payment_failed";

/// Hosted-checkout webhook payloads (`{"type": ..., "data": {"object": ...}}`).
///
/// Amounts arrive in cents and the wallet owner travels in `metadata.userId`.
/// Signatures are verified upstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutWebhookSource;

impl CheckoutWebhookSource {
    pub const TOP_UP_DESCRIPTION: &'static str = "Wallet top-up via Stripe";

    fn confirmation(
        event_type: &str,
        object: &Value,
        amount_field: &str,
        reference_field: &str,
    ) -> PaymentEvent {
        let user_id = object
            .pointer("/metadata/userId")
            .and_then(Value::as_str)
            .and_then(|raw| UserId::parse(raw).ok());
        let cents = object.get(amount_field).and_then(Value::as_i64).unwrap_or(0);
        let reference = object
            .get(reference_field)
            .and_then(Value::as_str)
            .and_then(|raw| PaymentReference::parse(raw).ok());

        match (user_id, reference) {
            (Some(user_id), Some(payment_reference)) if cents > 0 => {
                PaymentEvent::Confirmed(PaymentConfirmation {
                    user_id,
                    amount_dollars: dollars_from_cents(cents),
                    payment_reference,
                })
            }
            (user_id, reference) => {
                let reason = format!(
                    "user={} amount_cents={cents} reference={}",
                    user_id.map_or_else(|| "<missing>".to_string(), |id| id.to_string()),
                    reference.map_or_else(|| "<missing>".to_string(), |r| r.to_string()),
                );
                error!(event_type, %reason, "invalid payment event");
                PaymentEvent::Invalid {
                    event_type: event_type.to_string(),
                    reason,
                }
            }
        }
    }
}

impl PaymentEventSource for CheckoutWebhookSource {
    fn translate(&self, payload: &Value) -> Result<PaymentEvent> {
        let event_type = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::InvalidInput("payment event has no type".to_string()))?;
        let object = payload
            .pointer("/data/object")
            .ok_or_else(|| LedgerError::InvalidInput("payment event has no data.object".to_string()))?;

        let event = match event_type {
            CHECKOUT_COMPLETED => Self::confirmation(event_type, object, "amount_total", "payment_intent"),
            INTENT_SUCCEEDED => Self::confirmation(event_type, object, "amount", "id"),
            INTENT_FAILED => {
                let payment_reference = object
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|raw| PaymentReference::parse(raw).ok());
                let reason = object
                    .pointer("/last_payment_error/message")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                warn!(
                    payment_reference = ?payment_reference,
                    reason = ?reason,
                    "payment failed"
                );
                PaymentEvent::Failed {
                    payment_reference,
                    reason,
                }
            }
            other => {
                info!(event_type = other, "unhandled payment event type");
                PaymentEvent::Ignored {
                    event_type: other.to_string(),
                }
            }
        };
        Ok(event)
    }
}
