use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{CallId, Transaction};
use crate::error::{LedgerError, Result};

/// Decimal places kept for dollar amounts; matches `NUMERIC(18, 6)` columns.
pub const MONEY_SCALE: u32 = 6;
/// Decimal places kept for billed minutes.
pub const MINUTES_SCALE: u32 = 4;

/// Largest magnitude a `NUMERIC(18, 6)` column holds.
pub const MAX_AMOUNT: Decimal = dec!(999999999999.999999);

const SECONDS_PER_MINUTE: i64 = 60;

#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount
        .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Validates a caller-supplied amount for credit or debit.
///
/// # Errors
/// Returns `InvalidAmount` when the rounded amount is zero, negative or
/// larger than `MAX_AMOUNT`.
pub fn positive_amount(amount: Decimal) -> Result<Decimal> {
    let rounded = round_money(amount);
    if rounded <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must be greater than zero, got {amount}"
        )));
    }
    if rounded > MAX_AMOUNT {
        return Err(LedgerError::InvalidAmount(format!(
            "amount must not exceed {MAX_AMOUNT}, got {amount}"
        )));
    }
    Ok(rounded)
}

/// Balance after applying a signed `amount`.
///
/// # Errors
/// Returns `InvalidAmount` when the result leaves the storable range.
pub fn checked_balance(balance: Decimal, amount: Decimal) -> Result<Decimal> {
    balance
        .checked_add(amount)
        .filter(|next| next.abs() <= MAX_AMOUNT)
        .ok_or_else(|| {
            LedgerError::InvalidAmount(format!(
                "applying {amount} to balance {balance} leaves the storable range"
            ))
        })
}

/// Converts processor minor units (cents) to dollars.
#[must_use]
pub fn dollars_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Per-minute rates applied to completed calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    /// What the user is charged.
    pub cost_per_minute: Decimal,
    /// Internal cost of serving a minute.
    pub base_cost_per_minute: Decimal,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            cost_per_minute: dec!(0.10),
            base_cost_per_minute: dec!(0.04),
        }
    }
}

impl Pricing {
    /// Prices a call. Costs are derived from seconds directly so rounding
    /// of the minute figure never leaks into the charged amount.
    #[must_use]
    pub fn charge_for(&self, call_id: CallId, duration_seconds: u64) -> UsageCharge {
        let seconds = Decimal::from(duration_seconds);
        let per_minute = Decimal::from(SECONDS_PER_MINUTE);
        let total_cost = round_money(seconds * self.cost_per_minute / per_minute);
        let base_cost = round_money(seconds * self.base_cost_per_minute / per_minute);

        UsageCharge {
            call_id,
            minutes: (seconds / per_minute)
                .round_dp_with_strategy(MINUTES_SCALE, RoundingStrategy::MidpointAwayFromZero)
                .normalize(),
            cost_rate: self.cost_per_minute,
            total_cost,
            base_cost,
            margin: total_cost - base_cost,
        }
    }
}

/// Priced usage for one call, ready to be settled against a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCharge {
    pub call_id: CallId,
    pub minutes: Decimal,
    pub cost_rate: Decimal,
    pub total_cost: Decimal,
    pub base_cost: Decimal,
    pub margin: Decimal,
}

impl UsageCharge {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.total_cost.is_zero()
    }

    /// A call-correlated debit already in the log only settles this charge
    /// when it moved exactly the charged amount.
    ///
    /// # Errors
    /// Returns `InvalidInput` when the amounts differ.
    pub fn check_existing_debit(&self, transaction: &Transaction) -> Result<()> {
        if transaction.amount == -self.total_cost {
            return Ok(());
        }
        Err(LedgerError::InvalidInput(format!(
            "call {} already has a debit of {} that does not match its usage cost {}",
            self.call_id, transaction.amount, self.total_cost
        )))
    }

    #[must_use]
    pub fn description(&self) -> String {
        format!("Voice call: {:.1} minutes", self.minutes.round_dp(1))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        checked_balance, dollars_from_cents, positive_amount, round_money, Pricing, MAX_AMOUNT,
    };
    use crate::error::LedgerError;
    use crate::types::{CallId, Transaction, TransactionType};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn two_minute_call_costs_twenty_cents_with_twelve_cent_margin() {
        let charge = Pricing::default().charge_for(CallId::new("A"), 120);

        assert_eq!(charge.minutes, dec!(2));
        assert_eq!(charge.total_cost, dec!(0.20));
        assert_eq!(charge.base_cost, dec!(0.08));
        assert_eq!(charge.margin, dec!(0.12));
        assert_eq!(charge.cost_rate, dec!(0.10));
    }

    #[test]
    fn partial_minutes_bill_to_sub_cent_precision() {
        let charge = Pricing::default().charge_for(CallId::new("B"), 100);

        assert_eq!(charge.minutes, dec!(1.6667));
        assert_eq!(charge.total_cost, dec!(0.166667));
        assert_eq!(charge.margin, charge.total_cost - charge.base_cost);
    }

    #[test]
    fn zero_duration_is_free() {
        assert!(Pricing::default().charge_for(CallId::new("C"), 0).is_free());
    }

    #[test]
    fn description_uses_one_decimal_minute() {
        let charge = Pricing::default().charge_for(CallId::new("D"), 90);

        assert_eq!(charge.description(), "Voice call: 1.5 minutes");
    }

    #[test]
    fn amounts_must_be_strictly_positive_after_rounding() {
        assert_eq!(positive_amount(dec!(10)).ok(), Some(dec!(10)));
        assert!(positive_amount(dec!(0)).is_err());
        assert!(positive_amount(dec!(-1)).is_err());
        assert!(positive_amount(dec!(0.0000001)).is_err());
    }

    #[test]
    fn amounts_beyond_column_range_are_rejected() {
        assert_eq!(positive_amount(MAX_AMOUNT).ok(), Some(MAX_AMOUNT));
        assert!(matches!(
            positive_amount(Decimal::MAX),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            positive_amount(dec!(1000000000000)),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn balance_arithmetic_stays_in_range() {
        assert_eq!(checked_balance(dec!(5), dec!(-0.2)).ok(), Some(dec!(4.8)));
        assert!(matches!(
            checked_balance(MAX_AMOUNT, dec!(1)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            checked_balance(Decimal::MAX, Decimal::MAX),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn existing_call_debit_must_match_charge() {
        let charge = Pricing::default().charge_for(CallId::new("A"), 120);
        let debit = |amount| Transaction {
            id: 1,
            wallet_id: Uuid::new_v4(),
            transaction_type: TransactionType::UsageDeduction,
            amount,
            balance_after: dec!(2),
            description: "manual".to_string(),
            payment_reference: None,
            call_id: Some(CallId::new("A")),
            created_at: Utc::now(),
        };

        assert!(charge.check_existing_debit(&debit(dec!(-0.200000))).is_ok());
        assert!(matches!(
            charge.check_existing_debit(&debit(dec!(-3))),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn cents_convert_to_dollars() {
        assert_eq!(dollars_from_cents(1050), dec!(10.50));
        assert_eq!(round_money(dec!(1.0000005)), dec!(1.000001));
    }
}
