use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Solvency as derived from the live balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceCheck {
    pub has_balance: bool,
    pub balance: Decimal,
    pub minimum_required: Decimal,
    pub shortfall: Decimal,
}

impl BalanceCheck {
    #[must_use]
    pub fn evaluate(balance: Decimal, minimum_required: Decimal) -> Self {
        let has_balance = balance >= minimum_required;
        Self {
            has_balance,
            balance,
            minimum_required,
            shortfall: if has_balance {
                Decimal::ZERO
            } else {
                minimum_required - balance
            },
        }
    }
}

/// Detail carried by an insufficient-balance condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortfall {
    pub balance: Decimal,
    pub required: Decimal,
    pub shortfall: Decimal,
}

impl Shortfall {
    #[must_use]
    pub fn new(balance: Decimal, required: Decimal) -> Self {
        Self {
            balance,
            required,
            shortfall: required - balance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BalanceCheck, Shortfall};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn balance_at_minimum_is_sufficient() {
        let check = BalanceCheck::evaluate(dec!(0.10), dec!(0.10));

        assert!(check.has_balance);
        assert_eq!(check.shortfall, Decimal::ZERO);
    }

    #[test]
    fn balance_below_minimum_reports_shortfall() {
        let check = BalanceCheck::evaluate(dec!(0.05), dec!(0.10));

        assert!(!check.has_balance);
        assert_eq!(check.shortfall, dec!(0.05));
    }

    #[test]
    fn shortfall_is_required_minus_balance() {
        assert_eq!(Shortfall::new(dec!(0.05), dec!(0.10)).shortfall, dec!(0.05));
    }
}
