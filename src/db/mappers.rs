use crate::db::read_ops::{
    AuditRow, DailyUsageRow, TransactionRow, UsageRow, UsageTotalsRow, WalletRow,
};
use crate::error::{LedgerError, Result};
use crate::types::{
    CallId, DailyUsage, PaymentReference, Transaction, TransactionType, UsageRecord, UsageTotals,
    UserId, Wallet, WalletAudit,
};

// NUMERIC columns come back at full column scale; normalize so 4.800000 reads as 4.8.

pub fn wallet_from_row(row: WalletRow) -> Wallet {
    Wallet {
        id: row.id,
        user_id: UserId::new(row.user_id),
        balance: row.balance.normalize(),
        low_balance_threshold: row.low_balance_threshold.normalize(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub fn transaction_from_row(row: TransactionRow) -> Result<Transaction> {
    let transaction_type = TransactionType::try_from(row.transaction_type.as_str())
        .map_err(LedgerError::DatabaseError)?;

    Ok(Transaction {
        id: row.id,
        wallet_id: row.wallet_id,
        transaction_type,
        amount: row.amount.normalize(),
        balance_after: row.balance_after.normalize(),
        description: row.description,
        payment_reference: row.payment_reference.map(PaymentReference::new),
        call_id: row.call_id.map(CallId::new),
        created_at: row.created_at,
    })
}

pub fn usage_from_row(row: UsageRow) -> UsageRecord {
    UsageRecord {
        id: row.id,
        user_id: UserId::new(row.user_id),
        call_id: CallId::new(row.call_id),
        minutes: row.minutes.normalize(),
        cost_rate: row.cost_rate.normalize(),
        total_cost: row.total_cost.normalize(),
        base_cost: row.base_cost.normalize(),
        margin: row.margin.normalize(),
        transaction_id: row.transaction_id,
        created_at: row.created_at,
    }
}

pub fn totals_from_row(row: UsageTotalsRow) -> UsageTotals {
    UsageTotals {
        total_minutes: row.total_minutes.normalize(),
        total_cost: row.total_cost.normalize(),
        total_margin: row.total_margin.normalize(),
        call_count: row.call_count,
    }
}

pub fn daily_from_row(row: DailyUsageRow) -> DailyUsage {
    DailyUsage {
        day: row.day,
        minutes: row.minutes.normalize(),
        total_cost: row.total_cost.normalize(),
        call_count: row.call_count,
    }
}

pub fn audit_from_row(user_id: &UserId, row: AuditRow) -> WalletAudit {
    WalletAudit {
        user_id: user_id.clone(),
        balance: row.balance.normalize(),
        ledger_sum: row.ledger_sum.normalize(),
        last_balance_after: row.last_balance_after.map(|balance| balance.normalize()),
        transaction_count: row.transaction_count,
    }
}

#[cfg(test)]
mod tests {
    use super::{audit_from_row, transaction_from_row, wallet_from_row};
    use crate::db::read_ops::{AuditRow, TransactionRow, WalletRow};
    use crate::types::UserId;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn numeric_scale_is_normalized() {
        let wallet = wallet_from_row(WalletRow {
            id: Uuid::new_v4(),
            user_id: "u".to_string(),
            balance: dec!(4.800000),
            low_balance_threshold: dec!(5.000000),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });

        assert_eq!(wallet.balance.to_string(), "4.8");
        assert_eq!(wallet.low_balance_threshold.to_string(), "5");
    }

    #[test]
    fn unknown_transaction_type_is_a_database_error() {
        let row = TransactionRow {
            id: 1,
            wallet_id: Uuid::new_v4(),
            transaction_type: "chargeback".to_string(),
            amount: dec!(1),
            balance_after: dec!(1),
            description: String::new(),
            payment_reference: None,
            call_id: None,
            created_at: Utc::now(),
        };

        assert!(transaction_from_row(row).is_err());
    }

    #[test]
    fn audit_row_is_normalized_including_last_balance() {
        let audit = audit_from_row(
            &UserId::new("u"),
            AuditRow {
                balance: dec!(4.800000),
                ledger_sum: dec!(4.800000),
                last_balance_after: Some(dec!(4.800000)),
                transaction_count: 2,
            },
        );

        assert_eq!(audit.last_balance_after.map(|last| last.to_string()), Some("4.8".to_string()));
        assert!(audit.is_consistent());
    }
}
