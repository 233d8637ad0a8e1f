use sqlx::Acquire;

use super::helpers::{
    foreign_correlation, insert_transaction, insert_usage, lock_wallet, store_balance,
    unreadable_conflict,
};
use crate::db::read_ops::find_correlated;
use crate::db::LedgerDb;
use crate::error::{LedgerError, Result};
use crate::ledger_service::{Settlement, SettlementRequest};
use crate::types::{checked_balance, CorrelationKey, LedgerEntry, TransactionType};

impl LedgerDb {
    /// Usage row and debit commit together or not at all. The wallet lock is
    /// taken first so a concurrent charge for the same user waits here.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn settle_call_usage(&self, request: SettlementRequest) -> Result<Settlement> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| LedgerError::from_db("Failed to begin tx", &e))?;

        let conn = tx
            .acquire()
            .await
            .map_err(|e| LedgerError::from_db("Failed to acquire tx conn", &e))?;

        let charge = &request.charge;
        let settled = match lock_wallet(conn, &request.user_id).await? {
            None => insert_usage(conn, &request, None)
                .await?
                .map(|usage| Settlement::NoWallet { usage }),
            Some(wallet) if wallet.balance < charge.total_cost => insert_usage(conn, &request, None)
                .await?
                .map(|usage| Settlement::Unpaid {
                    usage,
                    balance: wallet.balance,
                }),
            Some(wallet) => {
                let key = CorrelationKey::Call(charge.call_id.clone());
                let entry = LedgerEntry {
                    user_id: request.user_id.clone(),
                    transaction_type: TransactionType::UsageDeduction,
                    amount: -charge.total_cost,
                    correlation: Some(key.clone()),
                    description: request.description.clone(),
                };
                let balance_after = checked_balance(wallet.balance, entry.amount)?;

                let (wallet, transaction) =
                    match insert_transaction(conn, wallet.id, &entry, balance_after).await? {
                        Some(transaction) => {
                            (store_balance(conn, wallet.id, balance_after).await?, transaction)
                        }
                        None => {
                            let existing =
                                find_correlated(&mut *conn, &key, TransactionType::UsageDeduction)
                                    .await?
                                    .ok_or_else(|| unreadable_conflict(&key))?;
                            if existing.wallet_id != wallet.id {
                                return Err(foreign_correlation(&key));
                            }
                            charge.check_existing_debit(&existing)?;
                            (wallet, existing)
                        }
                    };

                insert_usage(conn, &request, Some(transaction.id))
                    .await?
                    .map(|usage| Settlement::Charged {
                        usage,
                        wallet,
                        transaction,
                    })
            }
        };

        if let Some(settlement) = settled {
            tx.commit()
                .await
                .map_err(|e| LedgerError::from_db("Failed to commit tx", &e))?;
            return Ok(settlement);
        }

        tx.rollback()
            .await
            .map_err(|e| LedgerError::from_db("Failed to rollback tx", &e))?;
        self.usage_by_call(&request.charge.call_id)
            .await?
            .map(|usage| Settlement::AlreadyRecorded { usage })
            .ok_or_else(|| {
                LedgerError::StorageConflict(format!(
                    "usage for call {} conflicted but could not be read back",
                    request.charge.call_id
                ))
            })
    }
}
