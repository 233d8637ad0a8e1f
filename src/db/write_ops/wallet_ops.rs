use sqlx::Acquire;
use tracing::info;
use uuid::Uuid;

use super::helpers::{
    foreign_correlation, insert_transaction, lock_wallet, store_balance, unreadable_conflict,
};
use crate::db::mappers::wallet_from_row;
use crate::db::read_ops::{find_correlated, WalletRow, WALLET_COLUMNS};
use crate::db::LedgerDb;
use crate::error::{LedgerError, Result};
use crate::ledger_service::AppendOutcome;
use crate::types::{checked_balance, LedgerEntry, TransactionType, UserId, Wallet, WalletSeed};

impl LedgerDb {
    /// Inserts the wallet and its welcome bonus in one transaction. A
    /// concurrent opener blocks on the unique index and then reads the winner.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn open_wallet(&self, user_id: &UserId, seed: &WalletSeed) -> Result<Wallet> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| LedgerError::from_db("Failed to begin tx", &e))?;

        let conn = tx
            .acquire()
            .await
            .map_err(|e| LedgerError::from_db("Failed to acquire tx conn", &e))?;

        let created = sqlx::query_as::<_, WalletRow>(&format!(
            "INSERT INTO wallets (id, user_id, balance, low_balance_threshold)
             VALUES ($1, $2, 0, $3)
             ON CONFLICT (user_id) DO NOTHING
             RETURNING {WALLET_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id.value())
        .bind(seed.low_balance_threshold)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| LedgerError::from_db("Failed to create wallet", &e))?
        .map(wallet_from_row);

        let Some(wallet) = created else {
            tx.rollback()
                .await
                .map_err(|e| LedgerError::from_db("Failed to rollback tx", &e))?;
            return self.load_wallet(user_id).await?.ok_or_else(|| {
                LedgerError::StorageConflict(format!("wallet for {user_id} vanished after create"))
            });
        };

        let wallet = if seed.welcome_bonus > rust_decimal::Decimal::ZERO {
            let bonus = LedgerEntry {
                user_id: user_id.clone(),
                transaction_type: TransactionType::Bonus,
                amount: seed.welcome_bonus,
                correlation: None,
                description: seed.description.clone(),
            };
            insert_transaction(conn, wallet.id, &bonus, seed.welcome_bonus)
                .await?
                .ok_or_else(|| LedgerError::Internal("welcome bonus insert was skipped".to_string()))?;
            store_balance(conn, wallet.id, seed.welcome_bonus).await?
        } else {
            wallet
        };

        tx.commit()
            .await
            .map_err(|e| LedgerError::from_db("Failed to commit tx", &e))?;

        info!(user_id = %user_id, balance = %wallet.balance, "Opened wallet");
        Ok(wallet)
    }

    /// # Errors
    /// `WalletNotFound` when the user has no wallet, `InvalidInput` when the
    /// correlation key belongs to another wallet, and database failures.
    pub async fn append_entry(&self, entry: LedgerEntry) -> Result<AppendOutcome> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| LedgerError::from_db("Failed to begin tx", &e))?;

        let conn = tx
            .acquire()
            .await
            .map_err(|e| LedgerError::from_db("Failed to acquire tx conn", &e))?;

        let wallet = lock_wallet(conn, &entry.user_id)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound {
                user_id: entry.user_id.clone(),
            })?;
        let balance_after = checked_balance(wallet.balance, entry.amount)?;

        let Some(transaction) = insert_transaction(conn, wallet.id, &entry, balance_after).await?
        else {
            let key = entry.correlation.as_ref().ok_or_else(|| {
                LedgerError::Internal("append skipped without a correlation key".to_string())
            })?;
            let existing = find_correlated(&mut *conn, key, entry.transaction_type)
                .await?
                .ok_or_else(|| unreadable_conflict(key))?;
            tx.rollback()
                .await
                .map_err(|e| LedgerError::from_db("Failed to rollback tx", &e))?;
            if existing.wallet_id != wallet.id {
                return Err(foreign_correlation(key));
            }
            return Ok(AppendOutcome::Replayed {
                wallet,
                transaction: existing,
            });
        };

        let wallet = store_balance(conn, wallet.id, balance_after).await?;
        tx.commit()
            .await
            .map_err(|e| LedgerError::from_db("Failed to commit tx", &e))?;

        Ok(AppendOutcome::Applied {
            wallet,
            transaction,
        })
    }
}
