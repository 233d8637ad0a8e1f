mod mappers;
mod read_ops;
mod store_adapter;
mod write_ops;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::error::{LedgerError, Result};

/// Idempotent DDL for every table the ledger touches.
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Postgres-backed ledger store.
#[derive(Clone)]
pub struct LedgerDb {
    pool: PgPool,
}

impl LedgerDb {
    /// # Errors
    /// Returns an error when the pool cannot connect.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(resolve_pool_max_connections())
            .connect(database_url)
            .await?;

        info!("Connected to PostgreSQL ledger database");
        Ok(Self { pool })
    }

    /// Like [`Self::new`] but gives up after `timeout_ms`.
    ///
    /// # Errors
    /// Returns `DatabaseError` on timeout or connection failure.
    pub async fn new_with_timeout(database_url: &str, timeout_ms: u64) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(resolve_pool_max_connections())
            .acquire_timeout(Duration::from_millis(timeout_ms))
            .connect(database_url)
            .await
            .map_err(|e| LedgerError::DatabaseError(format!("Failed to connect: {e}")))?;

        info!("Connected to PostgreSQL ledger database");
        Ok(Self { pool })
    }

    /// Create a new `LedgerDb` with an existing pool (for testing).
    #[must_use]
    pub const fn new_with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn resolve_pool_max_connections() -> u32 {
    resolve_pool_max_connections_from(|key| std::env::var(key).ok())
}

fn resolve_pool_max_connections_from<F>(env_lookup: F) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    env_lookup("LEDGER_DB_MAX_CONNECTIONS")
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS)
}
