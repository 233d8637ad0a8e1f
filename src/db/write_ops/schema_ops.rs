use crate::db::{LedgerDb, SCHEMA_SQL};
use crate::error::{LedgerError, Result};
use tracing::info;

impl LedgerDb {
    /// # Errors
    /// Returns an error if any DDL statement fails.
    pub async fn initialize_schema(&self) -> Result<()> {
        self.initialize_schema_from_sql(SCHEMA_SQL).await
    }

    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn initialize_schema_from_sql(&self, schema_sql: &str) -> Result<()> {
        sqlx::raw_sql(schema_sql)
            .execute(self.pool())
            .await
            .map(|_result| info!("Initialized ledger schema"))
            .map_err(|e| LedgerError::from_db("Failed to initialize schema", &e))
    }
}
