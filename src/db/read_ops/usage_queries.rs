use chrono::{DateTime, Utc};

use crate::db::mappers::{daily_from_row, totals_from_row, usage_from_row};
use crate::db::LedgerDb;
use crate::error::{LedgerError, Result};
use crate::types::{CallId, DailyUsage, UsageRecord, UsageTotals, UserId};

use super::types::{DailyUsageRow, UsageRow, UsageTotalsRow, USAGE_COLUMNS};

impl LedgerDb {
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn usage_by_call(&self, call_id: &CallId) -> Result<Option<UsageRecord>> {
        sqlx::query_as::<_, UsageRow>(&format!(
            "SELECT {USAGE_COLUMNS} FROM voice_usage WHERE call_id = $1"
        ))
        .bind(call_id.value())
        .fetch_optional(self.pool())
        .await
        .map(|row| row.map(usage_from_row))
        .map_err(|e| LedgerError::from_db("Failed to load usage", &e))
    }

    /// A `None` lower bound is passed as NULL and disables the window.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn usage_since(
        &self,
        user_id: &UserId,
        since: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<Vec<UsageRecord>> {
        sqlx::query_as::<_, UsageRow>(&format!(
            "SELECT {USAGE_COLUMNS} FROM voice_usage
             WHERE user_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3"
        ))
        .bind(user_id.value())
        .bind(since)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map(|rows| rows.into_iter().map(usage_from_row).collect())
        .map_err(|e| LedgerError::from_db("Failed to list usage", &e))
    }

    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn usage_totals_since(
        &self,
        user_id: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<UsageTotals> {
        sqlx::query_as::<_, UsageTotalsRow>(
            "SELECT COALESCE(SUM(minutes), 0) AS total_minutes,
                    COALESCE(SUM(total_cost), 0) AS total_cost,
                    COALESCE(SUM(margin), 0) AS total_margin,
                    COUNT(*) AS call_count
             FROM voice_usage
             WHERE user_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2)",
        )
        .bind(user_id.value())
        .bind(since)
        .fetch_one(self.pool())
        .await
        .map(totals_from_row)
        .map_err(|e| LedgerError::from_db("Failed to total usage", &e))
    }

    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn daily_usage_since(
        &self,
        user_id: &UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<DailyUsage>> {
        sqlx::query_as::<_, DailyUsageRow>(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                    SUM(minutes) AS minutes,
                    SUM(total_cost) AS total_cost,
                    COUNT(*) AS call_count
             FROM voice_usage
             WHERE user_id = $1 AND ($2::timestamptz IS NULL OR created_at >= $2)
             GROUP BY day
             ORDER BY day",
        )
        .bind(user_id.value())
        .bind(since)
        .fetch_all(self.pool())
        .await
        .map(|rows| rows.into_iter().map(daily_from_row).collect())
        .map_err(|e| LedgerError::from_db("Failed to aggregate daily usage", &e))
    }
}
