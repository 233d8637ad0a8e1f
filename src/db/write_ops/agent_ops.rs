use crate::db::LedgerDb;
use crate::error::{LedgerError, Result};
use crate::types::{AgentId, AgentStatus, UserId};

impl LedgerDb {
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn register_agent(
        &self,
        agent_id: &AgentId,
        user_id: &UserId,
        name: &str,
        status: AgentStatus,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO voice_agents (id, user_id, name, status) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE
             SET user_id = EXCLUDED.user_id,
                 name = EXCLUDED.name,
                 status = EXCLUDED.status,
                 updated_at = NOW()",
        )
        .bind(agent_id.value())
        .bind(user_id.value())
        .bind(name)
        .bind(status.as_str())
        .execute(self.pool())
        .await
        .map(|_result| ())
        .map_err(|e| LedgerError::from_db("Failed to register agent", &e))
    }

    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn move_agents(
        &self,
        user_id: &UserId,
        from: AgentStatus,
        to: AgentStatus,
    ) -> Result<u64> {
        sqlx::query(
            "UPDATE voice_agents SET status = $3, updated_at = NOW()
             WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id.value())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(self.pool())
        .await
        .map(|result| result.rows_affected())
        .map_err(|e| LedgerError::from_db("Failed to update agent status", &e))
    }
}
