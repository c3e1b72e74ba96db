use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use stockwatch_ports::error::PortError;
use stockwatch_ports::outbound::EvaluationLock;

use super::SqliteDb;

/// Advisory per-tenant lock backed by a conditional upsert. The TTL
/// bounds how long a crashed run can block the next tick.
#[async_trait]
impl EvaluationLock for SqliteDb {
    async fn try_acquire(&self, now: DateTime<Utc>, ttl: Duration) -> Result<bool, PortError> {
        let result = sqlx::query(
            "INSERT INTO evaluation_locks (tenant_id, acquired_at, expires_at)
             VALUES (?, ?, ?)
             ON CONFLICT(tenant_id) DO UPDATE SET
                acquired_at = excluded.acquired_at,
                expires_at = excluded.expires_at
             WHERE evaluation_locks.expires_at <= ?",
        )
        .bind(self.tenant_id())
        .bind(now.to_rfc3339())
        .bind((now + ttl).to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn release(&self) -> Result<(), PortError> {
        sqlx::query("DELETE FROM evaluation_locks WHERE tenant_id = ?")
            .bind(self.tenant_id())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }
}
