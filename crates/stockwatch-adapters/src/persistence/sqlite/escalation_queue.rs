use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockwatch_core::ids::AlertId;
use stockwatch_ports::error::PortError;
use stockwatch_ports::outbound::EscalationQueue;
use stockwatch_ports::types::{PendingEscalation, QueueStatus};

use super::SqliteDb;

#[async_trait]
impl EscalationQueue for SqliteDb {
    async fn enqueue_step(&self, step: PendingEscalation) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO escalation_steps (id, tenant_id, alert_id, level, fires_at, status)
             VALUES (?, ?, ?, ?, ?, 'pending')",
        )
        .bind(&step.id)
        .bind(self.tenant_id())
        .bind(step.alert_id.to_string())
        .bind(step.level)
        .bind(step.fires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn poll_due(&self, now: DateTime<Utc>) -> Result<Vec<PendingEscalation>, PortError> {
        let rows: Vec<(String, String, i32, String)> = sqlx::query_as(
            "SELECT id, alert_id, level, fires_at
             FROM escalation_steps
             WHERE tenant_id = ? AND status = 'pending' AND fires_at <= ?
             ORDER BY fires_at ASC",
        )
        .bind(self.tenant_id())
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut result = Vec::with_capacity(rows.len());
        for (id, alert_id, level, fires_at) in rows {
            result.push(PendingEscalation {
                id,
                alert_id: AlertId::parse(&alert_id)
                    .map_err(|e| PortError::Persistence(e.to_string()))?,
                level: level as u32,
                fires_at: DateTime::parse_from_rfc3339(&fires_at)
                    .map_err(|e| PortError::Persistence(e.to_string()))?
                    .with_timezone(&Utc),
                status: QueueStatus::Pending,
            });
        }
        Ok(result)
    }

    async fn cancel_for_alert(&self, alert_id: &AlertId) -> Result<(), PortError> {
        sqlx::query(
            "UPDATE escalation_steps SET status = 'cancelled'
             WHERE tenant_id = ? AND alert_id = ? AND status = 'pending'",
        )
        .bind(self.tenant_id())
        .bind(alert_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn mark_fired(&self, id: &str) -> Result<(), PortError> {
        sqlx::query(
            "UPDATE escalation_steps SET status = 'fired' WHERE id = ? AND tenant_id = ?",
        )
        .bind(id)
        .bind(self.tenant_id())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }
}
