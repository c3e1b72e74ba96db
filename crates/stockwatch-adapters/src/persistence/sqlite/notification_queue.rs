use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockwatch_core::channel::Channel;
use stockwatch_core::ids::AlertId;
use stockwatch_ports::error::PortError;
use stockwatch_ports::outbound::NotificationQueue;
use stockwatch_ports::types::{PendingNotification, QueueStatus};

use super::SqliteDb;

fn str_to_channel(s: &str) -> Result<Channel, PortError> {
    match s {
        "dashboard" => Ok(Channel::Dashboard),
        "email" => Ok(Channel::Email),
        "sms" => Ok(Channel::Sms),
        "whatsapp" => Ok(Channel::WhatsApp),
        other => Err(PortError::Persistence(format!("unknown channel: {other}"))),
    }
}

fn status_to_str(s: &QueueStatus) -> &'static str {
    match s {
        QueueStatus::Pending => "pending",
        QueueStatus::Sent => "sent",
        QueueStatus::Failed => "failed",
        QueueStatus::Dead => "dead",
    }
}

#[async_trait]
impl NotificationQueue for SqliteDb {
    async fn enqueue(&self, notification: PendingNotification) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO notifications (id, tenant_id, alert_id, channel, target, subject, payload, status, next_attempt_at, retry_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&notification.id)
        .bind(self.tenant_id())
        .bind(notification.alert_id.to_string())
        .bind(notification.channel.as_str())
        .bind(&notification.target)
        .bind(&notification.subject)
        .bind(&notification.payload)
        .bind(status_to_str(&notification.status))
        .bind(notification.next_attempt_at.to_rfc3339())
        .bind(notification.retry_count)
        .bind(notification.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn poll_pending(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PendingNotification>, PortError> {
        let rows: Vec<(String, String, String, String, String, String, String, i32, String)> =
            sqlx::query_as(
                "SELECT id, alert_id, channel, target, subject, payload, next_attempt_at, retry_count, created_at
                 FROM notifications
                 WHERE tenant_id = ? AND status = 'pending' AND next_attempt_at <= ?
                 ORDER BY next_attempt_at ASC",
            )
            .bind(self.tenant_id())
            .bind(now.to_rfc3339())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        let mut result = Vec::with_capacity(rows.len());
        for (id, alert_id, channel, target, subject, payload, next_attempt, retry_count, created_at) in
            rows
        {
            result.push(PendingNotification {
                id,
                alert_id: AlertId::parse(&alert_id)
                    .map_err(|e| PortError::Persistence(e.to_string()))?,
                channel: str_to_channel(&channel)?,
                target,
                subject,
                payload,
                status: QueueStatus::Pending,
                next_attempt_at: DateTime::parse_from_rfc3339(&next_attempt)
                    .map_err(|e| PortError::Persistence(e.to_string()))?
                    .with_timezone(&Utc),
                retry_count: retry_count as u32,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(|e| PortError::Persistence(e.to_string()))?
                    .with_timezone(&Utc),
            });
        }
        Ok(result)
    }

    async fn mark_sent(&self, id: &str) -> Result<(), PortError> {
        sqlx::query("UPDATE notifications SET status = 'sent' WHERE id = ? AND tenant_id = ?")
            .bind(id)
            .bind(self.tenant_id())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        next_attempt: DateTime<Utc>,
    ) -> Result<(), PortError> {
        // stays pending so the next flush retries it at next_attempt
        sqlx::query(
            "UPDATE notifications SET next_attempt_at = ?, retry_count = retry_count + 1
             WHERE id = ? AND tenant_id = ?",
        )
        .bind(next_attempt.to_rfc3339())
        .bind(id)
        .bind(self.tenant_id())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        tracing::warn!(notification_id = id, error, "notification send failed, requeued");
        Ok(())
    }

    async fn mark_dead(&self, id: &str) -> Result<(), PortError> {
        sqlx::query("UPDATE notifications SET status = 'dead' WHERE id = ? AND tenant_id = ?")
            .bind(id)
            .bind(self.tenant_id())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(())
    }
}
