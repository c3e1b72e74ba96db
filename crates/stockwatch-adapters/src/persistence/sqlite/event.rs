use async_trait::async_trait;

use stockwatch_core::events::DomainEvent;
use stockwatch_ports::error::PortError;
use stockwatch_ports::outbound::EventPublisher;

use super::SqliteDb;

#[async_trait]
impl EventPublisher for SqliteDb {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError> {
        for event in &events {
            let data =
                serde_json::to_string(event).map_err(|e| PortError::Persistence(e.to_string()))?;

            sqlx::query(
                "INSERT INTO events (tenant_id, event_type, data, occurred_at) VALUES (?, ?, ?, ?)",
            )
            .bind(self.tenant_id())
            .bind(event.event_type())
            .bind(&data)
            .bind(event.occurred_at().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        }
        Ok(())
    }
}
