use async_trait::async_trait;

use stockwatch_core::ids::RuleId;
use stockwatch_core::rule::ThresholdRule;
use stockwatch_ports::error::PortError;
use stockwatch_ports::outbound::RuleRepository;

use super::SqliteDb;

fn decode(data: &str) -> Result<ThresholdRule, PortError> {
    serde_json::from_str(data).map_err(|e| PortError::Persistence(e.to_string()))
}

#[async_trait]
impl RuleRepository for SqliteDb {
    async fn save(&self, rule: &ThresholdRule) -> Result<(), PortError> {
        let data =
            serde_json::to_string(rule).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO rules (id, tenant_id, is_active, data)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id, tenant_id) DO UPDATE SET
                is_active = excluded.is_active,
                data = excluded.data",
        )
        .bind(rule.id().to_string())
        .bind(self.tenant_id())
        .bind(rule.is_active())
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &RuleId) -> Result<Option<ThresholdRule>, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM rules WHERE id = ? AND tenant_id = ?")
                .bind(id.to_string())
                .bind(self.tenant_id())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn delete(&self, id: &RuleId) -> Result<(), PortError> {
        let result = sqlx::query("DELETE FROM rules WHERE id = ? AND tenant_id = ?")
            .bind(id.to_string())
            .bind(self.tenant_id())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ThresholdRule>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT data FROM rules WHERE tenant_id = ?")
            .bind(self.tenant_id())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        rows.iter().map(|(data,)| decode(data)).collect()
    }

    async fn list_active(&self) -> Result<Vec<ThresholdRule>, PortError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data FROM rules WHERE tenant_id = ? AND is_active = 1")
                .bind(self.tenant_id())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        rows.iter().map(|(data,)| decode(data)).collect()
    }
}
