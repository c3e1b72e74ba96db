use async_trait::async_trait;

use stockwatch_core::ids::ProductId;
use stockwatch_core::product::ProductRecord;
use stockwatch_ports::error::PortError;
use stockwatch_ports::outbound::ProductRepository;

use super::SqliteDb;

impl SqliteDb {
    /// Entry point for inventory sync. The alert engine itself only ever
    /// reads products; the surrounding application pushes them in here.
    pub async fn upsert_product(&self, product: &ProductRecord) -> Result<(), PortError> {
        let data =
            serde_json::to_string(product).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO products (id, tenant_id, code, quantity, critical_threshold, low_threshold, data)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id, tenant_id) DO UPDATE SET
                code = excluded.code,
                quantity = excluded.quantity,
                critical_threshold = excluded.critical_threshold,
                low_threshold = excluded.low_threshold,
                data = excluded.data",
        )
        .bind(product.id.to_string())
        .bind(self.tenant_id())
        .bind(&product.code)
        .bind(product.quantity)
        .bind(product.critical_threshold)
        .bind(product.low_threshold)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl ProductRepository for SqliteDb {
    async fn list_all(&self) -> Result<Vec<ProductRecord>, PortError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data FROM products WHERE tenant_id = ? ORDER BY code")
                .bind(self.tenant_id())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        rows.iter()
            .map(|(data,)| {
                serde_json::from_str(data).map_err(|e| PortError::Persistence(e.to_string()))
            })
            .collect()
    }

    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<ProductRecord>, PortError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT data FROM products WHERE tenant_id = ? AND id IN ({placeholders})"
        );

        let mut query = sqlx::query_as::<_, (String,)>(&sql).bind(self.tenant_id());
        for id in ids {
            query = query.bind(id.to_string());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        rows.iter()
            .map(|(data,)| {
                serde_json::from_str(data).map_err(|e| PortError::Persistence(e.to_string()))
            })
            .collect()
    }
}
