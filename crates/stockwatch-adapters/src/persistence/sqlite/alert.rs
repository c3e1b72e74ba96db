use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockwatch_core::alert::Alert;
use stockwatch_core::ids::{AlertId, ProductId, RuleId};
use stockwatch_core::rule::RuleType;
use stockwatch_ports::error::PortError;
use stockwatch_ports::outbound::AlertRepository;
use stockwatch_ports::types::{AlertFilter, StockMetrics};

use super::SqliteDb;

fn decode(data: &str) -> Result<Alert, PortError> {
    serde_json::from_str(data).map_err(|e| PortError::Persistence(e.to_string()))
}

fn filter_clauses(filter: &AlertFilter, sql: &mut String, binds: &mut Vec<String>) {
    if let Some(status) = filter.status {
        sql.push_str(" AND status = ?");
        binds.push(status.as_str().to_string());
    }
    if let Some(rule_type) = filter.rule_type {
        sql.push_str(" AND rule_type = ?");
        binds.push(rule_type.as_str().to_string());
    }
    if let Some(search) = &filter.search {
        sql.push_str(" AND data LIKE ?");
        binds.push(format!("%{search}%"));
    }
}

#[async_trait]
impl AlertRepository for SqliteDb {
    async fn save(&self, alert: &Alert) -> Result<(), PortError> {
        let data =
            serde_json::to_string(alert).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO alerts (id, tenant_id, product_id, rule_id, rule_type, status, data, created_at, resolved_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id, tenant_id) DO UPDATE SET
                status = excluded.status,
                data = excluded.data,
                resolved_at = excluded.resolved_at",
        )
        .bind(alert.id().to_string())
        .bind(self.tenant_id())
        .bind(alert.product_id().to_string())
        .bind(alert.rule().rule_id.to_string())
        .bind(alert.rule().rule_type.as_str())
        .bind(alert.status().as_str())
        .bind(&data)
        .bind(alert.created_at().to_rfc3339())
        .bind(alert.resolved_at().map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &AlertId) -> Result<Option<Alert>, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM alerts WHERE id = ? AND tenant_id = ?")
                .bind(id.to_string())
                .bind(self.tenant_id())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn find_active_for_pair(
        &self,
        product_id: &ProductId,
        rule_id: &RuleId,
    ) -> Result<Option<Alert>, PortError> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT data FROM alerts
             WHERE tenant_id = ? AND product_id = ? AND rule_id = ? AND status = 'active'
             LIMIT 1",
        )
        .bind(self.tenant_id())
        .bind(product_id.to_string())
        .bind(rule_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn latest_resolution(
        &self,
        product_id: &ProductId,
        rule_type: RuleType,
    ) -> Result<Option<DateTime<Utc>>, PortError> {
        let row: (Option<String>,) = sqlx::query_as(
            "SELECT MAX(resolved_at) FROM alerts
             WHERE tenant_id = ? AND product_id = ? AND rule_type = ? AND resolved_at IS NOT NULL",
        )
        .bind(self.tenant_id())
        .bind(product_id.to_string())
        .bind(rule_type.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        row.0
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| PortError::Persistence(e.to_string()))
            })
            .transpose()
    }

    async fn find_page(&self, filter: &AlertFilter) -> Result<Vec<Alert>, PortError> {
        let mut sql = String::from("SELECT data FROM alerts WHERE tenant_id = ?");
        let mut binds = vec![self.tenant_id()];
        filter_clauses(filter, &mut sql, &mut binds);
        sql.push_str(" ORDER BY created_at DESC");

        let per_page = if filter.per_page == 0 {
            50
        } else {
            filter.per_page
        };
        let offset = u64::from(filter.page.saturating_sub(1)) * u64::from(per_page);
        sql.push_str(&format!(" LIMIT {per_page} OFFSET {offset}"));

        let mut query = sqlx::query_as::<_, (String,)>(&sql);
        for b in &binds {
            query = query.bind(b);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        rows.iter().map(|(data,)| decode(data)).collect()
    }

    async fn count(&self, filter: &AlertFilter) -> Result<u64, PortError> {
        let mut sql = String::from("SELECT COUNT(*) FROM alerts WHERE tenant_id = ?");
        let mut binds = vec![self.tenant_id()];
        filter_clauses(filter, &mut sql, &mut binds);

        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        for b in &binds {
            query = query.bind(b);
        }

        let (count,) = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;
        Ok(count as u64)
    }

    async fn metrics(&self, filter: &AlertFilter) -> Result<StockMetrics, PortError> {
        let mut sql = String::from(
            "SELECT
                COALESCE(SUM(CASE WHEN p.quantity = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN p.quantity > 0 AND p.quantity <= p.critical_threshold THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN p.quantity > p.critical_threshold AND p.quantity <= p.low_threshold THEN 1 ELSE 0 END), 0)
             FROM alerts a
             JOIN products p ON p.id = a.product_id AND p.tenant_id = a.tenant_id
             WHERE a.tenant_id = ?",
        );
        let mut binds = vec![self.tenant_id()];
        // same predicate as count/find_page, on the aliased table
        if let Some(status) = filter.status {
            sql.push_str(" AND a.status = ?");
            binds.push(status.as_str().to_string());
        }
        if let Some(rule_type) = filter.rule_type {
            sql.push_str(" AND a.rule_type = ?");
            binds.push(rule_type.as_str().to_string());
        }
        if let Some(search) = &filter.search {
            sql.push_str(" AND a.data LIKE ?");
            binds.push(format!("%{search}%"));
        }

        let mut query = sqlx::query_as::<_, (i64, i64, i64)>(&sql);
        for b in &binds {
            query = query.bind(b);
        }

        let (rupture, critical, low) = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(StockMetrics {
            rupture_items: rupture as u64,
            critical_items: critical as u64,
            low_items: low as u64,
        })
    }

    async fn purge_resolved_before(&self, cutoff: DateTime<Utc>) -> Result<u64, PortError> {
        let result = sqlx::query(
            "DELETE FROM alerts
             WHERE tenant_id = ? AND resolved_at IS NOT NULL AND resolved_at < ?",
        )
        .bind(self.tenant_id())
        .bind(cutoff.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(result.rows_affected())
    }
}
