mod alert;
mod escalation_queue;
mod event;
mod lock;
mod notification_queue;
mod product;
mod rule;
mod settings;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use stockwatch_core::ids::TenantId;
use stockwatch_ports::error::PortError;

/// Tenant-scoped handle over the shared SQLite pool. Every table carries
/// a tenant_id column and every query filters on it, so one handle can
/// never see another tenant's rows.
#[derive(Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
    tenant: TenantId,
}

impl SqliteDb {
    pub async fn new(url: &str, tenant: TenantId) -> Result<Self, PortError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| PortError::Connection(e.to_string()))?;

        let db = Self { pool, tenant };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), PortError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rules (
                id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (id, tenant_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS alerts (
                id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                product_id TEXT NOT NULL,
                rule_id TEXT NOT NULL,
                rule_type TEXT NOT NULL,
                status TEXT NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                resolved_at TEXT,
                PRIMARY KEY (id, tenant_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_alerts_pair
             ON alerts(tenant_id, product_id, rule_id, status)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts(tenant_id, status)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS products (
                id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                code TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                critical_threshold INTEGER NOT NULL,
                low_threshold INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (id, tenant_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS settings (
                tenant_id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS channel_configs (
                tenant_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (tenant_id, channel)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notifications (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                alert_id TEXT NOT NULL,
                channel TEXT NOT NULL,
                target TEXT NOT NULL,
                subject TEXT NOT NULL DEFAULT '',
                payload TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                next_attempt_at TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_notifications_pending
             ON notifications(tenant_id, status, next_attempt_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS escalation_steps (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                alert_id TEXT NOT NULL,
                level INTEGER NOT NULL,
                fires_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending'
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_escalation_steps_pending
             ON escalation_steps(tenant_id, status, fires_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS evaluation_locks (
                tenant_id TEXT PRIMARY KEY,
                acquired_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                data TEXT NOT NULL,
                occurred_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub(crate) fn tenant_id(&self) -> String {
        self.tenant.to_string()
    }
}
