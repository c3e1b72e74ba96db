use async_trait::async_trait;

use stockwatch_core::notification::ChannelConfig;
use stockwatch_core::settings::GlobalAlertSettings;
use stockwatch_ports::error::PortError;
use stockwatch_ports::outbound::SettingsRepository;

use super::SqliteDb;

#[async_trait]
impl SettingsRepository for SqliteDb {
    async fn load_settings(&self) -> Result<GlobalAlertSettings, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM settings WHERE tenant_id = ?")
                .bind(self.tenant_id())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| PortError::Persistence(e.to_string()))?;

        match row {
            Some((data,)) => {
                serde_json::from_str(&data).map_err(|e| PortError::Persistence(e.to_string()))
            }
            None => Ok(GlobalAlertSettings::default()),
        }
    }

    async fn save_settings(&self, settings: &GlobalAlertSettings) -> Result<(), PortError> {
        let data =
            serde_json::to_string(settings).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO settings (tenant_id, data) VALUES (?, ?)
             ON CONFLICT(tenant_id) DO UPDATE SET data = excluded.data",
        )
        .bind(self.tenant_id())
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn load_channel_configs(&self) -> Result<Vec<ChannelConfig>, PortError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data FROM channel_configs WHERE tenant_id = ?")
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

    async fn save_channel_config(&self, config: &ChannelConfig) -> Result<(), PortError> {
        let data =
            serde_json::to_string(config).map_err(|e| PortError::Persistence(e.to_string()))?;

        sqlx::query(
            "INSERT INTO channel_configs (tenant_id, channel, data) VALUES (?, ?, ?)
             ON CONFLICT(tenant_id, channel) DO UPDATE SET data = excluded.data",
        )
        .bind(self.tenant_id())
        .bind(config.channel().as_str())
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Persistence(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwatch_core::ids::TenantId;
    use stockwatch_core::notification::{EmailConfig, SmsConfig};

    async fn db() -> SqliteDb {
        SqliteDb::new("sqlite::memory:", TenantId::new()).await.unwrap()
    }

    #[tokio::test]
    async fn load_returns_defaults_when_unset() {
        let db = db().await;
        let settings = db.load_settings().await.unwrap();
        assert!(settings.system_enabled);
        assert_eq!(settings.check_frequency_minutes, 30);
    }

    #[tokio::test]
    async fn save_and_reload_settings() {
        let db = db().await;
        let settings = GlobalAlertSettings {
            check_frequency_minutes: 10,
            max_alerts_per_hour: 5,
            ..Default::default()
        };
        db.save_settings(&settings).await.unwrap();

        let loaded = db.load_settings().await.unwrap();
        assert_eq!(loaded.check_frequency_minutes, 10);
        assert_eq!(loaded.max_alerts_per_hour, 5);
    }

    #[tokio::test]
    async fn channel_config_upserts_per_channel() {
        let db = db().await;
        db.save_channel_config(&ChannelConfig::Email(EmailConfig {
            enabled: true,
            smtp_host: "smtp.test".into(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_address: "a@test".into(),
            template: String::new(),
        }))
        .await
        .unwrap();
        db.save_channel_config(&ChannelConfig::Sms(SmsConfig {
            enabled: false,
            gateway_url: "https://sms.test".into(),
            api_key: "k".into(),
            sender_id: "PHARMA".into(),
            template: String::new(),
        }))
        .await
        .unwrap();

        // saving email again replaces, not duplicates
        db.save_channel_config(&ChannelConfig::Email(EmailConfig {
            enabled: false,
            smtp_host: "smtp2.test".into(),
            smtp_port: 465,
            username: String::new(),
            password: String::new(),
            from_address: "b@test".into(),
            template: String::new(),
        }))
        .await
        .unwrap();

        let configs = db.load_channel_configs().await.unwrap();
        assert_eq!(configs.len(), 2);
        let email = configs
            .iter()
            .find(|c| matches!(c, ChannelConfig::Email(_)))
            .unwrap();
        assert!(!email.enabled());
    }
}
