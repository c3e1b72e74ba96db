use stockwatch_core::notification::ChannelConfig;
use stockwatch_core::settings::GlobalAlertSettings;
use stockwatch_ports::outbound::SettingsRepository;

use crate::error::AppError;

/// Boundary for global settings and per-channel provider configs.
/// Everything is validated here, once, before it is persisted.
pub struct SettingsService<S>
where
    S: SettingsRepository,
{
    settings: S,
}

impl<S> SettingsService<S>
where
    S: SettingsRepository,
{
    pub fn new(settings: S) -> Self {
        Self { settings }
    }

    pub async fn load(&self) -> Result<GlobalAlertSettings, AppError> {
        Ok(self.settings.load_settings().await?)
    }

    pub async fn update(&self, settings: GlobalAlertSettings) -> Result<(), AppError> {
        settings.validate()?;
        self.settings.save_settings(&settings).await?;
        Ok(())
    }

    pub async fn channel_configs(&self) -> Result<Vec<ChannelConfig>, AppError> {
        Ok(self.settings.load_channel_configs().await?)
    }

    pub async fn configure_channel(&self, config: ChannelConfig) -> Result<(), AppError> {
        config.validate()?;
        self.settings.save_channel_config(&config).await?;
        Ok(())
    }
}
