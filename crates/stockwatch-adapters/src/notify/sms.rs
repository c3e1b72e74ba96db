use async_trait::async_trait;

use stockwatch_core::channel::Channel;
use stockwatch_core::notification::SmsConfig;
use stockwatch_ports::error::NotifyError;
use stockwatch_ports::outbound::Notifier;
use stockwatch_ports::types::{Notification, NotifyResult};

const SEND_TIMEOUT_SECS: u64 = 10;

/// Provider-pluggable SMS gateway: a JSON POST with bearer auth, which is
/// the wire shape most aggregators accept.
pub struct SmsNotifier {
    client: reqwest::Client,
    gateway_url: String,
    api_key: String,
    sender_id: String,
}

impl SmsNotifier {
    pub fn new(config: &SmsConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .map_err(|_| NotifyError::ChannelUnavailable)?;
        Ok(Self {
            client,
            gateway_url: config.gateway_url.clone(),
            api_key: config.api_key.clone(),
            sender_id: config.sender_id.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmsNotifier {
    async fn send(&self, notification: &Notification) -> Result<NotifyResult, NotifyError> {
        let payload = serde_json::json!({
            "to": notification.target,
            "from": self.sender_id,
            "body": notification.body,
        });

        let response = self
            .client
            .post(&self.gateway_url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NotifyError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(NotifyError::DeliveryFailed(format!(
                "gateway returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        Ok(NotifyResult {
            external_id: body["message_id"].as_str().map(str::to_string),
            ..Default::default()
        })
    }

    fn channel(&self) -> Channel {
        Channel::Sms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_config() {
        let notifier = SmsNotifier::new(&SmsConfig {
            enabled: true,
            gateway_url: "https://sms.gateway.test/v1/send".into(),
            api_key: "key".into(),
            sender_id: "PHARMACY".into(),
            template: String::new(),
        })
        .unwrap();
        assert_eq!(notifier.channel(), Channel::Sms);
    }
}
