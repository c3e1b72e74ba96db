use async_trait::async_trait;

use stockwatch_core::channel::Channel;
use stockwatch_core::notification::WhatsAppConfig;
use stockwatch_ports::error::NotifyError;
use stockwatch_ports::outbound::Notifier;
use stockwatch_ports::types::{Notification, NotifyResult};

const SEND_TIMEOUT_SECS: u64 = 10;

/// WhatsApp Business Cloud API client. Sends plain text messages through
/// the `/{phone_number_id}/messages` endpoint.
pub struct WhatsAppNotifier {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl WhatsAppNotifier {
    pub fn new(config: &WhatsAppConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .map_err(|_| NotifyError::ChannelUnavailable)?;
        let endpoint = format!(
            "{}/{}/messages",
            config.api_url.trim_end_matches('/'),
            config.phone_number_id
        );
        Ok(Self {
            client,
            endpoint,
            access_token: config.access_token.clone(),
        })
    }
}

#[async_trait]
impl Notifier for WhatsAppNotifier {
    async fn send(&self, notification: &Notification) -> Result<NotifyResult, NotifyError> {
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": notification.target,
            "type": "text",
            "text": { "body": notification.body },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NotifyError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(NotifyError::DeliveryFailed(format!(
                "api returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        Ok(NotifyResult {
            external_id: body["messages"][0]["id"].as_str().map(str::to_string),
            ..Default::default()
        })
    }

    fn channel(&self) -> Channel {
        Channel::WhatsApp
    }
}
