use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use stockwatch_core::channel::Channel;
use stockwatch_core::notification::EmailConfig;
use stockwatch_ports::error::NotifyError;
use stockwatch_ports::outbound::Notifier;
use stockwatch_ports::types::{Notification, NotifyResult};

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, NotifyError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|_| NotifyError::ChannelUnavailable)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();
        let from = config
            .from_address
            .parse()
            .map_err(|_| NotifyError::InvalidTarget)?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<NotifyResult, NotifyError> {
        let to: Mailbox = notification
            .target
            .parse()
            .map_err(|_| NotifyError::InvalidTarget)?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&notification.subject)
            .body(notification.body.clone())
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::DeliveryFailed(e.to_string()))?;
        Ok(NotifyResult::default())
    }

    fn channel(&self) -> Channel {
        Channel::Email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            smtp_host: "smtp.pharmacy.test".into(),
            smtp_port: 587,
            username: "alerts".into(),
            password: "secret".into(),
            from_address: "alerts@pharmacy.test".into(),
            template: String::new(),
        }
    }

    #[test]
    fn builds_from_valid_config() {
        let notifier = EmailNotifier::new(&config()).unwrap();
        assert_eq!(notifier.channel(), Channel::Email);
    }

    #[test]
    fn invalid_from_address_rejected() {
        let result = EmailNotifier::new(&EmailConfig {
            from_address: "not an address".into(),
            ..config()
        });
        assert!(matches!(result, Err(NotifyError::InvalidTarget)));
    }
}
