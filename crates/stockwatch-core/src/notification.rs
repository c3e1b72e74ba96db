use serde::{Deserialize, Serialize};

use crate::alert::Alert;
use crate::channel::Channel;
use crate::error::DomainError;

/// Per-channel provider settings. One variant per provider channel so a
/// config is validated once at the boundary instead of being a loose
/// key-value map checked ad hoc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChannelConfig {
    Email(EmailConfig),
    Sms(SmsConfig),
    WhatsApp(WhatsAppConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub enabled: bool,
    pub gateway_url: String,
    pub api_key: String,
    pub sender_id: String,
    pub template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    pub enabled: bool,
    pub api_url: String,
    pub access_token: String,
    pub phone_number_id: String,
    pub template: String,
}

impl ChannelConfig {
    pub fn channel(&self) -> Channel {
        match self {
            Self::Email(_) => Channel::Email,
            Self::Sms(_) => Channel::Sms,
            Self::WhatsApp(_) => Channel::WhatsApp,
        }
    }

    /// Channel-level kill switch; dispatch also requires rule-level
    /// opt-in and the global system switch.
    pub fn enabled(&self) -> bool {
        match self {
            Self::Email(c) => c.enabled,
            Self::Sms(c) => c.enabled,
            Self::WhatsApp(c) => c.enabled,
        }
    }

    pub fn template(&self) -> &str {
        match self {
            Self::Email(c) => &c.template,
            Self::Sms(c) => &c.template,
            Self::WhatsApp(c) => &c.template,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Self::Email(c) => {
                if c.smtp_host.is_empty() {
                    return Err(DomainError::ChannelConfigIncomplete("smtp host"));
                }
                if c.smtp_port == 0 {
                    return Err(DomainError::ChannelConfigIncomplete("smtp port"));
                }
                if c.from_address.is_empty() {
                    return Err(DomainError::ChannelConfigIncomplete("from address"));
                }
            }
            Self::Sms(c) => {
                if c.gateway_url.is_empty() {
                    return Err(DomainError::ChannelConfigIncomplete("gateway url"));
                }
                if c.sender_id.is_empty() {
                    return Err(DomainError::ChannelConfigIncomplete("sender id"));
                }
            }
            Self::WhatsApp(c) => {
                if c.api_url.is_empty() {
                    return Err(DomainError::ChannelConfigIncomplete("api url"));
                }
                if c.phone_number_id.is_empty() {
                    return Err(DomainError::ChannelConfigIncomplete("phone number id"));
                }
            }
        }
        Ok(())
    }
}

/// Substitutes alert fields into a stored template. Unknown placeholders
/// are left as-is; an empty template falls back to the alert message.
pub fn render_template(template: &str, alert: &Alert) -> String {
    if template.is_empty() {
        return alert.message().to_string();
    }
    let days = alert
        .days_remaining()
        .map(|d| d.to_string())
        .unwrap_or_default();
    template
        .replace("{product_name}", alert.product_name())
        .replace("{product_code}", alert.product_code())
        .replace("{quantity}", &alert.current_quantity().to_string())
        .replace("{threshold}", &alert.rule().threshold_value.to_string())
        .replace("{message}", alert.message())
        .replace("{urgency}", alert.urgency().as_str())
        .replace("{days_remaining}", &days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::Urgency;
    use crate::ids::ProductId;
    use crate::rule::{Operator, Priority, RuleSnapshot, RuleType};
    use std::collections::{BTreeMap, BTreeSet};

    fn make_alert() -> Alert {
        let snapshot = RuleSnapshot {
            rule_id: crate::ids::RuleId::new(),
            rule_name: "low stock".into(),
            rule_type: RuleType::StockLow,
            threshold_value: 10.0,
            threshold_operator: Operator::Lt,
            priority: Priority::High,
            notification_channels: BTreeSet::from([Channel::Email]),
            recipients: BTreeMap::from([(Channel::Email, vec!["ops@pharmacy.test".into()])]),
        };
        let now = chrono::DateTime::parse_from_rfc3339("2025-06-01T09:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let (alert, _) = Alert::new(
            snapshot,
            ProductId::new(),
            "PARA-500".into(),
            "Paracetamol 500mg".into(),
            "Low stock: Paracetamol 500mg (PARA-500) at 5 units (threshold 10)".into(),
            5,
            None,
            Urgency::High,
            now,
        );
        alert
    }

    fn email_config() -> ChannelConfig {
        ChannelConfig::Email(EmailConfig {
            enabled: true,
            smtp_host: "smtp.pharmacy.test".into(),
            smtp_port: 587,
            username: "alerts".into(),
            password: "secret".into(),
            from_address: "alerts@pharmacy.test".into(),
            template: String::new(),
        })
    }

    #[test]
    fn valid_email_config_passes() {
        assert!(email_config().validate().is_ok());
    }

    #[test]
    fn email_config_requires_host() {
        let config = ChannelConfig::Email(EmailConfig {
            enabled: true,
            smtp_host: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_address: "a@b.test".into(),
            template: String::new(),
        });
        assert_eq!(
            config.validate(),
            Err(DomainError::ChannelConfigIncomplete("smtp host"))
        );
    }

    #[test]
    fn sms_config_requires_gateway() {
        let config = ChannelConfig::Sms(SmsConfig {
            enabled: true,
            gateway_url: String::new(),
            api_key: "k".into(),
            sender_id: "PHARMACY".into(),
            template: String::new(),
        });
        assert_eq!(
            config.validate(),
            Err(DomainError::ChannelConfigIncomplete("gateway url"))
        );
    }

    #[test]
    fn config_reports_its_channel() {
        assert_eq!(email_config().channel(), Channel::Email);
    }

    #[test]
    fn template_substitutes_alert_fields() {
        let rendered = render_template(
            "[{urgency}] {product_name} ({product_code}): {quantity} left",
            &make_alert(),
        );
        assert_eq!(rendered, "[high] Paracetamol 500mg (PARA-500): 5 left");
    }

    #[test]
    fn empty_template_falls_back_to_message() {
        let alert = make_alert();
        assert_eq!(render_template("", &alert), alert.message());
    }

    #[test]
    fn missing_days_remaining_renders_empty() {
        let rendered = render_template("expires in {days_remaining} days", &make_alert());
        assert_eq!(rendered, "expires in  days");
    }
}
