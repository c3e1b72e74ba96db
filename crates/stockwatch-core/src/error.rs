use thiserror::Error;

use crate::channel::Channel;

#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("rule name must not be empty")]
    RuleNameEmpty,
    #[error("threshold must be finite and non-negative")]
    InvalidThreshold,
    #[error("active rule requires at least one notification channel")]
    RuleRequiresChannel,
    #[error("channel {0} requires at least one recipient")]
    ChannelRequiresRecipient(Channel),
    #[error("alert is not active")]
    AlertNotActive,
    #[error("business hours require start before end")]
    InvalidBusinessHours,
    #[error("check frequency must be positive")]
    InvalidCheckFrequency,
    #[error("channel config is missing {0}")]
    ChannelConfigIncomplete(&'static str),
    #[error("malformed product record: {0}")]
    MalformedProduct(String),
    #[error("invalid id: {0}")]
    InvalidId(String),
}
