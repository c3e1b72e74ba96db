use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::urgency::Urgency;
use crate::channel::Channel;
use crate::ids::{AlertId, ProductId, RuleId, UserId};
use crate::rule::RuleType;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DomainEvent {
    AlertRaised(AlertRaised),
    AlertRefreshed(AlertRefreshed),
    AlertSuppressed(AlertSuppressed),
    AlertTreated(AlertTreated),
    AlertIgnored(AlertIgnored),
    AlertEscalated(AlertEscalated),
    NotificationSent(NotificationSent),
    NotificationFailed(NotificationFailed),
    NotificationThrottled(NotificationThrottled),
    EvaluationSkipped(EvaluationSkipped),
}

impl DomainEvent {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::AlertRaised(e) => e.occurred_at,
            Self::AlertRefreshed(e) => e.occurred_at,
            Self::AlertSuppressed(e) => e.occurred_at,
            Self::AlertTreated(e) => e.occurred_at,
            Self::AlertIgnored(e) => e.occurred_at,
            Self::AlertEscalated(e) => e.occurred_at,
            Self::NotificationSent(e) => e.occurred_at,
            Self::NotificationFailed(e) => e.occurred_at,
            Self::NotificationThrottled(e) => e.occurred_at,
            Self::EvaluationSkipped(e) => e.occurred_at,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AlertRaised(_) => "alert.raised",
            Self::AlertRefreshed(_) => "alert.refreshed",
            Self::AlertSuppressed(_) => "alert.suppressed",
            Self::AlertTreated(_) => "alert.treated",
            Self::AlertIgnored(_) => "alert.ignored",
            Self::AlertEscalated(_) => "alert.escalated",
            Self::NotificationSent(_) => "notification.sent",
            Self::NotificationFailed(_) => "notification.failed",
            Self::NotificationThrottled(_) => "notification.throttled",
            Self::EvaluationSkipped(_) => "evaluation.skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRaised {
    pub alert_id: AlertId,
    pub rule_id: RuleId,
    pub product_id: ProductId,
    pub rule_type: RuleType,
    pub urgency: Urgency,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRefreshed {
    pub alert_id: AlertId,
    pub current_quantity: i64,
    pub urgency: Urgency,
    pub occurred_at: DateTime<Utc>,
}

/// A breach recurred for a (product, rule type) pair whose previous alert
/// was resolved inside the cooldown window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSuppressed {
    pub product_id: ProductId,
    pub rule_type: RuleType,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertTreated {
    pub alert_id: AlertId,
    pub treated_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertIgnored {
    pub alert_id: AlertId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEscalated {
    pub alert_id: AlertId,
    pub level: u32,
    pub urgency: Urgency,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationSent {
    pub alert_id: AlertId,
    pub channel: Channel,
    pub target: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationFailed {
    pub alert_id: AlertId,
    pub channel: Channel,
    pub target: String,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationThrottled {
    pub alert_id: AlertId,
    pub channel: Channel,
    pub target: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSkipped {
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}
