use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use stockwatch_core::alert::Alert;
use stockwatch_core::channel::Channel;
use stockwatch_core::events::DomainEvent;
use stockwatch_core::ids::{AlertId, ProductId, RuleId};
use stockwatch_core::notification::ChannelConfig;
use stockwatch_core::product::ProductRecord;
use stockwatch_core::rule::{RuleType, ThresholdRule};
use stockwatch_core::settings::GlobalAlertSettings;

use crate::error::{NotifyError, PortError};
use crate::types::{
    AlertFilter, Notification, NotifyResult, PendingEscalation, PendingNotification, StockMetrics,
};

#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn save(&self, rule: &ThresholdRule) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &RuleId) -> Result<Option<ThresholdRule>, PortError>;
    async fn delete(&self, id: &RuleId) -> Result<(), PortError>;
    async fn list(&self) -> Result<Vec<ThresholdRule>, PortError>;
    async fn list_active(&self) -> Result<Vec<ThresholdRule>, PortError>;
}

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn save(&self, alert: &Alert) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &AlertId) -> Result<Option<Alert>, PortError>;
    /// The unresolved alert for a (product, rule) pair, if one exists.
    /// This is the dedup key for refresh-instead-of-create.
    async fn find_active_for_pair(
        &self,
        product_id: &ProductId,
        rule_id: &RuleId,
    ) -> Result<Option<Alert>, PortError>;
    /// When the (product, rule type) pair was last resolved. This is the
    /// cooldown key.
    async fn latest_resolution(
        &self,
        product_id: &ProductId,
        rule_type: RuleType,
    ) -> Result<Option<DateTime<Utc>>, PortError>;
    async fn find_page(&self, filter: &AlertFilter) -> Result<Vec<Alert>, PortError>;
    async fn count(&self, filter: &AlertFilter) -> Result<u64, PortError>;
    /// Stock metrics over the full filtered set, same predicate as
    /// `count`.
    async fn metrics(&self, filter: &AlertFilter) -> Result<StockMetrics, PortError>;
    async fn purge_resolved_before(&self, cutoff: DateTime<Utc>) -> Result<u64, PortError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<ProductRecord>, PortError>;
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<ProductRecord>, PortError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Defaults when the tenant has never saved settings.
    async fn load_settings(&self) -> Result<GlobalAlertSettings, PortError>;
    async fn save_settings(&self, settings: &GlobalAlertSettings) -> Result<(), PortError>;
    async fn load_channel_configs(&self) -> Result<Vec<ChannelConfig>, PortError>;
    async fn save_channel_config(&self, config: &ChannelConfig) -> Result<(), PortError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<NotifyResult, NotifyError>;
    fn channel(&self) -> Channel;
}

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    async fn enqueue(&self, notification: PendingNotification) -> Result<(), PortError>;
    async fn poll_pending(&self, now: DateTime<Utc>) -> Result<Vec<PendingNotification>, PortError>;
    async fn mark_sent(&self, id: &str) -> Result<(), PortError>;
    async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        next_attempt: DateTime<Utc>,
    ) -> Result<(), PortError>;
    async fn mark_dead(&self, id: &str) -> Result<(), PortError>;
}

#[async_trait]
pub trait EscalationQueue: Send + Sync {
    async fn enqueue_step(&self, step: PendingEscalation) -> Result<(), PortError>;
    async fn poll_due(&self, now: DateTime<Utc>) -> Result<Vec<PendingEscalation>, PortError>;
    async fn cancel_for_alert(&self, alert_id: &AlertId) -> Result<(), PortError>;
    async fn mark_fired(&self, id: &str) -> Result<(), PortError>;
}

/// Per-tenant advisory mutual exclusion for the evaluator tick. A tick
/// that cannot acquire the lock is skipped, never queued.
#[async_trait]
pub trait EvaluationLock: Send + Sync {
    async fn try_acquire(&self, now: DateTime<Utc>, ttl: Duration) -> Result<bool, PortError>;
    async fn release(&self) -> Result<(), PortError>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError>;
}
