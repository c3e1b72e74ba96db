use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockwatch_core::alert::Alert;
use stockwatch_core::ids::{AlertId, RuleId, UserId};
use stockwatch_core::rule::{RulePatch, ThresholdRule};

use crate::types::{AlertFilter, AlertPage, RuleDraft, TickOutcome};

/// Administrator-facing rule management. Validation happens before
/// persistence; none of these operations trigger an evaluation.
#[async_trait]
pub trait RuleAdministration: Send + Sync {
    type Error;

    async fn create_rule(&self, draft: RuleDraft) -> Result<ThresholdRule, Self::Error>;
    async fn update_rule(&self, id: &RuleId, patch: RulePatch)
        -> Result<ThresholdRule, Self::Error>;
    async fn delete_rule(&self, id: &RuleId) -> Result<(), Self::Error>;
    async fn toggle_rule(&self, id: &RuleId) -> Result<ThresholdRule, Self::Error>;
    async fn list_rules(&self) -> Result<Vec<ThresholdRule>, Self::Error>;
}

/// Operator actions on individual alerts.
#[async_trait]
pub trait AlertLifecycleOps: Send + Sync {
    type Error;

    async fn mark_treated(
        &self,
        alert_id: &AlertId,
        actor: UserId,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<Alert, Self::Error>;
    async fn mark_ignored(
        &self,
        alert_id: &AlertId,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<Alert, Self::Error>;
}

/// Read side consumed by any presentation layer.
#[async_trait]
pub trait AlertQueries: Send + Sync {
    type Error;

    async fn get_alert(&self, alert_id: &AlertId) -> Result<Alert, Self::Error>;
    async fn query(&self, filter: AlertFilter) -> Result<AlertPage, Self::Error>;
    async fn export_csv(&self, filter: AlertFilter) -> Result<String, Self::Error>;
}

/// Entry point for the scheduled tick.
#[async_trait]
pub trait EvaluationTrigger: Send + Sync {
    type Error;

    async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickOutcome, Self::Error>;
}
