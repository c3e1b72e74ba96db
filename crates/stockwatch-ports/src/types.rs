use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwatch_core::alert::{Alert, Status};
use stockwatch_core::channel::Channel;
use stockwatch_core::ids::AlertId;
use stockwatch_core::product::StockStatus;
use stockwatch_core::rule::{Operator, Priority, RuleType};

/// Rule fields as submitted by an administrator, before domain
/// validation.
#[derive(Debug, Clone)]
pub struct RuleDraft {
    pub name: String,
    pub description: String,
    pub rule_type: RuleType,
    pub threshold_value: f64,
    pub threshold_operator: Operator,
    pub priority: Priority,
    pub notification_channels: BTreeSet<Channel>,
    pub recipients: BTreeMap<Channel, Vec<String>>,
    pub is_active: bool,
}

/// Filter criteria for querying alerts. `page` is 1-based.
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub status: Option<Status>,
    pub rule_type: Option<RuleType>,
    pub search: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

/// Stock-level summary computed over the full filtered set, never just
/// the current page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMetrics {
    pub rupture_items: u64,
    pub critical_items: u64,
    pub low_items: u64,
}

/// One alert joined with the product it references.
#[derive(Debug, Clone)]
pub struct AlertProductView {
    pub alert: Alert,
    pub stock_status: StockStatus,
    pub current_stock: i64,
    pub critical_threshold: i64,
    pub low_threshold: i64,
    pub stock_value: f64,
}

#[derive(Debug, Clone)]
pub struct AlertPage {
    pub items: Vec<AlertProductView>,
    pub total_count: u64,
    pub total_pages: u32,
    pub metrics: StockMetrics,
}

/// Rendered message ready to be sent through one channel adapter.
#[derive(Debug, Clone)]
pub struct Notification {
    pub alert_id: AlertId,
    pub channel: Channel,
    pub target: String,
    pub subject: String,
    pub body: String,
}

/// Delivery metadata returned by notifiers.
#[derive(Debug, Clone, Default)]
pub struct NotifyResult {
    pub external_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed(String),
    Skipped(String),
    TimedOut,
}

/// Per-(channel, target) result of a dispatch fan-out. Failures are
/// reported here, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    pub channel: Channel,
    pub target: String,
    pub outcome: DispatchOutcome,
}

impl DispatchResult {
    pub fn is_sent(&self) -> bool {
        self.outcome == DispatchOutcome::Sent
    }
}

/// A notification waiting in the database queue, either rate-limit
/// overflow or a failed send awaiting requeue.
#[derive(Debug, Clone)]
pub struct PendingNotification {
    pub id: String,
    pub alert_id: AlertId,
    pub channel: Channel,
    pub target: String,
    pub subject: String,
    pub payload: String,
    pub status: QueueStatus,
    pub next_attempt_at: DateTime<Utc>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

/// An escalation step waiting to fire.
#[derive(Debug, Clone)]
pub struct PendingEscalation {
    pub id: String,
    pub alert_id: AlertId,
    pub level: u32,
    pub fires_at: DateTime<Utc>,
    pub status: QueueStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    Pending,
    Sent,
    Failed,
    Dead,
}

/// Result of one evaluator tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A prior run still holds the tenant lock; nothing was evaluated.
    Skipped { reason: String },
    Completed(EvaluationReport),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationReport {
    pub created: u32,
    pub refreshed: u32,
    pub suppressed: u32,
    pub skipped_products: u32,
    pub purged: u64,
    pub dispatches: Vec<DispatchResult>,
}
