pub mod actions;
pub mod status;
pub mod urgency;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::events::{
    AlertEscalated, AlertIgnored, AlertRaised, AlertRefreshed, AlertTreated, DomainEvent,
};
use crate::ids::{AlertId, ProductId, UserId};
use crate::rule::RuleSnapshot;

pub use actions::recommended_actions;
pub use status::Status;
pub use urgency::Urgency;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    id: AlertId,
    rule: RuleSnapshot,
    product_id: ProductId,
    product_code: String,
    product_name: String,
    message: String,
    current_quantity: i64,
    days_remaining: Option<i64>,
    urgency: Urgency,
    status: Status,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<UserId>,
    resolution_notes: Option<String>,
    recommended_actions: Vec<String>,
    escalation_level: u32,
}

impl Alert {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rule: RuleSnapshot,
        product_id: ProductId,
        product_code: String,
        product_name: String,
        message: String,
        current_quantity: i64,
        days_remaining: Option<i64>,
        urgency: Urgency,
        now: DateTime<Utc>,
    ) -> (Self, Vec<DomainEvent>) {
        let id = AlertId::new();
        let recommended_actions = actions::recommended_actions(rule.rule_type);
        let alert = Self {
            id: id.clone(),
            rule: rule.clone(),
            product_id: product_id.clone(),
            product_code,
            product_name,
            message,
            current_quantity,
            days_remaining,
            urgency,
            status: Status::Active,
            created_at: now,
            resolved_at: None,
            resolved_by: None,
            resolution_notes: None,
            recommended_actions,
            escalation_level: 0,
        };
        let events = vec![DomainEvent::AlertRaised(AlertRaised {
            alert_id: id,
            rule_id: rule.rule_id,
            product_id,
            rule_type: rule.rule_type,
            urgency,
            occurred_at: now,
        })];
        (alert, events)
    }

    /// Re-evaluation of a still-breaching product updates the snapshot
    /// fields in place. Unchanged data produces no event, which keeps the
    /// evaluator idempotent.
    pub fn refresh(
        &mut self,
        message: String,
        current_quantity: i64,
        days_remaining: Option<i64>,
        urgency: Urgency,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>, DomainError> {
        if self.status != Status::Active {
            return Err(DomainError::AlertNotActive);
        }
        // Escalation may have pushed urgency above the derived level;
        // never downgrade it on refresh.
        let urgency = urgency.max(self.urgency);
        if self.message == message
            && self.current_quantity == current_quantity
            && self.days_remaining == days_remaining
            && self.urgency == urgency
        {
            return Ok(vec![]);
        }
        self.message = message;
        self.current_quantity = current_quantity;
        self.days_remaining = days_remaining;
        self.urgency = urgency;
        Ok(vec![DomainEvent::AlertRefreshed(AlertRefreshed {
            alert_id: self.id.clone(),
            current_quantity,
            urgency,
            occurred_at: now,
        })])
    }

    pub fn treat(
        &mut self,
        actor: UserId,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>, DomainError> {
        if self.status != Status::Active {
            return Err(DomainError::AlertNotActive);
        }
        self.status = Status::Treated;
        self.resolved_at = Some(now);
        self.resolved_by = Some(actor.clone());
        self.resolution_notes = Some(notes);
        Ok(vec![DomainEvent::AlertTreated(AlertTreated {
            alert_id: self.id.clone(),
            treated_by: actor,
            occurred_at: now,
        })])
    }

    pub fn ignore(
        &mut self,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>, DomainError> {
        if self.status != Status::Active {
            return Err(DomainError::AlertNotActive);
        }
        self.status = Status::Ignored;
        self.resolved_at = Some(now);
        self.resolution_notes = Some(notes);
        Ok(vec![DomainEvent::AlertIgnored(AlertIgnored {
            alert_id: self.id.clone(),
            occurred_at: now,
        })])
    }

    /// Bumps urgency one level and advances the escalation counter.
    /// Past `max_level` this is a no-op rather than an error; the step
    /// simply burns out.
    pub fn escalate(
        &mut self,
        max_level: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>, DomainError> {
        if self.status != Status::Active {
            return Err(DomainError::AlertNotActive);
        }
        if self.escalation_level >= max_level {
            return Ok(vec![]);
        }
        self.escalation_level += 1;
        self.urgency = self.urgency.bumped();
        Ok(vec![DomainEvent::AlertEscalated(AlertEscalated {
            alert_id: self.id.clone(),
            level: self.escalation_level,
            urgency: self.urgency,
            occurred_at: now,
        })])
    }

    pub fn id(&self) -> &AlertId {
        &self.id
    }

    pub fn rule(&self) -> &RuleSnapshot {
        &self.rule
    }

    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    pub fn product_code(&self) -> &str {
        &self.product_code
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn current_quantity(&self) -> i64 {
        self.current_quantity
    }

    pub fn days_remaining(&self) -> Option<i64> {
        self.days_remaining
    }

    pub fn urgency(&self) -> Urgency {
        self.urgency
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn resolved_by(&self) -> Option<&UserId> {
        self.resolved_by.as_ref()
    }

    pub fn resolution_notes(&self) -> Option<&str> {
        self.resolution_notes.as_deref()
    }

    pub fn recommended_actions(&self) -> &[String] {
        &self.recommended_actions
    }

    pub fn escalation_level(&self) -> u32 {
        self.escalation_level
    }
}
