use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockwatch_core::alert::Alert;
use stockwatch_core::ids::{AlertId, UserId};
use stockwatch_ports::inbound::AlertLifecycleOps;
use stockwatch_ports::outbound::{AlertRepository, EscalationQueue, EventPublisher};

use crate::error::AppError;

/// Owns the treat/ignore transitions. Both require the alert to be
/// active; resolving an already-resolved alert is an error rather than a
/// silent no-op, so a double resolution is visible to the caller.
pub struct AlertLifecycle<A, EQ, EP>
where
    A: AlertRepository,
    EQ: EscalationQueue,
    EP: EventPublisher,
{
    alerts: A,
    escalations: EQ,
    events: EP,
}

impl<A, EQ, EP> AlertLifecycle<A, EQ, EP>
where
    A: AlertRepository,
    EQ: EscalationQueue,
    EP: EventPublisher,
{
    pub fn new(alerts: A, escalations: EQ, events: EP) -> Self {
        Self {
            alerts,
            escalations,
            events,
        }
    }

    async fn load(&self, alert_id: &AlertId) -> Result<Alert, AppError> {
        self.alerts
            .find_by_id(alert_id)
            .await?
            .ok_or_else(AppError::not_found)
    }

    async fn persist_resolution(
        &self,
        alert: &Alert,
        events: Vec<stockwatch_core::events::DomainEvent>,
    ) -> Result<(), AppError> {
        self.alerts.save(alert).await?;
        self.escalations.cancel_for_alert(alert.id()).await?;
        self.events.publish(events).await?;
        Ok(())
    }
}

#[async_trait]
impl<A, EQ, EP> AlertLifecycleOps for AlertLifecycle<A, EQ, EP>
where
    A: AlertRepository,
    EQ: EscalationQueue,
    EP: EventPublisher,
{
    type Error = AppError;

    async fn mark_treated(
        &self,
        alert_id: &AlertId,
        actor: UserId,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<Alert, AppError> {
        let mut alert = self.load(alert_id).await?;
        let events = alert.treat(actor, notes, now)?;
        self.persist_resolution(&alert, events).await?;
        Ok(alert)
    }

    async fn mark_ignored(
        &self,
        alert_id: &AlertId,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<Alert, AppError> {
        let mut alert = self.load(alert_id).await?;
        let events = alert.ignore(notes, now)?;
        self.persist_resolution(&alert, events).await?;
        Ok(alert)
    }
}
