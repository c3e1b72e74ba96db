use chrono::{DateTime, Utc};

use stockwatch_core::alert::Status;
use stockwatch_ports::outbound::{
    AlertRepository, EscalationQueue, EventPublisher, NotificationQueue, SettingsRepository,
};
use stockwatch_ports::types::{DispatchResult, PendingEscalation, QueueStatus};

use crate::dispatcher::Dispatcher;
use crate::error::AppError;

/// Fires due escalation steps: bumps the alert's urgency, re-dispatches
/// it, and schedules the next step until the configured cap. Steps whose
/// alert was resolved in the meantime burn out silently.
pub struct EscalationService<A, S, EQ, EP, NQ>
where
    A: AlertRepository,
    S: SettingsRepository,
    EQ: EscalationQueue,
    EP: EventPublisher,
    NQ: NotificationQueue,
{
    alerts: A,
    settings: S,
    escalations: EQ,
    events: EP,
    dispatcher: Dispatcher<NQ, EP>,
}

#[derive(Debug, Default)]
pub struct EscalationReport {
    pub fired: u32,
    pub dropped: u32,
    pub dispatches: Vec<DispatchResult>,
}

impl<A, S, EQ, EP, NQ> EscalationService<A, S, EQ, EP, NQ>
where
    A: AlertRepository,
    S: SettingsRepository,
    EQ: EscalationQueue,
    EP: EventPublisher,
    NQ: NotificationQueue,
{
    pub fn new(
        alerts: A,
        settings: S,
        escalations: EQ,
        events: EP,
        dispatcher: Dispatcher<NQ, EP>,
    ) -> Self {
        Self {
            alerts,
            settings,
            escalations,
            events,
            dispatcher,
        }
    }

    pub async fn run_escalations(&self, now: DateTime<Utc>) -> Result<EscalationReport, AppError> {
        let settings = self.settings.load_settings().await?;
        let mut report = EscalationReport::default();
        if !settings.escalation_enabled {
            return Ok(report);
        }
        let configs = self.settings.load_channel_configs().await?;

        for step in self.escalations.poll_due(now).await? {
            self.escalations.mark_fired(&step.id).await?;

            let Some(mut alert) = self.alerts.find_by_id(&step.alert_id).await? else {
                report.dropped += 1;
                continue;
            };
            if alert.status() != Status::Active {
                report.dropped += 1;
                continue;
            }

            let events = alert.escalate(settings.max_escalation_level, now)?;
            if events.is_empty() {
                // already at the cap
                report.dropped += 1;
                continue;
            }
            self.alerts.save(&alert).await?;
            self.events.publish(events).await?;

            let results = self.dispatcher.dispatch(&alert, &settings, &configs, now).await?;
            report.dispatches.extend(results);

            if alert.escalation_level() < settings.max_escalation_level {
                self.escalations
                    .enqueue_step(PendingEscalation {
                        id: uuid::Uuid::new_v4().to_string(),
                        alert_id: alert.id().clone(),
                        level: alert.escalation_level() + 1,
                        fires_at: now + settings.escalation_delay_for(alert.rule().priority),
                        status: QueueStatus::Pending,
                    })
                    .await?;
            }
            report.fired += 1;
        }
        Ok(report)
    }
}
