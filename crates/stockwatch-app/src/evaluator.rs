use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use stockwatch_core::alert::Alert;
use stockwatch_core::evaluation::{check_breach, in_cooldown};
use stockwatch_core::events::{AlertSuppressed, DomainEvent, EvaluationSkipped};
use stockwatch_core::notification::ChannelConfig;
use stockwatch_core::product::ProductRecord;
use stockwatch_core::rule::ThresholdRule;
use stockwatch_core::settings::GlobalAlertSettings;
use stockwatch_ports::inbound::EvaluationTrigger;
use stockwatch_ports::outbound::{
    AlertRepository, EscalationQueue, EvaluationLock, EventPublisher, NotificationQueue,
    ProductRepository, RuleRepository, SettingsRepository,
};
use stockwatch_ports::types::{EvaluationReport, PendingEscalation, QueueStatus, TickOutcome};

use crate::dispatcher::Dispatcher;
use crate::error::AppError;

/// Scans the inventory against active rules on each scheduled tick.
/// Ticks for the same tenant never overlap: a tick that cannot take the
/// advisory lock is skipped outright rather than queued.
pub struct Evaluator<R, A, P, S, EQ, L, EP, NQ>
where
    R: RuleRepository,
    A: AlertRepository,
    P: ProductRepository,
    S: SettingsRepository,
    EQ: EscalationQueue,
    L: EvaluationLock,
    EP: EventPublisher,
    NQ: NotificationQueue,
{
    rules: R,
    alerts: A,
    products: P,
    settings: S,
    escalations: EQ,
    lock: L,
    events: EP,
    dispatcher: Dispatcher<NQ, EP>,
}

impl<R, A, P, S, EQ, L, EP, NQ> Evaluator<R, A, P, S, EQ, L, EP, NQ>
where
    R: RuleRepository,
    A: AlertRepository,
    P: ProductRepository,
    S: SettingsRepository,
    EQ: EscalationQueue,
    L: EvaluationLock,
    EP: EventPublisher,
    NQ: NotificationQueue,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: R,
        alerts: A,
        products: P,
        settings: S,
        escalations: EQ,
        lock: L,
        events: EP,
        dispatcher: Dispatcher<NQ, EP>,
    ) -> Self {
        Self {
            rules,
            alerts,
            products,
            settings,
            escalations,
            lock,
            events,
            dispatcher,
        }
    }

    async fn evaluate_all(
        &self,
        settings: &GlobalAlertSettings,
        now: DateTime<Utc>,
    ) -> Result<EvaluationReport, AppError> {
        let rules = self.rules.list_active().await?;
        let products = self.products.list_all().await?;
        let configs = self.settings.load_channel_configs().await?;
        let today = now.with_timezone(&settings.timezone).date_naive();

        let mut report = EvaluationReport::default();
        for product in &products {
            if let Err(error) = product.validate() {
                tracing::warn!(product = %product.code, %error, "skipping malformed product record");
                report.skipped_products += 1;
                continue;
            }
            if let Err(error) = self
                .evaluate_product(product, &rules, settings, &configs, today, now, &mut report)
                .await
            {
                tracing::warn!(product = %product.code, %error, "product evaluation failed, continuing batch");
                report.skipped_products += 1;
            }
        }

        report.purged = self
            .alerts
            .purge_resolved_before(settings.retention_cutoff(now))
            .await?;
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn evaluate_product(
        &self,
        product: &ProductRecord,
        rules: &[ThresholdRule],
        settings: &GlobalAlertSettings,
        configs: &[ChannelConfig],
        today: NaiveDate,
        now: DateTime<Utc>,
        report: &mut EvaluationReport,
    ) -> Result<(), AppError> {
        for rule in rules {
            let Some(breach) = check_breach(rule, product, today) else {
                continue;
            };

            // Dedup: an unresolved alert for this (product, rule) pair is
            // refreshed in place, never duplicated.
            if let Some(mut existing) = self
                .alerts
                .find_active_for_pair(&product.id, rule.id())
                .await?
            {
                let events = existing.refresh(
                    breach.message,
                    product.quantity,
                    breach.days_remaining,
                    breach.urgency,
                    now,
                )?;
                if !events.is_empty() {
                    self.alerts.save(&existing).await?;
                    self.events.publish(events).await?;
                }
                report.refreshed += 1;
                continue;
            }

            // Cooldown: a pair resolved moments ago must not storm back.
            if let Some(resolved_at) = self
                .alerts
                .latest_resolution(&product.id, rule.rule_type())
                .await?
            {
                if in_cooldown(resolved_at, now, settings.duplicate_alert_cooldown_minutes) {
                    report.suppressed += 1;
                    self.events
                        .publish(vec![DomainEvent::AlertSuppressed(AlertSuppressed {
                            product_id: product.id.clone(),
                            rule_type: rule.rule_type(),
                            occurred_at: now,
                        })])
                        .await?;
                    continue;
                }
            }

            let (alert, events) = Alert::new(
                rule.snapshot(),
                product.id.clone(),
                product.code.clone(),
                product.name.clone(),
                breach.message,
                product.quantity,
                breach.days_remaining,
                breach.urgency,
                now,
            );
            self.alerts.save(&alert).await?;
            self.events.publish(events).await?;
            report.created += 1;

            let results = self.dispatcher.dispatch(&alert, settings, configs, now).await?;
            report.dispatches.extend(results);

            if settings.escalation_enabled {
                self.escalations
                    .enqueue_step(PendingEscalation {
                        id: uuid::Uuid::new_v4().to_string(),
                        alert_id: alert.id().clone(),
                        level: 1,
                        fires_at: now + settings.escalation_delay_for(alert.rule().priority),
                        status: QueueStatus::Pending,
                    })
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R, A, P, S, EQ, L, EP, NQ> EvaluationTrigger for Evaluator<R, A, P, S, EQ, L, EP, NQ>
where
    R: RuleRepository,
    A: AlertRepository,
    P: ProductRepository,
    S: SettingsRepository,
    EQ: EscalationQueue,
    L: EvaluationLock,
    EP: EventPublisher,
    NQ: NotificationQueue,
{
    type Error = AppError;

    async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickOutcome, AppError> {
        let settings = self.settings.load_settings().await?;
        let ttl = Duration::minutes(i64::from(settings.check_frequency_minutes.max(1)));

        if !self.lock.try_acquire(now, ttl).await? {
            // Contention is expected when a run overshoots its tick; not
            // an alarm condition.
            tracing::info!("evaluation tick skipped, prior run still in flight");
            let reason = "prior run in flight".to_string();
            self.events
                .publish(vec![DomainEvent::EvaluationSkipped(EvaluationSkipped {
                    reason: reason.clone(),
                    occurred_at: now,
                })])
                .await?;
            return Ok(TickOutcome::Skipped { reason });
        }

        let outcome = self.evaluate_all(&settings, now).await;
        self.lock.release().await?;
        Ok(TickOutcome::Completed(outcome?))
    }
}
