use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::time::{timeout_at, Instant};

use stockwatch_core::alert::Alert;
use stockwatch_core::channel::Channel;
use stockwatch_core::events::{
    DomainEvent, NotificationFailed, NotificationSent, NotificationThrottled,
};
use stockwatch_core::notification::{render_template, ChannelConfig};
use stockwatch_core::settings::GlobalAlertSettings;
use stockwatch_ports::outbound::{EventPublisher, NotificationQueue, Notifier};
use stockwatch_ports::types::{
    DispatchOutcome, DispatchResult, Notification, PendingNotification, QueueStatus,
};

use crate::error::AppError;

const MAX_RETRIES: u32 = 3;
const RETRY_BACKOFF_MINUTES: i64 = 5;
const THROTTLE_BACKOFF_MINUTES: i64 = 10;

/// Fans a triggered alert out to its configured channels. Provider
/// failures are captured per (channel, recipient) and never raised;
/// `Err` here means the queue or event store itself failed.
pub struct Dispatcher<NQ, EP>
where
    NQ: NotificationQueue,
    EP: EventPublisher,
{
    notifiers: Vec<Arc<dyn Notifier>>,
    queue: NQ,
    events: EP,
    batch_deadline: std::time::Duration,
    limiter: RateLimiter,
}

/// Sliding one-hour window over actual sends, shared across the tenant.
struct RateLimiter {
    sent: Mutex<VecDeque<DateTime<Utc>>>,
}

impl RateLimiter {
    fn new() -> Self {
        Self {
            sent: Mutex::new(VecDeque::new()),
        }
    }

    fn allow(&self, now: DateTime<Utc>, max_per_hour: u32) -> bool {
        if max_per_hour == 0 {
            // zero means uncapped
            return true;
        }
        let mut sent = match self.sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let horizon = now - Duration::hours(1);
        while sent.front().is_some_and(|t| *t <= horizon) {
            sent.pop_front();
        }
        (sent.len() as u32) < max_per_hour
    }

    fn record(&self, now: DateTime<Utc>) {
        let mut sent = match self.sent.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sent.push_back(now);
    }
}

enum SendOutcome {
    Sent,
    Failed(String),
    TimedOut,
    NoNotifier,
}

impl<NQ, EP> Dispatcher<NQ, EP>
where
    NQ: NotificationQueue,
    EP: EventPublisher,
{
    pub fn new(
        notifiers: Vec<Arc<dyn Notifier>>,
        queue: NQ,
        events: EP,
        batch_deadline: std::time::Duration,
    ) -> Self {
        Self {
            notifiers,
            queue,
            events,
            batch_deadline,
            limiter: RateLimiter::new(),
        }
    }

    pub async fn dispatch(
        &self,
        alert: &Alert,
        settings: &GlobalAlertSettings,
        configs: &[ChannelConfig],
        now: DateTime<Utc>,
    ) -> Result<Vec<DispatchResult>, AppError> {
        let mut results = Vec::new();
        let mut events = Vec::new();
        let deadline = Instant::now() + self.batch_deadline;

        for channel in alert.rule().notification_channels.iter().copied() {
            if channel == Channel::Dashboard {
                // The dashboard is the alert row itself; no provider.
                results.push(DispatchResult {
                    channel,
                    target: "dashboard".into(),
                    outcome: DispatchOutcome::Sent,
                });
                continue;
            }

            let recipients = alert
                .rule()
                .recipients
                .get(&channel)
                .cloned()
                .unwrap_or_default();

            let config = match self.channel_gate(channel, settings, configs, now) {
                Ok(config) => config,
                Err(reason) => {
                    for target in recipients {
                        results.push(DispatchResult {
                            channel,
                            target,
                            outcome: DispatchOutcome::Skipped(reason.clone()),
                        });
                    }
                    continue;
                }
            };

            let body = render_template(config.template(), alert);
            let subject = format!("[{}] {}", alert.urgency().as_str(), alert.product_name());

            for target in recipients {
                if !self.limiter.allow(now, settings.max_alerts_per_hour) {
                    self.queue
                        .enqueue(PendingNotification {
                            id: uuid::Uuid::new_v4().to_string(),
                            alert_id: alert.id().clone(),
                            channel,
                            target: target.clone(),
                            subject: subject.clone(),
                            payload: body.clone(),
                            status: QueueStatus::Pending,
                            next_attempt_at: now + Duration::minutes(THROTTLE_BACKOFF_MINUTES),
                            retry_count: 0,
                            created_at: now,
                        })
                        .await?;
                    tracing::info!(
                        alert_id = %alert.id(),
                        channel = channel.as_str(),
                        "notification rate limit reached, queued for later"
                    );
                    events.push(DomainEvent::NotificationThrottled(NotificationThrottled {
                        alert_id: alert.id().clone(),
                        channel,
                        target: target.clone(),
                        occurred_at: now,
                    }));
                    results.push(DispatchResult {
                        channel,
                        target,
                        outcome: DispatchOutcome::Skipped("rate limited".into()),
                    });
                    continue;
                }

                let notification = Notification {
                    alert_id: alert.id().clone(),
                    channel,
                    target: target.clone(),
                    subject: subject.clone(),
                    body: body.clone(),
                };
                match self.send_with_deadline(deadline, &notification).await {
                    SendOutcome::Sent => {
                        self.limiter.record(now);
                        events.push(DomainEvent::NotificationSent(NotificationSent {
                            alert_id: alert.id().clone(),
                            channel,
                            target: target.clone(),
                            occurred_at: now,
                        }));
                        results.push(DispatchResult {
                            channel,
                            target,
                            outcome: DispatchOutcome::Sent,
                        });
                    }
                    SendOutcome::Failed(error) => {
                        tracing::warn!(
                            alert_id = %alert.id(),
                            channel = channel.as_str(),
                            error = %error,
                            "notification delivery failed"
                        );
                        self.queue
                            .enqueue(PendingNotification {
                                id: uuid::Uuid::new_v4().to_string(),
                                alert_id: alert.id().clone(),
                                channel,
                                target: target.clone(),
                                subject: subject.clone(),
                                payload: body.clone(),
                                status: QueueStatus::Pending,
                                next_attempt_at: now + Duration::minutes(RETRY_BACKOFF_MINUTES),
                                retry_count: 1,
                                created_at: now,
                            })
                            .await?;
                        events.push(DomainEvent::NotificationFailed(NotificationFailed {
                            alert_id: alert.id().clone(),
                            channel,
                            target: target.clone(),
                            error: error.clone(),
                            occurred_at: now,
                        }));
                        results.push(DispatchResult {
                            channel,
                            target,
                            outcome: DispatchOutcome::Failed(error),
                        });
                    }
                    SendOutcome::TimedOut => {
                        events.push(DomainEvent::NotificationFailed(NotificationFailed {
                            alert_id: alert.id().clone(),
                            channel,
                            target: target.clone(),
                            error: "dispatch deadline exceeded".into(),
                            occurred_at: now,
                        }));
                        results.push(DispatchResult {
                            channel,
                            target,
                            outcome: DispatchOutcome::TimedOut,
                        });
                    }
                    SendOutcome::NoNotifier => {
                        results.push(DispatchResult {
                            channel,
                            target,
                            outcome: DispatchOutcome::Failed(
                                "no notifier registered for channel".into(),
                            ),
                        });
                    }
                }
            }
        }

        self.events.publish(events).await?;
        Ok(results)
    }

    /// Drains due queue entries (rate-limit overflow and failed sends).
    /// Entries that exhaust their retries go dead rather than looping
    /// forever.
    pub async fn flush_queue(
        &self,
        settings: &GlobalAlertSettings,
        now: DateTime<Utc>,
    ) -> Result<Vec<DispatchResult>, AppError> {
        let pending = self.queue.poll_pending(now).await?;
        let deadline = Instant::now() + self.batch_deadline;
        let mut results = Vec::new();
        let mut events = Vec::new();

        for item in pending {
            if !self.limiter.allow(now, settings.max_alerts_per_hour) {
                // Window still saturated; leave the rest queued.
                break;
            }
            let notification = Notification {
                alert_id: item.alert_id.clone(),
                channel: item.channel,
                target: item.target.clone(),
                subject: item.subject.clone(),
                body: item.payload.clone(),
            };
            match self.send_with_deadline(deadline, &notification).await {
                SendOutcome::Sent => {
                    self.queue.mark_sent(&item.id).await?;
                    self.limiter.record(now);
                    events.push(DomainEvent::NotificationSent(NotificationSent {
                        alert_id: item.alert_id.clone(),
                        channel: item.channel,
                        target: item.target.clone(),
                        occurred_at: now,
                    }));
                    results.push(DispatchResult {
                        channel: item.channel,
                        target: item.target,
                        outcome: DispatchOutcome::Sent,
                    });
                }
                SendOutcome::Failed(error) => {
                    if item.retry_count + 1 >= MAX_RETRIES {
                        self.queue.mark_dead(&item.id).await?;
                    } else {
                        self.queue
                            .mark_failed(
                                &item.id,
                                &error,
                                now + Duration::minutes(RETRY_BACKOFF_MINUTES),
                            )
                            .await?;
                    }
                    events.push(DomainEvent::NotificationFailed(NotificationFailed {
                        alert_id: item.alert_id.clone(),
                        channel: item.channel,
                        target: item.target.clone(),
                        error: error.clone(),
                        occurred_at: now,
                    }));
                    results.push(DispatchResult {
                        channel: item.channel,
                        target: item.target,
                        outcome: DispatchOutcome::Failed(error),
                    });
                }
                SendOutcome::TimedOut => {
                    self.queue
                        .mark_failed(
                            &item.id,
                            "dispatch deadline exceeded",
                            now + Duration::minutes(RETRY_BACKOFF_MINUTES),
                        )
                        .await?;
                    results.push(DispatchResult {
                        channel: item.channel,
                        target: item.target,
                        outcome: DispatchOutcome::TimedOut,
                    });
                }
                SendOutcome::NoNotifier => {
                    self.queue.mark_dead(&item.id).await?;
                    results.push(DispatchResult {
                        channel: item.channel,
                        target: item.target,
                        outcome: DispatchOutcome::Failed(
                            "no notifier registered for channel".into(),
                        ),
                    });
                }
            }
        }

        self.events.publish(events).await?;
        Ok(results)
    }

    fn channel_gate<'a>(
        &self,
        channel: Channel,
        settings: &GlobalAlertSettings,
        configs: &'a [ChannelConfig],
        now: DateTime<Utc>,
    ) -> Result<&'a ChannelConfig, String> {
        if !settings.system_enabled {
            return Err("alerting disabled".into());
        }
        let config = configs
            .iter()
            .find(|c| c.channel() == channel)
            .ok_or_else(|| "channel not configured".to_string())?;
        if !config.enabled() {
            return Err("channel disabled".into());
        }
        if !settings.in_business_hours(now) {
            return Err("outside business hours".into());
        }
        Ok(config)
    }

    async fn send_with_deadline(
        &self,
        deadline: Instant,
        notification: &Notification,
    ) -> SendOutcome {
        let Some(notifier) = self
            .notifiers
            .iter()
            .find(|n| n.channel() == notification.channel)
        else {
            return SendOutcome::NoNotifier;
        };
        match timeout_at(deadline, notifier.send(notification)).await {
            Ok(Ok(_)) => SendOutcome::Sent,
            Ok(Err(e)) => SendOutcome::Failed(e.to_string()),
            Err(_) => SendOutcome::TimedOut,
        }
    }
}
