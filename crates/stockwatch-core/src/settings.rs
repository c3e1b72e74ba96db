use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::rule::Priority;

/// Tenant-wide alerting configuration. Read at the start of each
/// evaluator tick; edits take effect on the next tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalAlertSettings {
    pub system_enabled: bool,
    pub check_frequency_minutes: u32,
    pub business_hours_only: bool,
    pub business_start: NaiveTime,
    pub business_end: NaiveTime,
    pub timezone: Tz,
    pub alert_retention_days: u32,
    pub escalation_enabled: bool,
    pub escalation_delay_minutes: u32,
    pub max_escalation_level: u32,
    pub max_alerts_per_hour: u32,
    pub duplicate_alert_cooldown_minutes: u32,
}

impl Default for GlobalAlertSettings {
    fn default() -> Self {
        Self {
            system_enabled: true,
            check_frequency_minutes: 30,
            business_hours_only: false,
            business_start: NaiveTime::from_hms_opt(8, 0, 0).expect("valid time"),
            business_end: NaiveTime::from_hms_opt(20, 0, 0).expect("valid time"),
            timezone: Tz::UTC,
            alert_retention_days: 90,
            escalation_enabled: false,
            escalation_delay_minutes: 60,
            max_escalation_level: 3,
            max_alerts_per_hour: 50,
            duplicate_alert_cooldown_minutes: 60,
        }
    }
}

impl GlobalAlertSettings {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.check_frequency_minutes == 0 {
            return Err(DomainError::InvalidCheckFrequency);
        }
        if self.business_hours_only && self.business_start >= self.business_end {
            return Err(DomainError::InvalidBusinessHours);
        }
        Ok(())
    }

    /// True when dispatch is allowed at `now` under the business-hours
    /// gate. Always true when the gate is off.
    pub fn in_business_hours(&self, now: DateTime<Utc>) -> bool {
        if !self.business_hours_only {
            return true;
        }
        let local = now.with_timezone(&self.timezone).time();
        local >= self.business_start && local < self.business_end
    }

    /// Delay before the first escalation of an alert with the given rule
    /// priority. Critical escalates fastest.
    pub fn escalation_delay_for(&self, priority: Priority) -> Duration {
        Duration::minutes(i64::from(
            self.escalation_delay_minutes * priority.escalation_factor(),
        ))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::minutes(i64::from(self.duplicate_alert_cooldown_minutes))
    }

    pub fn retention_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.alert_retention_days))
    }
}
