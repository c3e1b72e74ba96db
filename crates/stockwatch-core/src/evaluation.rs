use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::alert::Urgency;
use crate::product::ProductRecord;
use crate::rule::{Operator, Priority, RuleType, ThresholdRule};

/// Outcome of comparing one product against one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Breach {
    pub metric: f64,
    pub urgency: Urgency,
    pub message: String,
    pub days_remaining: Option<i64>,
}

/// Returns the breach for (rule, product), or `None` when the rule is
/// inactive, does not apply to the product, or its condition holds.
pub fn check_breach(
    rule: &ThresholdRule,
    product: &ProductRecord,
    today: NaiveDate,
) -> Option<Breach> {
    if !rule.is_active() {
        return None;
    }
    let metric = product.metric(rule.rule_type(), today)?;
    if !rule
        .threshold_operator()
        .compare(metric, rule.threshold_value())
    {
        return None;
    }
    let days_remaining = match rule.rule_type() {
        RuleType::Expiration => product.days_until_expiry(today),
        _ => None,
    };
    let urgency = derive_urgency(
        rule.priority(),
        rule.rule_type(),
        rule.threshold_operator(),
        metric,
        rule.threshold_value(),
        days_remaining,
    );
    let message = breach_message(rule, product, metric, days_remaining);
    Some(Breach {
        metric,
        urgency,
        message,
        days_remaining,
    })
}

/// Urgency starts at the rule's priority and is bumped one level when the
/// breach overshoots the threshold by more than a factor of two. Expired
/// stock is critical no matter what the rule says.
pub fn derive_urgency(
    priority: Priority,
    rule_type: RuleType,
    operator: Operator,
    metric: f64,
    threshold: f64,
    days_remaining: Option<i64>,
) -> Urgency {
    if rule_type == RuleType::Expiration && days_remaining.is_some_and(|d| d <= 0) {
        return Urgency::Critical;
    }
    let base = Urgency::from_priority(priority);
    let severe = match operator {
        Operator::Lt | Operator::Lte => threshold > 0.0 && metric < threshold / 2.0,
        Operator::Gt | Operator::Gte => threshold > 0.0 && metric > threshold * 2.0,
        Operator::Eq => false,
    };
    if severe {
        base.bumped()
    } else {
        base
    }
}

/// True while the cooldown window after a resolution is still open, in
/// which case a recurring breach must not create a new alert.
pub fn in_cooldown(
    resolved_at: DateTime<Utc>,
    now: DateTime<Utc>,
    cooldown_minutes: u32,
) -> bool {
    now - resolved_at < Duration::minutes(i64::from(cooldown_minutes))
}

fn breach_message(
    rule: &ThresholdRule,
    product: &ProductRecord,
    metric: f64,
    days_remaining: Option<i64>,
) -> String {
    match rule.rule_type() {
        RuleType::StockLow => format!(
            "Low stock: {} ({}) at {} units (threshold {})",
            product.name,
            product.code,
            product.quantity,
            rule.threshold_value()
        ),
        RuleType::Stockout => format!(
            "Stockout: {} ({}) is out of stock",
            product.name, product.code
        ),
        RuleType::Overstock => format!(
            "Overstock: {} ({}) at {} units (threshold {})",
            product.name,
            product.code,
            product.quantity,
            rule.threshold_value()
        ),
        RuleType::Expiration => match days_remaining {
            Some(d) if d < 0 => format!(
                "Expired: {} ({}) expired {} days ago",
                product.name,
                product.code,
                -d
            ),
            Some(0) => format!("Expired: {} ({}) expires today", product.name, product.code),
            Some(d) => format!(
                "Expiring: {} ({}) expires in {} days",
                product.name, product.code, d
            ),
            None => format!("Expiring: {} ({})", product.name, product.code),
        },
        RuleType::SlowRotation => format!(
            "Slow rotation: {} ({}) at {} units/month (threshold {})",
            product.name,
            product.code,
            metric,
            rule.threshold_value()
        ),
    }
}
