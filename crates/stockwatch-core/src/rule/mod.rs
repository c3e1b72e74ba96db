pub mod operator;
pub mod priority;
pub mod rule_type;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::DomainError;
use crate::ids::RuleId;

pub use operator::Operator;
pub use priority::Priority;
pub use rule_type::RuleType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdRule {
    id: RuleId,
    name: String,
    description: String,
    rule_type: RuleType,
    threshold_value: f64,
    threshold_operator: Operator,
    priority: Priority,
    notification_channels: BTreeSet<Channel>,
    recipients: BTreeMap<Channel, Vec<String>>,
    is_active: bool,
}

/// Partial update applied through [`ThresholdRule::apply`]. Absent fields
/// keep their current value; the result is validated as a whole.
#[derive(Debug, Clone, Default)]
pub struct RulePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub rule_type: Option<RuleType>,
    pub threshold_value: Option<f64>,
    pub threshold_operator: Option<Operator>,
    pub priority: Option<Priority>,
    pub notification_channels: Option<BTreeSet<Channel>>,
    pub recipients: Option<BTreeMap<Channel, Vec<String>>>,
    pub is_active: Option<bool>,
}

/// Rule parameters frozen onto an alert at trigger time, so deleting or
/// editing the rule afterwards never rewrites alert history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub rule_type: RuleType,
    pub threshold_value: f64,
    pub threshold_operator: Operator,
    pub priority: Priority,
    pub notification_channels: BTreeSet<Channel>,
    pub recipients: BTreeMap<Channel, Vec<String>>,
}

impl ThresholdRule {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        description: String,
        rule_type: RuleType,
        threshold_value: f64,
        threshold_operator: Operator,
        priority: Priority,
        notification_channels: BTreeSet<Channel>,
        recipients: BTreeMap<Channel, Vec<String>>,
        is_active: bool,
    ) -> Result<Self, DomainError> {
        let rule = Self {
            id: RuleId::new(),
            name,
            description,
            rule_type,
            threshold_value,
            threshold_operator,
            priority,
            notification_channels,
            recipients,
            is_active,
        };
        rule.validate()?;
        Ok(rule)
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::RuleNameEmpty);
        }
        if !self.threshold_value.is_finite() || self.threshold_value < 0.0 {
            return Err(DomainError::InvalidThreshold);
        }
        if self.is_active {
            if self.notification_channels.is_empty() {
                return Err(DomainError::RuleRequiresChannel);
            }
            for channel in &self.notification_channels {
                if channel.requires_recipients()
                    && self.recipients.get(channel).map_or(true, Vec::is_empty)
                {
                    return Err(DomainError::ChannelRequiresRecipient(*channel));
                }
            }
        }
        Ok(())
    }

    pub fn apply(&mut self, patch: RulePatch) -> Result<(), DomainError> {
        let mut candidate = self.clone();
        if let Some(name) = patch.name {
            candidate.name = name;
        }
        if let Some(description) = patch.description {
            candidate.description = description;
        }
        if let Some(rule_type) = patch.rule_type {
            candidate.rule_type = rule_type;
        }
        if let Some(threshold_value) = patch.threshold_value {
            candidate.threshold_value = threshold_value;
        }
        if let Some(threshold_operator) = patch.threshold_operator {
            candidate.threshold_operator = threshold_operator;
        }
        if let Some(priority) = patch.priority {
            candidate.priority = priority;
        }
        if let Some(channels) = patch.notification_channels {
            candidate.notification_channels = channels;
        }
        if let Some(recipients) = patch.recipients {
            candidate.recipients = recipients;
        }
        if let Some(is_active) = patch.is_active {
            candidate.is_active = is_active;
        }
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// Flips the active flag without deleting the rule. Activation re-runs
    /// validation because an inactive rule may have been saved without
    /// channels.
    pub fn toggle_active(&mut self) -> Result<(), DomainError> {
        let mut candidate = self.clone();
        candidate.is_active = !candidate.is_active;
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    pub fn snapshot(&self) -> RuleSnapshot {
        RuleSnapshot {
            rule_id: self.id.clone(),
            rule_name: self.name.clone(),
            rule_type: self.rule_type,
            threshold_value: self.threshold_value,
            threshold_operator: self.threshold_operator,
            priority: self.priority,
            notification_channels: self.notification_channels.clone(),
            recipients: self.recipients.clone(),
        }
    }

    pub fn id(&self) -> &RuleId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn threshold_value(&self) -> f64 {
        self.threshold_value
    }

    pub fn threshold_operator(&self) -> Operator {
        self.threshold_operator
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn notification_channels(&self) -> &BTreeSet<Channel> {
        &self.notification_channels
    }

    pub fn recipients_for(&self, channel: Channel) -> &[String] {
        self.recipients
            .get(&channel)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rule() -> ThresholdRule {
        ThresholdRule::new(
            "low stock".into(),
            "reorder point".into(),
            RuleType::StockLow,
            10.0,
            Operator::Lt,
            Priority::High,
            BTreeSet::from([Channel::Dashboard, Channel::Email]),
            BTreeMap::from([(Channel::Email, vec!["ops@pharmacy.test".into()])]),
            true,
        )
        .unwrap()
    }

    #[test]
    fn empty_name_rejected() {
        let result = ThresholdRule::new(
            "  ".into(),
            String::new(),
            RuleType::StockLow,
            10.0,
            Operator::Lt,
            Priority::Low,
            BTreeSet::from([Channel::Dashboard]),
            BTreeMap::new(),
            true,
        );
        assert_eq!(result.err(), Some(DomainError::RuleNameEmpty));
    }

    #[test]
    fn negative_threshold_rejected() {
        let result = ThresholdRule::new(
            "r".into(),
            String::new(),
            RuleType::StockLow,
            -1.0,
            Operator::Lt,
            Priority::Low,
            BTreeSet::from([Channel::Dashboard]),
            BTreeMap::new(),
            true,
        );
        assert_eq!(result.err(), Some(DomainError::InvalidThreshold));
    }

    #[test]
    fn nan_threshold_rejected() {
        let result = ThresholdRule::new(
            "r".into(),
            String::new(),
            RuleType::StockLow,
            f64::NAN,
            Operator::Lt,
            Priority::Low,
            BTreeSet::from([Channel::Dashboard]),
            BTreeMap::new(),
            true,
        );
        assert_eq!(result.err(), Some(DomainError::InvalidThreshold));
    }

    #[test]
    fn active_rule_requires_channel() {
        let result = ThresholdRule::new(
            "r".into(),
            String::new(),
            RuleType::StockLow,
            10.0,
            Operator::Lt,
            Priority::Low,
            BTreeSet::new(),
            BTreeMap::new(),
            true,
        );
        assert_eq!(result.err(), Some(DomainError::RuleRequiresChannel));
    }

    #[test]
    fn inactive_rule_may_omit_channels() {
        let result = ThresholdRule::new(
            "r".into(),
            String::new(),
            RuleType::StockLow,
            10.0,
            Operator::Lt,
            Priority::Low,
            BTreeSet::new(),
            BTreeMap::new(),
            false,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn provider_channel_requires_recipients() {
        let result = ThresholdRule::new(
            "r".into(),
            String::new(),
            RuleType::StockLow,
            10.0,
            Operator::Lt,
            Priority::Low,
            BTreeSet::from([Channel::Sms]),
            BTreeMap::new(),
            true,
        );
        assert_eq!(
            result.err(),
            Some(DomainError::ChannelRequiresRecipient(Channel::Sms))
        );
    }

    #[test]
    fn dashboard_channel_needs_no_recipients() {
        let result = ThresholdRule::new(
            "r".into(),
            String::new(),
            RuleType::StockLow,
            10.0,
            Operator::Lt,
            Priority::Low,
            BTreeSet::from([Channel::Dashboard]),
            BTreeMap::new(),
            true,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn patch_applies_and_revalidates() {
        let mut rule = make_rule();
        rule.apply(RulePatch {
            threshold_value: Some(20.0),
            priority: Some(Priority::Critical),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(rule.threshold_value(), 20.0);
        assert_eq!(rule.priority(), Priority::Critical);
    }

    #[test]
    fn invalid_patch_leaves_rule_unchanged() {
        let mut rule = make_rule();
        let result = rule.apply(RulePatch {
            threshold_value: Some(-5.0),
            ..Default::default()
        });
        assert_eq!(result, Err(DomainError::InvalidThreshold));
        assert_eq!(rule.threshold_value(), 10.0);
    }

    #[test]
    fn patch_cannot_strip_recipients_from_active_rule() {
        let mut rule = make_rule();
        let result = rule.apply(RulePatch {
            recipients: Some(BTreeMap::new()),
            ..Default::default()
        });
        assert_eq!(
            result,
            Err(DomainError::ChannelRequiresRecipient(Channel::Email))
        );
    }

    #[test]
    fn toggle_flips_active_flag() {
        let mut rule = make_rule();
        rule.toggle_active().unwrap();
        assert!(!rule.is_active());
        rule.toggle_active().unwrap();
        assert!(rule.is_active());
    }

    #[test]
    fn toggle_to_active_revalidates_channels() {
        let mut rule = ThresholdRule::new(
            "r".into(),
            String::new(),
            RuleType::StockLow,
            10.0,
            Operator::Lt,
            Priority::Low,
            BTreeSet::new(),
            BTreeMap::new(),
            false,
        )
        .unwrap();
        assert_eq!(
            rule.toggle_active(),
            Err(DomainError::RuleRequiresChannel)
        );
        assert!(!rule.is_active());
    }

    #[test]
    fn snapshot_freezes_rule_parameters() {
        let mut rule = make_rule();
        let snapshot = rule.snapshot();
        rule.apply(RulePatch {
            threshold_value: Some(99.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(snapshot.threshold_value, 10.0);
        assert_eq!(snapshot.rule_id, *rule.id());
    }
}
