use async_trait::async_trait;

use stockwatch_core::ids::RuleId;
use stockwatch_core::rule::{RulePatch, ThresholdRule};
use stockwatch_ports::inbound::RuleAdministration;
use stockwatch_ports::outbound::RuleRepository;
use stockwatch_ports::types::RuleDraft;

use crate::error::AppError;

/// Threshold rule store. Validation happens in the domain before
/// anything is persisted; no operation here triggers an evaluation.
pub struct RuleService<R>
where
    R: RuleRepository,
{
    rules: R,
}

impl<R> RuleService<R>
where
    R: RuleRepository,
{
    pub fn new(rules: R) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl<R> RuleAdministration for RuleService<R>
where
    R: RuleRepository,
{
    type Error = AppError;

    async fn create_rule(&self, draft: RuleDraft) -> Result<ThresholdRule, AppError> {
        let rule = ThresholdRule::new(
            draft.name,
            draft.description,
            draft.rule_type,
            draft.threshold_value,
            draft.threshold_operator,
            draft.priority,
            draft.notification_channels,
            draft.recipients,
            draft.is_active,
        )?;
        self.rules.save(&rule).await?;
        Ok(rule)
    }

    async fn update_rule(&self, id: &RuleId, patch: RulePatch) -> Result<ThresholdRule, AppError> {
        let mut rule = self
            .rules
            .find_by_id(id)
            .await?
            .ok_or_else(AppError::not_found)?;
        rule.apply(patch)?;
        self.rules.save(&rule).await?;
        Ok(rule)
    }

    async fn delete_rule(&self, id: &RuleId) -> Result<(), AppError> {
        // Permanent; alerts keep their rule snapshots so nothing is
        // orphaned.
        self.rules.delete(id).await?;
        Ok(())
    }

    async fn toggle_rule(&self, id: &RuleId) -> Result<ThresholdRule, AppError> {
        let mut rule = self
            .rules
            .find_by_id(id)
            .await?
            .ok_or_else(AppError::not_found)?;
        rule.toggle_active()?;
        self.rules.save(&rule).await?;
        Ok(rule)
    }

    async fn list_rules(&self) -> Result<Vec<ThresholdRule>, AppError> {
        Ok(self.rules.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;
    use stockwatch_core::channel::Channel;
    use stockwatch_core::error::DomainError;
    use stockwatch_core::rule::{Operator, Priority, RuleType};
    use stockwatch_ports::error::PortError;

    #[derive(Default)]
    struct MockRuleRepo {
        rules: Mutex<Vec<ThresholdRule>>,
    }

    #[async_trait]
    impl RuleRepository for MockRuleRepo {
        async fn save(&self, rule: &ThresholdRule) -> Result<(), PortError> {
            let mut rules = self.rules.lock().unwrap();
            if let Some(pos) = rules.iter().position(|r| r.id() == rule.id()) {
                rules[pos] = rule.clone();
            } else {
                rules.push(rule.clone());
            }
            Ok(())
        }
        async fn find_by_id(&self, id: &RuleId) -> Result<Option<ThresholdRule>, PortError> {
            Ok(self
                .rules
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id() == id)
                .cloned())
        }
        async fn delete(&self, id: &RuleId) -> Result<(), PortError> {
            let mut rules = self.rules.lock().unwrap();
            match rules.iter().position(|r| r.id() == id) {
                Some(pos) => {
                    rules.remove(pos);
                    Ok(())
                }
                None => Err(PortError::NotFound),
            }
        }
        async fn list(&self) -> Result<Vec<ThresholdRule>, PortError> {
            Ok(self.rules.lock().unwrap().clone())
        }
        async fn list_active(&self) -> Result<Vec<ThresholdRule>, PortError> {
            Ok(self
                .rules
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.is_active())
                .cloned()
                .collect())
        }
    }

    fn make_draft() -> RuleDraft {
        RuleDraft {
            name: "low stock".into(),
            description: "reorder point".into(),
            rule_type: RuleType::StockLow,
            threshold_value: 10.0,
            threshold_operator: Operator::Lt,
            priority: Priority::High,
            notification_channels: BTreeSet::from([Channel::Dashboard]),
            recipients: BTreeMap::new(),
            is_active: true,
        }
    }

    fn make_service() -> RuleService<MockRuleRepo> {
        RuleService::new(MockRuleRepo::default())
    }

    #[tokio::test]
    async fn create_persists_valid_rule() {
        let svc = make_service();
        let rule = svc.create_rule(make_draft()).await.unwrap();
        assert!(rule.is_active());
        assert_eq!(svc.rules.rules.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_invalid_draft_without_persisting() {
        let svc = make_service();
        let result = svc
            .create_rule(RuleDraft {
                threshold_value: -1.0,
                ..make_draft()
            })
            .await;
        assert!(matches!(
            result,
            Err(AppError::Domain(DomainError::InvalidThreshold))
        ));
        assert!(svc.rules.rules.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_applies_patch() {
        let svc = make_service();
        let rule = svc.create_rule(make_draft()).await.unwrap();
        let updated = svc
            .update_rule(
                rule.id(),
                RulePatch {
                    threshold_value: Some(25.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.threshold_value(), 25.0);
    }

    #[tokio::test]
    async fn update_unknown_rule_is_not_found() {
        let svc = make_service();
        let result = svc.update_rule(&RuleId::new(), RulePatch::default()).await;
        assert!(result.is_err_and(|e| e.is_not_found()));
    }

    #[tokio::test]
    async fn delete_unknown_rule_is_not_found() {
        let svc = make_service();
        let result = svc.delete_rule(&RuleId::new()).await;
        assert!(result.is_err_and(|e| e.is_not_found()));
    }

    #[tokio::test]
    async fn toggle_deactivates_without_deleting() {
        let svc = make_service();
        let rule = svc.create_rule(make_draft()).await.unwrap();
        let toggled = svc.toggle_rule(rule.id()).await.unwrap();
        assert!(!toggled.is_active());
        assert_eq!(svc.list_rules().await.unwrap().len(), 1);
    }
}
