use crate::rule::RuleType;

/// Operator guidance attached to an alert at creation, ordered by how
/// often each action resolves the underlying condition.
pub fn recommended_actions(rule_type: RuleType) -> Vec<String> {
    let actions: &[&str] = match rule_type {
        RuleType::StockLow => &["create reorder", "adjust threshold", "transfer stock"],
        RuleType::Stockout => &[
            "create emergency reorder",
            "contact supplier",
            "check equivalents",
        ],
        RuleType::Expiration => &["promote", "transfer", "return to supplier"],
        RuleType::Overstock => &["pause reorders", "transfer stock", "plan promotion"],
        RuleType::SlowRotation => &["plan promotion", "reduce facings", "return to supplier"],
    };
    actions.iter().map(|a| (*a).to_string()).collect()
}
