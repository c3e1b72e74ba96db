use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    StockLow,
    Expiration,
    Stockout,
    Overstock,
    SlowRotation,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StockLow => "stock_low",
            Self::Expiration => "expiration",
            Self::Stockout => "stockout",
            Self::Overstock => "overstock",
            Self::SlowRotation => "slow_rotation",
        }
    }
}
