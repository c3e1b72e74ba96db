use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::ProductId;
use crate::rule::RuleType;

/// Inventory record as read from the product store. Not an aggregate:
/// the evaluator treats it as input and never writes it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub code: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub critical_threshold: i64,
    pub low_threshold: i64,
    pub expiry_date: Option<NaiveDate>,
    pub monthly_rotation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    Rupture,
    Critical,
    Low,
    Ok,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rupture => "rupture",
            Self::Critical => "critical",
            Self::Low => "low",
            Self::Ok => "ok",
        }
    }
}

impl ProductRecord {
    /// A record that fails here is logged and skipped by the evaluator;
    /// it never aborts a batch.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.code.trim().is_empty() {
            return Err(DomainError::MalformedProduct(format!(
                "product {} has an empty code",
                self.id
            )));
        }
        if self.quantity < 0 {
            return Err(DomainError::MalformedProduct(format!(
                "product {} has negative quantity {}",
                self.code, self.quantity
            )));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(DomainError::MalformedProduct(format!(
                "product {} has invalid unit price",
                self.code
            )));
        }
        Ok(())
    }

    pub fn stock_status(&self) -> StockStatus {
        if self.quantity == 0 {
            StockStatus::Rupture
        } else if self.quantity <= self.critical_threshold {
            StockStatus::Critical
        } else if self.quantity <= self.low_threshold {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }

    pub fn days_until_expiry(&self, today: NaiveDate) -> Option<i64> {
        self.expiry_date
            .map(|d| d.signed_duration_since(today).num_days())
    }

    /// The value a rule of the given type compares against its threshold.
    /// `None` means the rule does not apply to this product (no expiry
    /// date, rotation untracked) and is skipped without being a breach.
    pub fn metric(&self, rule_type: RuleType, today: NaiveDate) -> Option<f64> {
        match rule_type {
            RuleType::StockLow | RuleType::Stockout | RuleType::Overstock => {
                Some(self.quantity as f64)
            }
            RuleType::Expiration => self.days_until_expiry(today).map(|d| d as f64),
            RuleType::SlowRotation => self.monthly_rotation,
        }
    }

    pub fn stock_value(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}
