use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

impl Operator {
    pub fn compare(&self, metric: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => metric < threshold,
            Self::Lte => metric <= threshold,
            Self::Gt => metric > threshold,
            Self::Gte => metric >= threshold,
            Self::Eq => metric == threshold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Eq => "eq",
        }
    }
}
