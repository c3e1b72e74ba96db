use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Active,
    Treated,
    Ignored,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Treated => "treated",
            Self::Ignored => "ignored",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Active)
    }
}
