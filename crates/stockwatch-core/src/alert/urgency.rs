use serde::{Deserialize, Serialize};

use crate::rule::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn from_priority(priority: Priority) -> Self {
        match priority {
            Priority::Low => Self::Low,
            Priority::Medium => Self::Medium,
            Priority::High => Self::High,
            Priority::Critical => Self::Critical,
        }
    }

    /// One level up, saturating at Critical.
    pub fn bumped(&self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High => Self::Critical,
            Self::Critical => Self::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_saturates_at_critical() {
        assert_eq!(Urgency::Low.bumped(), Urgency::Medium);
        assert_eq!(Urgency::High.bumped(), Urgency::Critical);
        assert_eq!(Urgency::Critical.bumped(), Urgency::Critical);
    }

    #[test]
    fn priority_maps_one_to_one() {
        assert_eq!(Urgency::from_priority(Priority::Critical), Urgency::Critical);
        assert_eq!(Urgency::from_priority(Priority::Low), Urgency::Low);
    }
}
