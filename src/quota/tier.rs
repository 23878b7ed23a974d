use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Daily limit applied when the stored tier is missing or unrecognised.
pub const DEFAULT_DAILY_LIMIT: u32 = 5;

/// Subscription level determining the daily request limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tier {
    #[default]
    Free,
    Standard,
    Unlimited,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Standard, Tier::Unlimited];

    pub fn daily_limit(self) -> u32 {
        match self {
            Tier::Free => 5,
            Tier::Standard => 20,
            // not truly unbounded, just out of reach for a single student
            Tier::Unlimited => 9999,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Standard => "Standard",
            Tier::Unlimited => "Unlimited",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tier {0:?}")]
pub struct UnknownTier(pub String);

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| UnknownTier(s.to_string()))
    }
}

/// Resolves the daily limit for a tier as stored, falling back to
/// [`DEFAULT_DAILY_LIMIT`] for anything outside the tier table.
pub fn limit_for(stored: Option<&str>) -> u32 {
    stored
        .and_then(|s| s.parse::<Tier>().ok())
        .map(Tier::daily_limit)
        .unwrap_or(DEFAULT_DAILY_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_table_limits() {
        assert_eq!(limit_for(Some("Free")), 5);
        assert_eq!(limit_for(Some("Standard")), 20);
        assert_eq!(limit_for(Some("Unlimited")), 9999);
    }

    #[test]
    fn unknown_or_missing_tier_uses_default() {
        assert_eq!(limit_for(Some("Gold")), DEFAULT_DAILY_LIMIT);
        assert_eq!(limit_for(Some("")), DEFAULT_DAILY_LIMIT);
        assert_eq!(limit_for(None), DEFAULT_DAILY_LIMIT);
    }

    #[test]
    fn parse_is_case_sensitive_but_trims() {
        assert_eq!(" Standard ".parse::<Tier>(), Ok(Tier::Standard));
        assert!("standard".parse::<Tier>().is_err());
    }

    #[test]
    fn default_tier_is_free() {
        assert_eq!(Tier::default(), Tier::Free);
        assert_eq!(Tier::Free.to_string(), "Free");
    }
}
