//! License tiers and their static capability table.

use serde::{Deserialize, Serialize};

/// Denial code for a feature the caller's tier does not grant.
pub const FEATURE_LOCKED: &str = "FEATURE_LOCKED";

/// Name reported when no tier grants a feature.
pub const UNKNOWN_TIER: &str = "Unknown";

/// A named license level. Declaration order is the table's enumeration
/// order, which decides the minimum tier reported for a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Free,
    Professional,
    Enterprise,
    #[serde(rename = "Banking_Advisory")]
    BankingAdvisory,
}

/// What a tier unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCapabilities {
    pub max_projects: u32,
    pub advanced_advisors: bool,
    pub banking: bool,
}

/// A gateable capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    MaxProjects,
    AdvancedAdvisors,
    Banking,
}

impl Feature {
    /// Unknown names are `None`, which every tier treats as not granted.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "max_projects" => Some(Feature::MaxProjects),
            "advanced_advisors" => Some(Feature::AdvancedAdvisors),
            "banking" => Some(Feature::Banking),
            _ => None,
        }
    }
}

impl Tier {
    pub const ALL: [Tier; 4] = [
        Tier::Free,
        Tier::Professional,
        Tier::Enterprise,
        Tier::BankingAdvisory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Professional => "Professional",
            Tier::Enterprise => "Enterprise",
            Tier::BankingAdvisory => "Banking_Advisory",
        }
    }

    /// Exact, case-sensitive match on [`Tier::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Tier::ALL.into_iter().find(|t| t.name() == name)
    }

    pub const fn capabilities(&self) -> TierCapabilities {
        match self {
            Tier::Free => TierCapabilities {
                max_projects: 3,
                advanced_advisors: false,
                banking: false,
            },
            Tier::Professional | Tier::Enterprise => TierCapabilities {
                max_projects: 999,
                advanced_advisors: true,
                banking: false,
            },
            Tier::BankingAdvisory => TierCapabilities {
                max_projects: 999,
                advanced_advisors: true,
                banking: true,
            },
        }
    }

    /// Total over feature names: anything unrecognised is `false`.
    pub fn grants(&self, feature: &str) -> bool {
        let caps = self.capabilities();
        match Feature::from_name(feature) {
            Some(Feature::MaxProjects) => caps.max_projects > 0,
            Some(Feature::AdvancedAdvisors) => caps.advanced_advisors,
            Some(Feature::Banking) => caps.banking,
            None => false,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured 403-equivalent denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct FeatureDenied {
    pub code: String,
    pub message: String,
    /// The tier name exactly as the caller supplied it.
    pub current_tier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_names_roundtrip() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_name(tier.name()), Some(tier));
        }
        assert_eq!(Tier::from_name("free"), None);
    }

    #[test]
    fn test_capability_table() {
        assert_eq!(Tier::Free.capabilities().max_projects, 3);
        assert!(!Tier::Free.grants("advanced_advisors"));
        assert!(Tier::Professional.grants("advanced_advisors"));
        assert!(!Tier::Enterprise.grants("banking"));
        assert!(Tier::BankingAdvisory.grants("banking"));
    }

    #[test]
    fn test_unknown_feature_is_false_for_every_tier() {
        for tier in Tier::ALL {
            assert!(!tier.grants("teleportation"));
            assert!(!tier.grants(""));
        }
    }

    #[test]
    fn test_banking_advisory_serde_name() {
        let raw = serde_json::to_string(&Tier::BankingAdvisory).unwrap();
        assert_eq!(raw, "\"Banking_Advisory\"");
    }
}
