//! License feature gate.
//!
//! Resolves a caller-declared tier against the static [`Tier`] table and
//! authorizes or denies a requested feature. Stateless; the table is
//! read-only, so the gate is safe to share across tasks without locking.

use crate::domain::{FeatureDenied, Tier, FEATURE_LOCKED, UNKNOWN_TIER};

/// Header a request-handling collaborator reads the tier from.
pub const TIER_HEADER: &str = "X-GADOS-Tier";

/// Resolve a tier name, falling back to `Free` for unknown names.
pub fn resolve_tier(name: &str) -> Tier {
    Tier::from_name(name).unwrap_or(Tier::Free)
}

/// First tier in table order that grants `feature`, or `"Unknown"`.
pub fn required_tier(feature: &str) -> &'static str {
    Tier::ALL
        .into_iter()
        .find(|t| t.grants(feature))
        .map(|t| t.name())
        .unwrap_or(UNKNOWN_TIER)
}

/// Authorize `feature` for the caller's tier.
///
/// With no feature the resolved tier is always returned. Denial is a
/// request-scoped outcome carrying the caller's original tier name.
pub fn authorize(tier_name: &str, feature: Option<&str>) -> Result<Tier, FeatureDenied> {
    let tier = resolve_tier(tier_name);

    if let Some(feature) = feature {
        if !tier.grants(feature) {
            return Err(FeatureDenied {
                code: FEATURE_LOCKED.to_string(),
                message: format!(
                    "Upgrade to {} to unlock {}.",
                    required_tier(feature),
                    feature
                ),
                current_tier: tier_name.to_string(),
            });
        }
    }

    Ok(tier)
}

/// Header-based entry point: an absent header means `Free`.
pub fn authorize_header(
    header_value: Option<&str>,
    feature: Option<&str>,
) -> Result<Tier, FeatureDenied> {
    authorize(header_value.unwrap_or(Tier::Free.name()), feature)
}
