//! Verdict classification.
//!
//! Maps an `overall` score to a status/threat-level pair using fixed
//! thresholds. Pure and total: inputs outside [0,1] (and NaN) are clamped
//! first, since the evaluator is untrusted.

use crate::domain::{Status, ThreatLevel};

/// At or above this, content is secure.
pub const SECURE_THRESHOLD: f64 = 0.70;

/// At or above this (and below secure), content is a warning.
pub const WARNING_THRESHOLD: f64 = 0.50;

/// Clamp to [0,1]; NaN becomes 0.0.
pub fn clamp_unit(overall: f64) -> f64 {
    if overall.is_nan() {
        0.0
    } else {
        overall.clamp(0.0, 1.0)
    }
}

/// Map an overall score to its status and threat level. Thresholds are
/// inclusive lower bounds.
///
/// ```
/// use aegis_core::domain::{Status, ThreatLevel};
/// use aegis_core::classify;
///
/// assert_eq!(classify(0.70), (Status::Secure, ThreatLevel::Low));
/// assert_eq!(classify(0.50), (Status::Warning, ThreatLevel::Medium));
/// assert_eq!(classify(0.49), (Status::Danger, ThreatLevel::High));
/// ```
pub fn classify(overall: f64) -> (Status, ThreatLevel) {
    let overall = clamp_unit(overall);
    if overall >= SECURE_THRESHOLD {
        (Status::Secure, ThreatLevel::Low)
    } else if overall >= WARNING_THRESHOLD {
        (Status::Warning, ThreatLevel::Medium)
    } else {
        (Status::Danger, ThreatLevel::High)
    }
}

/// `round(overall * 100)` clamped to 0..=100.
pub fn score(overall: f64) -> u8 {
    (clamp_unit(overall) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(classify(0.70), (Status::Secure, ThreatLevel::Low));
        assert_eq!(classify(0.6999), (Status::Warning, ThreatLevel::Medium));
        assert_eq!(classify(0.50), (Status::Warning, ThreatLevel::Medium));
        assert_eq!(classify(0.4999), (Status::Danger, ThreatLevel::High));
        assert_eq!(classify(0.0), (Status::Danger, ThreatLevel::High));
        assert_eq!(classify(1.0), (Status::Secure, ThreatLevel::Low));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(classify(7.5), (Status::Secure, ThreatLevel::Low));
        assert_eq!(classify(-3.0), (Status::Danger, ThreatLevel::High));
        assert_eq!(classify(f64::NAN), (Status::Danger, ThreatLevel::High));
        assert_eq!(score(7.5), 100);
        assert_eq!(score(-3.0), 0);
        assert_eq!(score(f64::NAN), 0);
    }

    #[test]
    fn test_score_rounds() {
        assert_eq!(score(0.85), 85);
        assert_eq!(score(0.856), 86);
        assert_eq!(score(0.004), 0);
        assert_eq!(score(0.996), 100);
    }

    #[test]
    fn test_classification_is_monotonic() {
        let mut previous = classify(0.0).0;
        for step in 0..=1000 {
            let overall = step as f64 / 1000.0;
            let (status, _) = classify(overall);
            assert!(status >= previous, "downgrade at {overall}");
            previous = status;
        }
    }

    #[test]
    fn test_threat_level_never_rises_with_score() {
        let mut previous = classify(0.0).1;
        for step in 0..=100 {
            let (_, level) = classify(step as f64 / 100.0);
            assert!(level <= previous);
            previous = level;
        }
    }
}
