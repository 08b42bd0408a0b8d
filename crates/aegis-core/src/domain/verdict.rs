//! Verdicts and the wire-level response union.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::EvaluationFailure;
use super::tier::FeatureDenied;
use crate::classifier;

/// Score reported while the evaluator is unavailable.
pub const DEGRADED_SCORE: u8 = 60;

/// Error text for lines that are not a valid request object.
pub const INVALID_JSON_INPUT: &str = "Invalid JSON Input";

/// Verdict category, ordered from worst to best.
///
/// `Error` means no score could be computed for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Error,
    Danger,
    Warning,
    Secure,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Secure => "secure",
            Status::Warning => "warning",
            Status::Danger => "danger",
            Status::Error => "error",
        };
        f.write_str(s)
    }
}

/// Threat level paired with a status: secure is low, warning is medium,
/// danger and error are high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

/// Named scores in [0,1] as returned by the evaluator.
///
/// `overall` drives classification; every dimension is passed through as the
/// verdict breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreSet(BTreeMap<String, f64>);

impl ScoreSet {
    pub const OVERALL: &'static str = "overall";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dimension: impl Into<String>, value: f64) -> Self {
        self.0.insert(dimension.into(), value);
        self
    }

    pub fn overall(&self) -> Option<f64> {
        self.0.get(Self::OVERALL).copied()
    }

    pub fn get(&self, dimension: &str) -> Option<f64> {
        self.0.get(dimension).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for ScoreSet {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The classified result of evaluating one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub status: Status,
    pub threat_level: ThreatLevel,
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScoreSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Verdict {
    /// Classify a score set. Callers must have checked `overall` is present;
    /// a missing value classifies as 0.0.
    pub fn classified(scores: ScoreSet) -> Self {
        let overall = scores.overall().unwrap_or(0.0);
        let (status, threat_level) = classifier::classify(overall);
        Self {
            status,
            threat_level,
            score: classifier::score(overall),
            breakdown: Some(scores),
            message: None,
            timestamp: Utc::now(),
        }
    }

    /// Fallback verdict while the evaluator is unavailable.
    pub fn degraded(reason: &str) -> Self {
        Self {
            status: Status::Warning,
            threat_level: ThreatLevel::Medium,
            score: DEGRADED_SCORE,
            breakdown: None,
            message: Some(format!(
                "Evaluator unreachable. Active defense running locally. Error: {reason}"
            )),
            timestamp: Utc::now(),
        }
    }

    /// Error verdict for a failed evaluation.
    pub fn evaluation_failed(failure: &EvaluationFailure) -> Self {
        Self {
            status: Status::Error,
            threat_level: ThreatLevel::High,
            score: 0,
            breakdown: None,
            message: Some(format!("Evaluation failed: {failure}")),
            timestamp: Utc::now(),
        }
    }
}

/// A structured feature-gate denial on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenialResponse {
    pub error: String,
    #[serde(flatten)]
    pub denied: FeatureDenied,
}

/// A bare `{"error": ...}` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Exactly one of these is written per request line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Verdict(Verdict),
    Denied(DenialResponse),
    Error(ErrorResponse),
}

impl Response {
    /// Protocol error for a line that is not a request object.
    pub fn invalid_json() -> Self {
        Response::Error(ErrorResponse {
            error: INVALID_JSON_INPUT.to_string(),
        })
    }

    /// Answer for a request whose scan died without a response.
    pub fn bridge_error(reason: impl std::fmt::Display) -> Self {
        Response::Error(ErrorResponse {
            error: format!("Bridge Error: {reason}"),
        })
    }

    pub fn denied(denied: FeatureDenied) -> Self {
        Response::Denied(DenialResponse {
            error: denied.message.clone(),
            denied,
        })
    }

    pub fn as_verdict(&self) -> Option<&Verdict> {
        match self {
            Response::Verdict(v) => Some(v),
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Verdict(_) => "verdict",
            Response::Denied(_) => "denied",
            Response::Error(_) => "error",
        }
    }
}
