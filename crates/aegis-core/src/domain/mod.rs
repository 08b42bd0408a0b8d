//! Domain models for Aegis Sentinel.
//!
//! Canonical definitions for the core entities:
//! - `ScanRequest` / `ChangeContext`: what the host asks about, and what the
//!   evaluator sees
//! - `Verdict` / `Response`: what goes back on the wire
//! - `Tier`: license levels and their capability table

pub mod error;
pub mod request;
pub mod tier;
pub mod verdict;

pub use error::{EvaluationFailure, EvidenceError, Result, SentinelError, UnreachableDependency};
pub use request::{ChangeContext, ScanRequest, BLANK_PAGE, BROWSER_AGENT, BROWSER_NAVIGATION};
pub use tier::{Feature, FeatureDenied, Tier, TierCapabilities, FEATURE_LOCKED, UNKNOWN_TIER};
pub use verdict::{
    DenialResponse, ErrorResponse, Response, ScoreSet, Status, ThreatLevel, Verdict,
    DEGRADED_SCORE, INVALID_JSON_INPUT,
};
