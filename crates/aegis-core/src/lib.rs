//! Aegis Sentinel Core Library
//!
//! Threat-verdict pipeline for browser navigations: scan requests in,
//! classified verdicts out, every answer recorded as evidence.

pub mod classifier;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod evaluator;
pub mod evidence;
pub mod feature_gate;
pub mod metrics;
pub mod obs;
pub mod pipeline;
pub mod telemetry;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use classifier::{classify, SECURE_THRESHOLD, WARNING_THRESHOLD};

pub use config::{EvaluatorBackend, SentinelConfig};

pub use daemon::{DaemonState, DaemonSummary, Sentinel};

pub use domain::{
    ChangeContext, EvaluationFailure, EvidenceError, Feature, FeatureDenied, Response, Result,
    ScanRequest, ScoreSet, SentinelError, Status, ThreatLevel, Tier, UnreachableDependency,
    Verdict,
};

pub use evaluator::{Assessment, CommandEvaluator, Evaluator, EvaluatorHandle, HttpEvaluator};

pub use evidence::{
    read_evidence_log, AppendLogRecorder, EvidenceEntry, EvidenceRecorder, SnapshotRecorder,
};

pub use feature_gate::{authorize, authorize_header, TIER_HEADER};

pub use pipeline::Scanner;

pub use telemetry::init_tracing;
