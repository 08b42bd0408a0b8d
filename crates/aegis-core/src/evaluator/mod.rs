//! Evaluator adapter.
//!
//! Wraps the external scoring capability behind the [`Evaluator`] trait and
//! normalizes every outcome into an [`Assessment`]:
//! - the capability is probed once at startup; if it is unreachable the
//!   [`EvaluatorHandle`] stays `Unavailable` for the life of the process
//! - each call runs in its own task under a bounded timeout, so a panic,
//!   hang, or malformed return becomes an [`EvaluationFailure`] instead of
//!   taking the daemon down

mod command;
mod http;

pub use command::CommandEvaluator;
pub use http::HttpEvaluator;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn, Instrument};

use crate::config::EvaluatorBackend;
use crate::domain::{ChangeContext, EvaluationFailure, ScoreSet, UnreachableDependency};

/// External scoring capability.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Check the capability can be reached. Called once at startup.
    async fn probe(&self) -> Result<(), UnreachableDependency> {
        Ok(())
    }

    /// Score one change context.
    async fn evaluate(&self, context: &ChangeContext) -> Result<ScoreSet, EvaluationFailure>;
}

/// Decode raw evaluator output into a [`ScoreSet`].
///
/// The body must be a JSON object with a numeric `overall`. Other numeric
/// dimensions pass through; non-numeric ones are dropped.
pub fn parse_scores(raw: Value) -> Result<ScoreSet, EvaluationFailure> {
    let Value::Object(map) = raw else {
        return Err(EvaluationFailure::Malformed(
            "expected a JSON object of scores".to_string(),
        ));
    };

    match map.get(ScoreSet::OVERALL) {
        None => {
            return Err(EvaluationFailure::Malformed(
                "missing 'overall' score".to_string(),
            ))
        }
        Some(v) if !v.is_number() => {
            return Err(EvaluationFailure::Malformed(format!(
                "'overall' is not numeric: {v}"
            )))
        }
        Some(_) => {}
    }

    Ok(map
        .into_iter()
        .filter_map(|(dimension, value)| match value.as_f64() {
            Some(score) => Some((dimension, score)),
            None => {
                debug!(%dimension, "dropping non-numeric score dimension");
                None
            }
        })
        .collect())
}

/// Decode raw evaluator bytes (stdout or an HTTP body).
pub fn parse_score_bytes(bytes: &[u8]) -> Result<ScoreSet, EvaluationFailure> {
    let raw: Value = serde_json::from_slice(bytes)
        .map_err(|e| EvaluationFailure::Malformed(format!("invalid JSON: {e}")))?;
    parse_scores(raw)
}

/// Outcome of one adapter call.
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    Scored(ScoreSet),
    Degraded { reason: String },
    Failed(EvaluationFailure),
}

/// Process-wide evaluator state, fixed at startup.
#[derive(Clone)]
pub enum EvaluatorHandle {
    Ready {
        evaluator: Arc<dyn Evaluator>,
        timeout: Duration,
    },
    Unavailable {
        reason: String,
    },
}

impl std::fmt::Debug for EvaluatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorHandle::Ready { evaluator, timeout } => f
                .debug_struct("Ready")
                .field("evaluator", &evaluator.name())
                .field("timeout", timeout)
                .finish(),
            EvaluatorHandle::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

impl EvaluatorHandle {
    /// A reachable evaluator; every call is cut off after `timeout`.
    pub fn ready(evaluator: Arc<dyn Evaluator>, timeout: Duration) -> Self {
        EvaluatorHandle::Ready { evaluator, timeout }
    }

    /// Degraded mode: no evaluator is ever called.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        EvaluatorHandle::Unavailable {
            reason: reason.into(),
        }
    }

    /// Probe `evaluator` once; an unreachable one yields degraded mode.
    pub async fn probe(evaluator: Arc<dyn Evaluator>, timeout: Duration) -> Self {
        match evaluator.probe().await {
            Ok(()) => {
                info!(evaluator = evaluator.name(), "evaluator available");
                Self::ready(evaluator, timeout)
            }
            Err(e) => {
                warn!(evaluator = evaluator.name(), error = %e, "evaluator unavailable, running degraded");
                Self::unavailable(e.to_string())
            }
        }
    }

    /// Build and probe the configured backend.
    pub async fn from_backend(backend: &EvaluatorBackend, timeout: Duration) -> Self {
        let evaluator: Arc<dyn Evaluator> = match backend {
            EvaluatorBackend::None => {
                warn!("no evaluator configured, running degraded");
                return Self::unavailable(UnreachableDependency::NotConfigured.to_string());
            }
            EvaluatorBackend::Command { program, args } => {
                Arc::new(CommandEvaluator::new(program.clone(), args.clone()))
            }
            EvaluatorBackend::Http { endpoint } => match HttpEvaluator::new(endpoint, timeout) {
                Ok(http) => Arc::new(http),
                Err(e) => {
                    warn!(error = %e, "evaluator endpoint rejected, running degraded");
                    return Self::unavailable(e.to_string());
                }
            },
        };
        Self::probe(evaluator, timeout).await
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, EvaluatorHandle::Unavailable { .. })
    }

    /// Run one evaluation. Never panics and never hangs past the timeout.
    pub async fn assess(&self, context: &ChangeContext) -> Assessment {
        let (evaluator, timeout) = match self {
            EvaluatorHandle::Unavailable { reason } => {
                return Assessment::Degraded {
                    reason: reason.clone(),
                }
            }
            EvaluatorHandle::Ready { evaluator, timeout } => (Arc::clone(evaluator), *timeout),
        };

        let context = context.clone();
        let mut task =
            tokio::spawn(async move { evaluator.evaluate(&context).await }.in_current_span());

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Ok(scores))) => Assessment::Scored(scores),
            Ok(Ok(Err(failure))) => Assessment::Failed(failure),
            Ok(Err(join_err)) => Assessment::Failed(EvaluationFailure::Panicked(
                panic_message(join_err),
            )),
            Err(_elapsed) => {
                task.abort();
                Assessment::Failed(EvaluationFailure::Timeout {
                    limit_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}

/// Best-effort text of a task panic.
pub(crate) fn panic_message(err: tokio::task::JoinError) -> String {
    if err.is_cancelled() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
