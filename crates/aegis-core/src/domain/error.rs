//! Error taxonomy for Aegis Sentinel.
//!
//! None of these are fatal to the daemon. Each maps to a per-request
//! response, a degraded startup mode, or a logged warning.

/// The external evaluator could not be reached or loaded at startup.
///
/// Produces permanent degraded mode; never retried per request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UnreachableDependency {
    #[error("no evaluator configured")]
    NotConfigured,

    #[error("evaluator program not found: {0}")]
    ProgramNotFound(String),

    #[error("evaluator endpoint unreachable: {0}")]
    Endpoint(String),
}

/// A single evaluation call failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationFailure {
    #[error("failed to start evaluator: {0}")]
    Spawn(String),

    #[error("evaluator exited with status {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },

    #[error("evaluator timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("malformed evaluator output: {0}")]
    Malformed(String),

    #[error("evaluator transport error: {0}")]
    Transport(String),

    #[error("evaluator panicked: {0}")]
    Panicked(String),
}

/// Writing evidence to disk failed.
#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("evidence io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("evidence serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("evidence snapshot could not be persisted: {0}")]
    Persist(String),
}

/// Top-level errors for configuration and stream I/O.
#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("stream io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("evidence error: {0}")]
    Evidence(#[from] EvidenceError),
}

/// Result type for sentinel operations.
pub type Result<T> = std::result::Result<T, SentinelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_failure_display() {
        let err = EvaluationFailure::Timeout { limit_ms: 250 };
        assert_eq!(err.to_string(), "evaluator timed out after 250ms");

        let err = EvaluationFailure::Exited {
            code: Some(2),
            stderr: "boom".to_string(),
        };
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_unreachable_display_names_target() {
        let err = UnreachableDependency::ProgramNotFound("guardian-eval".to_string());
        assert!(err.to_string().contains("guardian-eval"));
    }

    #[test]
    fn test_sentinel_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: SentinelError = io.into();
        assert!(err.to_string().contains("stream io error"));
    }
}
