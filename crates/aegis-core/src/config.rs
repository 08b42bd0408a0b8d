//! Sentinel configuration, resolved once at startup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{Result, SentinelError};

/// Default append-only evidence log (daemon mode), relative to cwd.
pub const DEFAULT_EVIDENCE_LOG: &str = "evidence_stream.log";

/// Default snapshot file (one-shot mode), relative to cwd.
pub const DEFAULT_SNAPSHOT: &str = "evidence_dump.json";

/// Per-evaluation limit; also bounds the startup probe.
pub const DEFAULT_EVALUATOR_TIMEOUT_MS: u64 = 10_000;

/// Evaluations allowed to run at once in daemon mode.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Where scores come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvaluatorBackend {
    /// No evaluator: the sentinel runs degraded.
    #[default]
    None,
    /// Spawn a program per request; context on stdin, scores on stdout.
    Command { program: PathBuf, args: Vec<String> },
    /// POST the context to an HTTP endpoint.
    Http { endpoint: String },
}

/// Startup configuration. Build with the `with_*` methods, then
/// [`validate`](Self::validate) before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentinelConfig {
    pub evidence_log: PathBuf,
    pub snapshot_path: PathBuf,
    /// When set, each verdict also appends an edge to this audit graph log.
    pub audit_log: Option<PathBuf>,
    pub evaluator: EvaluatorBackend,
    pub evaluator_timeout_ms: u64,
    /// Upper bound on concurrently evaluating requests.
    pub max_in_flight: usize,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            evidence_log: PathBuf::from(DEFAULT_EVIDENCE_LOG),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT),
            audit_log: None,
            evaluator: EvaluatorBackend::None,
            evaluator_timeout_ms: DEFAULT_EVALUATOR_TIMEOUT_MS,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl SentinelConfig {
    pub fn with_evaluator(mut self, evaluator: EvaluatorBackend) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_evidence_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.evidence_log = path.into();
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log = Some(path.into());
        self
    }

    pub fn with_evaluator_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.evaluator_timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn evaluator_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluator_timeout_ms)
    }

    /// Reject values the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.evaluator_timeout_ms == 0 {
            return Err(SentinelError::InvalidConfig(
                "evaluator_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(SentinelError::InvalidConfig(
                "max_in_flight must be at least 1".to_string(),
            ));
        }
        if self.evidence_log.as_os_str().is_empty() || self.snapshot_path.as_os_str().is_empty() {
            return Err(SentinelError::InvalidConfig(
                "evidence paths must not be empty".to_string(),
            ));
        }
        if let EvaluatorBackend::Command { program, .. } = &self.evaluator {
            if program.as_os_str().is_empty() {
                return Err(SentinelError::InvalidConfig(
                    "evaluator program must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_fixed_relative_paths() {
        let config = SentinelConfig::default();
        assert_eq!(config.evidence_log, PathBuf::from("evidence_stream.log"));
        assert_eq!(config.snapshot_path, PathBuf::from("evidence_dump.json"));
        assert_eq!(config.evaluator, EvaluatorBackend::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = SentinelConfig::default();
        config.max_in_flight = 0;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.evaluator_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("evaluator_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_empty_program() {
        let config = SentinelConfig::default().with_evaluator(EvaluatorBackend::Command {
            program: PathBuf::new(),
            args: vec![],
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_serde_tagged() {
        let backend = EvaluatorBackend::Http {
            endpoint: "http://localhost:8080/evaluate".to_string(),
        };
        let value = serde_json::to_value(&backend).unwrap();
        assert_eq!(value["type"], "http");
    }
}
