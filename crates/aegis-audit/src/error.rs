//! Error types for aegis-audit

use thiserror::Error;

/// Errors that can occur in the audit graph layer
#[derive(Error, Debug)]
pub enum AuditError {
    /// Underlying file I/O failed
    #[error("Audit log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Edge could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A stored line could not be decoded
    #[error("Corrupt audit record at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    /// Edge is missing a required endpoint or predicate
    #[error("Invalid edge: {0}")]
    InvalidEdge(String),
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        AuditError::Serialization(err.to_string())
    }
}
