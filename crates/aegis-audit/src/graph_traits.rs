//! Audit graph trait definitions
//!
//! An audit graph is a set of directed, timestamped edges:
//! `(source_node) -[predicate]-> (target_node)` with free-form properties.
//! Nodes are plain strings of the form `"<Kind>:<id>"`, e.g. `"User:123"`
//! or `"Navigation:https://example.com"`.
//!
//! All traits are async and backend-agnostic. An in-memory fake is provided
//! via the `fakes` module.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuditError;

/// Result type for audit graph operations
pub type AuditResult<T> = std::result::Result<T, AuditError>;

/// Well-known edge predicates.
pub mod predicates {
    /// An agent evaluated a navigation event.
    pub const EVALUATED: &str = "EVALUATED";
    /// An actor initiated a deliverable request.
    pub const INITIATED: &str = "INITIATED";
    /// A deliverable was approved by an actor.
    pub const APPROVED_BY: &str = "APPROVED_BY";
    /// A governance action was caused by an earlier event.
    pub const CAUSED_BY: &str = "CAUSED_BY";
}

/// A single directed edge in the audit graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEdge {
    pub source_node: String,
    pub target_node: String,
    pub predicate: String,
    pub timestamp: DateTime<Utc>,
    /// Edge attributes
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl AuditEdge {
    /// Build an edge stamped with the current time and empty properties.
    pub fn new(
        source_node: impl Into<String>,
        target_node: impl Into<String>,
        predicate: impl Into<String>,
    ) -> Self {
        Self {
            source_node: source_node.into(),
            target_node: target_node.into(),
            predicate: predicate.into(),
            timestamp: Utc::now(),
            properties: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.properties = properties;
        self
    }

    /// Reject edges with empty endpoints or predicate.
    pub fn validate(&self) -> AuditResult<()> {
        if self.source_node.is_empty() {
            return Err(AuditError::InvalidEdge("source_node is empty".to_string()));
        }
        if self.target_node.is_empty() {
            return Err(AuditError::InvalidEdge("target_node is empty".to_string()));
        }
        if self.predicate.is_empty() {
            return Err(AuditError::InvalidEdge("predicate is empty".to_string()));
        }
        Ok(())
    }
}

/// Append-only audit graph.
///
/// Guarantees:
/// - Edges are never modified or removed once appended.
/// - Query results preserve append order.
#[async_trait]
pub trait AuditGraph: Send + Sync {
    /// Append a validated edge.
    async fn append_edge(&self, edge: AuditEdge) -> AuditResult<()>;

    /// All edges leaving `node`, in append order.
    async fn edges_from(&self, node: &str) -> AuditResult<Vec<AuditEdge>>;

    /// All edges entering `node`, in append order.
    async fn edges_to(&self, node: &str) -> AuditResult<Vec<AuditEdge>>;
}

/// Breadth-first walk of outgoing edges starting at `node`.
///
/// Returns every edge reachable within `max_depth` hops, each edge once,
/// in discovery order. Cycles are tolerated.
pub async fn causal_chain(
    graph: &dyn AuditGraph,
    node: &str,
    max_depth: usize,
) -> AuditResult<Vec<AuditEdge>> {
    let mut chain = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();

    visited.insert(node.to_string());
    queue.push_back((node.to_string(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for edge in graph.edges_from(&current).await? {
            if visited.insert(edge.target_node.clone()) {
                queue.push_back((edge.target_node.clone(), depth + 1));
            }
            chain.push(edge);
        }
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_new_has_empty_object_properties() {
        let edge = AuditEdge::new("User:1", "Request:2", predicates::INITIATED);
        assert!(edge.properties.as_object().unwrap().is_empty());
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_edge_validation_rejects_empty_fields() {
        let edge = AuditEdge::new("", "Request:2", predicates::INITIATED);
        assert!(matches!(edge.validate(), Err(AuditError::InvalidEdge(_))));

        let edge = AuditEdge::new("User:1", "Request:2", "");
        let err = edge.validate().unwrap_err();
        assert!(err.to_string().contains("predicate"));
    }

    #[test]
    fn test_edge_serde_field_names() {
        let edge = AuditEdge::new("User:1", "Request:2", predicates::APPROVED_BY)
            .with_properties(serde_json::json!({"note": "ok"}));
        let value = serde_json::to_value(&edge).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "source_node",
            "target_node",
            "predicate",
            "timestamp",
            "properties",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(value["properties"]["note"], "ok");
    }
}
