//! In-memory fakes for the audit graph (testing only)
//!
//! `MemoryAuditGraph` satisfies the [`AuditGraph`] contract without touching
//! the filesystem.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::graph_traits::{AuditEdge, AuditGraph, AuditResult};

/// In-memory audit graph backed by a `Vec<AuditEdge>`.
#[derive(Debug, Default)]
pub struct MemoryAuditGraph {
    edges: Mutex<Vec<AuditEdge>>,
}

impl MemoryAuditGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every edge appended so far.
    pub fn all_edges(&self) -> Vec<AuditEdge> {
        self.edges.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditGraph for MemoryAuditGraph {
    async fn append_edge(&self, edge: AuditEdge) -> AuditResult<()> {
        edge.validate()?;
        self.edges.lock().unwrap().push(edge);
        Ok(())
    }

    async fn edges_from(&self, node: &str) -> AuditResult<Vec<AuditEdge>> {
        let edges = self.edges.lock().unwrap();
        Ok(edges
            .iter()
            .filter(|e| e.source_node == node)
            .cloned()
            .collect())
    }

    async fn edges_to(&self, node: &str) -> AuditResult<Vec<AuditEdge>> {
        let edges = self.edges.lock().unwrap();
        Ok(edges
            .iter()
            .filter(|e| e.target_node == node)
            .cloned()
            .collect())
    }
}
