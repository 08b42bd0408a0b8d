//! Append-only JSONL file backend for [`AuditGraph`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::AuditError;
use crate::graph_traits::{AuditEdge, AuditGraph, AuditResult};

/// Audit graph persisted as one JSON edge per line.
///
/// Appends are serialized through a mutex and each edge is written with a
/// single `write_all`, so a reader never sees a half-written line from this
/// process.
#[derive(Debug)]
pub struct JsonlAuditGraph {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditGraph {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> AuditResult<Vec<AuditEdge>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AuditError::Io(e)),
        };

        let mut edges = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let edge = serde_json::from_str(line).map_err(|e| AuditError::Corrupt {
                line: idx + 1,
                reason: e.to_string(),
            })?;
            edges.push(edge);
        }
        Ok(edges)
    }
}

#[async_trait]
impl AuditGraph for JsonlAuditGraph {
    async fn append_edge(&self, edge: AuditEdge) -> AuditResult<()> {
        edge.validate()?;

        let mut line = serde_json::to_vec(&edge)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(
            source = %edge.source_node,
            target = %edge.target_node,
            predicate = %edge.predicate,
            "audit edge appended"
        );
        Ok(())
    }

    async fn edges_from(&self, node: &str) -> AuditResult<Vec<AuditEdge>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|e| e.source_node == node)
            .collect())
    }

    async fn edges_to(&self, node: &str) -> AuditResult<Vec<AuditEdge>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .filter(|e| e.target_node == node)
            .collect())
    }
}
