//! Aegis-Audit: Graph-Native Audit Log
//!
//! Records causal relationships between actors and lifecycle events as
//! directed edges (adjacency-list pattern), so a governance action can be
//! traced back to the navigation verdict that triggered it.
//!
//! ## Key Components
//!
//! - `AuditGraph`: async append/query trait, backend-agnostic
//! - `JsonlAuditGraph`: append-only newline-delimited JSON file backend
//! - `fakes::MemoryAuditGraph`: in-memory backend for tests

mod error;
pub mod fakes;
pub mod graph_traits;
mod jsonl;

pub use error::AuditError;
pub use graph_traits::{causal_chain, predicates, AuditEdge, AuditGraph, AuditResult};
pub use jsonl::JsonlAuditGraph;
