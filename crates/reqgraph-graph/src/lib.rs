//! reqgraph Graph - Graph store abstraction
//!
//! Writes extraction payloads into a property graph with upsert-by-id
//! semantics. The store itself is a collaborator behind [`GraphStore`];
//! [`MemoryGraphStore`] is the in-process implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqgraph_core::{EntityLabel, RelationType, Result};
use serde::{Deserialize, Serialize};

pub mod loader;
pub mod memory_store;

pub use loader::{GraphLoader, GraphScope, LoadResult};
pub use memory_store::MemoryGraphStore;

/// Node as written to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub label: EntityLabel,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Edge as written to the store; identity is (source, relation, target)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: String,
    #[serde(rename = "type")]
    pub relation: RelationType,
    pub target: String,
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl EdgeRecord {
    /// The (source, type, target) identity of this edge
    pub fn key(&self) -> (&str, RelationType, &str) {
        (&self.source, self.relation, &self.target)
    }
}

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Created,
    Merged,
}

/// Trait for graph database operations
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create the node if absent, otherwise merge its properties
    async fn upsert_node(&self, node: NodeRecord) -> Result<UpsertOutcome>;

    /// Create the edge if absent, otherwise merge its properties.
    /// Both endpoints must already exist.
    async fn upsert_edge(&self, edge: EdgeRecord) -> Result<UpsertOutcome>;

    /// Get node by id
    async fn get_node(&self, id: &str) -> Result<Option<NodeRecord>>;

    /// Outgoing edges of a node
    async fn edges_from(&self, id: &str) -> Result<Vec<EdgeRecord>>;

    /// Number of stored nodes
    async fn node_count(&self) -> Result<usize>;

    /// Number of stored edges
    async fn edge_count(&self) -> Result<usize>;
}
