//! In-memory graph store
//!
//! Upsert semantics match a MERGE-by-key property graph: nodes keyed by
//! id, edges keyed by (source, type, target), properties merged with the
//! newest value winning.

use std::collections::HashMap;

use async_trait::async_trait;
use reqgraph_core::{RelationType, ReqGraphError, Result};
use tokio::sync::RwLock;

use crate::{EdgeRecord, GraphStore, NodeRecord, UpsertOutcome};

type EdgeKey = (String, RelationType, String);

#[derive(Default)]
struct Inner {
    nodes: HashMap<String, NodeRecord>,
    edges: Vec<EdgeRecord>,
    edge_index: HashMap<EdgeKey, usize>,
}

/// Thread-safe in-process graph store
#[derive(Default)]
pub struct MemoryGraphStore {
    inner: RwLock<Inner>,
}

impl MemoryGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all edges in insertion order
    pub async fn edges(&self) -> Vec<EdgeRecord> {
        self.inner.read().await.edges.clone()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upsert_node(&self, node: NodeRecord) -> Result<UpsertOutcome> {
        let mut inner = self.inner.write().await;

        match inner.nodes.get_mut(&node.id) {
            Some(existing) => {
                if existing.label != node.label {
                    return Err(ReqGraphError::Graph(format!(
                        "node {} is a {}, not a {}",
                        node.id, existing.label, node.label
                    )));
                }
                existing.properties.extend(node.properties);
                Ok(UpsertOutcome::Merged)
            }
            None => {
                inner.nodes.insert(node.id.clone(), node);
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn upsert_edge(&self, edge: EdgeRecord) -> Result<UpsertOutcome> {
        let mut inner = self.inner.write().await;

        for endpoint in [&edge.source, &edge.target] {
            if !inner.nodes.contains_key(endpoint) {
                return Err(ReqGraphError::Graph(format!(
                    "edge {} references unknown node {endpoint}",
                    edge.relation
                )));
            }
        }

        let key = (edge.source.clone(), edge.relation, edge.target.clone());
        match inner.edge_index.get(&key).copied() {
            Some(idx) => {
                inner.edges[idx].properties.extend(edge.properties);
                Ok(UpsertOutcome::Merged)
            }
            None => {
                let idx = inner.edges.len();
                inner.edges.push(edge);
                inner.edge_index.insert(key, idx);
                Ok(UpsertOutcome::Created)
            }
        }
    }

    async fn get_node(&self, id: &str) -> Result<Option<NodeRecord>> {
        Ok(self.inner.read().await.nodes.get(id).cloned())
    }

    async fn edges_from(&self, id: &str) -> Result<Vec<EdgeRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .edges
            .iter()
            .filter(|e| e.source == id)
            .cloned()
            .collect())
    }

    async fn node_count(&self) -> Result<usize> {
        Ok(self.inner.read().await.nodes.len())
    }

    async fn edge_count(&self) -> Result<usize> {
        Ok(self.inner.read().await.edges.len())
    }
}

// ============================================================================
// Tests
// ============================================================================
