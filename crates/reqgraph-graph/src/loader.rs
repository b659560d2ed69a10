//! Payload loader
//!
//! Turns a [`GraphPayload`] into node and edge upserts. Scope properties
//! (recording id, source, load time) are added here, never by the
//! extractor.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use reqgraph_core::{GraphConfig, GraphPayload, Result};

use crate::{EdgeRecord, GraphStore, NodeRecord, UpsertOutcome};

/// Where a payload came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphScope {
    /// Recording (or document) the payload was extracted from
    pub recording_id: Uuid,
    /// Optional human-readable source, e.g. a file name
    pub source: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

impl GraphScope {
    /// New scope with a fresh recording id
    pub fn new() -> Self {
        Self {
            recording_id: Uuid::new_v4(),
            source: None,
            loaded_at: Utc::now(),
        }
    }

    /// Use a known recording id
    pub fn with_recording_id(mut self, recording_id: Uuid) -> Self {
        self.recording_id = recording_id;
        self
    }

    /// Set source name
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for GraphScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one load
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadResult {
    pub recording_id: Option<Uuid>,
    pub nodes_created: usize,
    pub nodes_merged: usize,
    pub edges_created: usize,
    pub edges_merged: usize,
    /// Reverse-direction edges written (counted in the edge totals too)
    pub inverse_edges: usize,
}

impl LoadResult {
    fn record_node(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.nodes_created += 1,
            UpsertOutcome::Merged => self.nodes_merged += 1,
        }
    }

    fn record_edge(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.edges_created += 1,
            UpsertOutcome::Merged => self.edges_merged += 1,
        }
    }
}

/// Converts payloads into store upserts
#[derive(Debug, Clone)]
pub struct GraphLoader {
    /// Property name carrying the recording id
    scope_key: String,
    /// Also write OWNS / SUPPORTS / SATISFIED_BY
    materialize_inverse: bool,
}

impl GraphLoader {
    /// Loader with default settings
    pub fn new() -> Self {
        Self::from_config(&GraphConfig::default())
    }

    /// Create from graph configuration
    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            scope_key: config.scope_key.clone(),
            materialize_inverse: config.materialize_inverse,
        }
    }

    /// Enable/disable inverse edge materialization
    pub fn with_inverse_edges(mut self, materialize_inverse: bool) -> Self {
        self.materialize_inverse = materialize_inverse;
        self
    }

    fn scope_properties(&self, scope: &GraphScope) -> BTreeMap<String, Value> {
        let mut properties = BTreeMap::new();
        properties.insert(
            self.scope_key.clone(),
            Value::String(scope.recording_id.to_string()),
        );
        if let Some(source) = &scope.source {
            properties.insert("source".to_string(), Value::String(source.clone()));
        }
        properties.insert(
            "loaded_at".to_string(),
            Value::String(scope.loaded_at.to_rfc3339()),
        );
        properties
    }

    /// Node upserts for every entity in the payload
    pub fn node_records(&self, payload: &GraphPayload, scope: &GraphScope) -> Vec<NodeRecord> {
        let scope_props = self.scope_properties(scope);

        payload
            .entities
            .iter()
            .map(|entity| {
                let mut properties = entity.properties.clone();
                properties.insert("name".to_string(), Value::String(entity.name.clone()));
                if let Some(confidence) = entity.confidence {
                    properties.insert("confidence".to_string(), Value::from(confidence));
                }
                properties.extend(scope_props.clone());

                NodeRecord {
                    id: entity.id.clone(),
                    label: entity.label,
                    properties,
                }
            })
            .collect()
    }

    /// Edge upserts for every relationship, plus inverses when enabled
    pub fn edge_records(&self, payload: &GraphPayload, scope: &GraphScope) -> Vec<EdgeRecord> {
        let scope_props = self.scope_properties(scope);
        let mut edges = Vec::new();

        for rel in &payload.relationships {
            let mut properties = scope_props.clone();
            if let Some(confidence) = rel.confidence {
                properties.insert("confidence".to_string(), Value::from(confidence));
            }

            edges.push(EdgeRecord {
                source: rel.source.clone(),
                relation: rel.relation,
                target: rel.target.clone(),
                properties: properties.clone(),
            });

            if self.materialize_inverse {
                if let Some(inverse) = rel.relation.inverse() {
                    edges.push(EdgeRecord {
                        source: rel.target.clone(),
                        relation: inverse,
                        target: rel.source.clone(),
                        properties,
                    });
                }
            }
        }

        edges
    }

    /// Write a payload into `store`
    pub async fn load(
        &self,
        store: &dyn GraphStore,
        payload: &GraphPayload,
        scope: &GraphScope,
    ) -> Result<LoadResult> {
        let mut result = LoadResult {
            recording_id: Some(scope.recording_id),
            ..LoadResult::default()
        };

        for node in self.node_records(payload, scope) {
            let outcome = store.upsert_node(node).await?;
            result.record_node(outcome);
        }

        for edge in self.edge_records(payload, scope) {
            let is_inverse = !payload.has_relationship(&edge.source, edge.relation, &edge.target);
            let outcome = store.upsert_edge(edge).await?;
            result.record_edge(outcome);
            if is_inverse {
                result.inverse_edges += 1;
            }
        }

        info!(
            recording_id = %scope.recording_id,
            nodes_created = result.nodes_created,
            nodes_merged = result.nodes_merged,
            edges_created = result.edges_created,
            edges_merged = result.edges_merged,
            "Payload loaded"
        );
        Ok(result)
    }
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqgraph_core::{Entity, EntityLabel, RelationType, Relationship};

    fn payload() -> GraphPayload {
        GraphPayload {
            entities: vec![
                Entity::new(EntityLabel::Feature, "Export Module").unwrap(),
                Entity::new(EntityLabel::Team, "Platform Team").unwrap(),
            ],
            relationships: vec![Relationship::new(
                "feature:export_module",
                RelationType::OwnedBy,
                "team:platform_team",
            )],
        }
    }

    #[test]
    fn test_node_records_carry_scope() {
        let scope = GraphScope::new().with_source("standup.txt");
        let nodes = GraphLoader::new().node_records(&payload(), &scope);

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].properties["name"], "Export Module");
        assert_eq!(
            nodes[0].properties["recording_id"],
            scope.recording_id.to_string()
        );
        assert_eq!(nodes[1].properties["source"], "standup.txt");
        assert!(nodes[1].properties.contains_key("loaded_at"));
    }

    #[test]
    fn test_custom_scope_key() {
        let config = GraphConfig {
            scope_key: "meeting_id".to_string(),
            ..GraphConfig::default()
        };
        let nodes = GraphLoader::from_config(&config).node_records(&payload(), &GraphScope::new());

        assert!(nodes[0].properties.contains_key("meeting_id"));
        assert!(!nodes[0].properties.contains_key("recording_id"));
    }

    #[test]
    fn test_inverse_edges() {
        let scope = GraphScope::new();

        let plain = GraphLoader::new().edge_records(&payload(), &scope);
        assert_eq!(plain.len(), 1);

        let both = GraphLoader::new()
            .with_inverse_edges(true)
            .edge_records(&payload(), &scope);
        assert_eq!(both.len(), 2);
        assert_eq!(both[0].relation, RelationType::OwnedBy);
        assert_eq!(
            both[1].key(),
            ("team:platform_team", RelationType::Owns, "feature:export_module")
        );
    }
}
