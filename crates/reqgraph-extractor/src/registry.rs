//! Entity registry
//!
//! Insertion-ordered map from canonical id to entity, owned by a single
//! extraction pass. It is the only place entities are deduplicated: two
//! spans that normalize to the same id collapse to the first one seen.

use std::collections::HashMap;

use reqgraph_core::{Entity, EntityLabel, Result};

use crate::normalize::normalize_name;

/// Owned accumulator of entities for one extraction call
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully built entity.
    ///
    /// Malformed records are rejected. If the id is already present the
    /// existing entity is kept and returned unchanged.
    pub fn insert(&mut self, entity: Entity) -> Result<&Entity> {
        entity.validate()?;

        let idx = match self.index.get(&entity.id) {
            Some(&idx) => idx,
            None => {
                let idx = self.entities.len();
                self.index.insert(entity.id.clone(), idx);
                self.entities.push(entity);
                idx
            }
        };

        Ok(&self.entities[idx])
    }

    /// Normalize a raw span and make sure an entity exists for it.
    ///
    /// Returns the canonical id, or `None` when the span normalizes to
    /// nothing.
    pub fn ensure(&mut self, label: EntityLabel, raw: &str) -> Option<String> {
        let name = normalize_name(label, raw);
        let entity = Entity::new(label, name).ok()?;
        self.insert(entity).ok().map(|e| e.id.clone())
    }

    /// Look up an entity by id
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.index.get(id).map(|&idx| &self.entities[idx])
    }

    /// Stakeholder introduced with the given role ("Sarah Kim, the Blockchain Lead,")
    pub fn role_holder(&self, role: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| {
            e.label == EntityLabel::Stakeholder
                && e.properties.get("role").and_then(|v| v.as_str()) == Some(role)
        })
    }

    /// Check if an id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of registered entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in insertion order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Take ownership of the entities, in insertion order
    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_name_wins() {
        let mut registry = EntityRegistry::new();

        let first = registry.ensure(EntityLabel::Feature, "Login Feature").unwrap();
        let second = registry.ensure(EntityLabel::Feature, "LOGIN feature").unwrap();

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&first).unwrap().name, "Login Feature");
    }

    #[test]
    fn test_same_name_different_labels() {
        let mut registry = EntityRegistry::new();
        registry.ensure(EntityLabel::Feature, "Platform Team").unwrap();
        registry.ensure(EntityLabel::Team, "Platform Team").unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("feature:platform_team"));
        assert!(registry.contains("team:platform_team"));
    }

    #[test]
    fn test_ensure_skips_empty_span() {
        let mut registry = EntityRegistry::new();
        assert!(registry.ensure(EntityLabel::Feature, " ... ").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insert_rejects_malformed_record() {
        let mut registry = EntityRegistry::new();
        let mut entity = Entity::new(EntityLabel::Requirement, "Security Requirements").unwrap();
        entity.id = String::new();

        assert!(registry.insert(entity).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_role_holder() {
        let mut registry = EntityRegistry::new();
        let sarah = Entity::new(EntityLabel::Stakeholder, "Sarah Kim")
            .unwrap()
            .with_property("role", "Blockchain Lead");
        registry.insert(sarah).unwrap();

        assert_eq!(
            registry.role_holder("Blockchain Lead").map(|e| e.id.as_str()),
            Some("stakeholder:sarah_kim")
        );
        assert!(registry.role_holder("Product Manager").is_none());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut registry = EntityRegistry::new();
        registry.ensure(EntityLabel::Team, "Platform Team");
        registry.ensure(EntityLabel::Feature, "Login Feature");
        registry.ensure(EntityLabel::TestCase, "tc 7");

        let ids: Vec<&str> = registry.entities().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["team:platform_team", "feature:login_feature", "testcase:tc-7"]
        );
    }
}
