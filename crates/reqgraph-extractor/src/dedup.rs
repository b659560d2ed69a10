//! Relationship deduplication

use std::collections::HashSet;

use reqgraph_core::{RelationType, Relationship};

/// Drop repeated (source, type, target) triples, keeping the first
/// occurrence and the original order.
pub fn dedupe(relationships: Vec<Relationship>) -> Vec<Relationship> {
    let mut seen: HashSet<(String, RelationType, String)> = HashSet::new();

    relationships
        .into_iter()
        .filter(|r| seen.insert((r.source.clone(), r.relation, r.target.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_in_order() {
        let rels = vec![
            Relationship::new("feature:a", RelationType::DependsOn, "feature:b"),
            Relationship::new("feature:a", RelationType::Implements, "feature:b"),
            Relationship::new("feature:a", RelationType::DependsOn, "feature:b").with_confidence(0.5),
            Relationship::new("feature:b", RelationType::DependsOn, "feature:a"),
        ];

        let out = dedupe(rels);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].relation, RelationType::DependsOn);
        assert!(out[0].confidence.is_none());
        assert_eq!(out[1].relation, RelationType::Implements);
        assert_eq!(out[2].source, "feature:b");
    }

    #[test]
    fn test_dedupe_empty() {
        assert!(dedupe(Vec::new()).is_empty());
    }
}
