//! Quality Metrics module
//!
//! Compares an extracted [`GraphPayload`] with a hand-labelled gold payload
//! and reports precision, recall and F1 for entities and relationships.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use reqgraph_core::{GraphPayload, RelationType};

// ============================================================================
// Metrics
// ============================================================================

/// Match counts for one kind of extracted item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetrics {
    /// Predicted items also in the gold set
    pub true_positives: usize,
    /// Predicted items missing from the gold set
    pub false_positives: usize,
    /// Gold items never predicted
    pub false_negatives: usize,
    /// Total items in gold standard
    pub gold_total: usize,
    /// Total items predicted
    pub predicted_total: usize,
}

impl ExtractionMetrics {
    /// Calculate precision (TP / (TP + FP))
    pub fn precision(&self) -> f32 {
        if self.true_positives + self.false_positives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_positives) as f32
        }
    }

    /// Calculate recall (TP / (TP + FN))
    pub fn recall(&self) -> f32 {
        if self.true_positives + self.false_negatives == 0 {
            0.0
        } else {
            self.true_positives as f32 / (self.true_positives + self.false_negatives) as f32
        }
    }

    /// Calculate F1 score (2 * P * R / (P + R))
    pub fn f1_score(&self) -> f32 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    fn from_sets<T: Eq + std::hash::Hash>(predicted: &HashSet<T>, gold: &HashSet<T>) -> Self {
        let true_positives = predicted.intersection(gold).count();
        Self {
            true_positives,
            false_positives: predicted.len() - true_positives,
            false_negatives: gold.len() - true_positives,
            gold_total: gold.len(),
            predicted_total: predicted.len(),
        }
    }

    fn accumulate(&mut self, other: &Self) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.gold_total += other.gold_total;
        self.predicted_total += other.predicted_total;
    }
}

/// Entity and relationship metrics for one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetrics {
    pub entities: ExtractionMetrics,
    pub relationships: ExtractionMetrics,
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluator for extraction quality
pub struct Evaluator {
    /// Compare ids without their label prefix
    ignore_labels: bool,
}

impl Evaluator {
    /// Create an evaluator that matches full ids
    pub fn new() -> Self {
        Self {
            ignore_labels: false,
        }
    }

    /// Match `feature:login_feature` and `team:login_feature` as the same node
    pub fn with_ignore_labels(mut self, ignore_labels: bool) -> Self {
        self.ignore_labels = ignore_labels;
        self
    }

    fn key<'a>(&self, id: &'a str) -> &'a str {
        if self.ignore_labels {
            id.split_once(':').map_or(id, |(_, name)| name)
        } else {
            id
        }
    }

    /// Evaluate entities by id
    pub fn evaluate_entities(
        &self,
        predicted: &GraphPayload,
        gold: &GraphPayload,
    ) -> ExtractionMetrics {
        let keys = |payload: &GraphPayload| -> HashSet<String> {
            payload
                .entities
                .iter()
                .map(|e| self.key(&e.id).to_string())
                .collect()
        };
        ExtractionMetrics::from_sets(&keys(predicted), &keys(gold))
    }

    /// Evaluate relationships by (source, type, target)
    pub fn evaluate_relationships(
        &self,
        predicted: &GraphPayload,
        gold: &GraphPayload,
    ) -> ExtractionMetrics {
        let keys = |payload: &GraphPayload| -> HashSet<(String, RelationType, String)> {
            payload
                .relationships
                .iter()
                .map(|r| {
                    (
                        self.key(&r.source).to_string(),
                        r.relation,
                        self.key(&r.target).to_string(),
                    )
                })
                .collect()
        };
        ExtractionMetrics::from_sets(&keys(predicted), &keys(gold))
    }

    /// Evaluate one document
    pub fn evaluate(&self, predicted: &GraphPayload, gold: &GraphPayload) -> DocumentMetrics {
        DocumentMetrics {
            entities: self.evaluate_entities(predicted, gold),
            relationships: self.evaluate_relationships(predicted, gold),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Aggregate Metrics
// ============================================================================

/// Aggregate metrics for a batch of evaluations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub entity_metrics: ExtractionMetrics,
    pub relation_metrics: ExtractionMetrics,
    pub num_documents: usize,
}

impl AggregateMetrics {
    /// Add one document's metrics
    pub fn add(&mut self, document: &DocumentMetrics) {
        self.entity_metrics.accumulate(&document.entities);
        self.relation_metrics.accumulate(&document.relationships);
        self.num_documents += 1;
    }

    /// Print a summary report
    pub fn report(&self) -> String {
        format!(
            "=== Extraction Quality Report ===\n\n\
             Documents evaluated: {}\n\n\
             Entity Extraction:\n\
             \x20 Precision: {:.1}%\n\
             \x20 Recall:    {:.1}%\n\
             \x20 F1 Score:  {:.1}%\n\
             \x20 Gold: {} | Predicted: {} | TP: {} | FP: {} | FN: {}\n\n\
             Relationship Extraction:\n\
             \x20 Precision: {:.1}%\n\
             \x20 Recall:    {:.1}%\n\
             \x20 F1 Score:  {:.1}%\n\
             \x20 Gold: {} | Predicted: {} | TP: {} | FP: {} | FN: {}\n",
            self.num_documents,
            self.entity_metrics.precision() * 100.0,
            self.entity_metrics.recall() * 100.0,
            self.entity_metrics.f1_score() * 100.0,
            self.entity_metrics.gold_total,
            self.entity_metrics.predicted_total,
            self.entity_metrics.true_positives,
            self.entity_metrics.false_positives,
            self.entity_metrics.false_negatives,
            self.relation_metrics.precision() * 100.0,
            self.relation_metrics.recall() * 100.0,
            self.relation_metrics.f1_score() * 100.0,
            self.relation_metrics.gold_total,
            self.relation_metrics.predicted_total,
            self.relation_metrics.true_positives,
            self.relation_metrics.false_positives,
            self.relation_metrics.false_negatives,
        )
    }

    /// Check entity and relationship precision against minimum targets
    pub fn meets_targets(&self, entity_precision: f32, relation_precision: f32) -> (bool, bool) {
        (
            self.entity_metrics.precision() >= entity_precision,
            self.relation_metrics.precision() >= relation_precision,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reqgraph_core::{Entity, EntityLabel, Relationship};

    fn payload(entities: &[(EntityLabel, &str)], rels: &[(&str, RelationType, &str)]) -> GraphPayload {
        GraphPayload {
            entities: entities
                .iter()
                .map(|(label, name)| Entity::new(*label, *name).unwrap())
                .collect(),
            relationships: rels
                .iter()
                .map(|(s, t, d)| Relationship::new(*s, *t, *d))
                .collect(),
        }
    }

    #[test]
    fn test_metrics_precision_recall_f1() {
        let metrics = ExtractionMetrics {
            true_positives: 80,
            false_positives: 20,
            false_negatives: 20,
            gold_total: 100,
            predicted_total: 100,
        };

        // P = 0.8, R = 0.8, F1 = 0.8
        assert!((metrics.precision() - 0.8).abs() < 0.001);
        assert!((metrics.recall() - 0.8).abs() < 0.001);
        assert!((metrics.f1_score() - 0.8).abs() < 0.001);
        assert_eq!(ExtractionMetrics::default().f1_score(), 0.0);
    }

    #[test]
    fn test_evaluate_partial() {
        let predicted = payload(
            &[
                (EntityLabel::Feature, "Login Feature"),
                (EntityLabel::Feature, "Wrong Module"),
            ],
            &[("feature:login_feature", RelationType::OwnedBy, "team:platform_team")],
        );
        let gold = payload(
            &[
                (EntityLabel::Feature, "Login Feature"),
                (EntityLabel::Team, "Platform Team"),
            ],
            &[("feature:login_feature", RelationType::OwnedBy, "team:platform_team")],
        );

        let metrics = Evaluator::new().evaluate(&predicted, &gold);

        assert_eq!(metrics.entities.true_positives, 1);
        assert_eq!(metrics.entities.false_positives, 1);
        assert_eq!(metrics.entities.false_negatives, 1);
        assert!((metrics.relationships.precision() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_ignore_labels() {
        let predicted = payload(&[(EntityLabel::Feature, "Platform Team")], &[]);
        let gold = payload(&[(EntityLabel::Team, "Platform Team")], &[]);

        let strict = Evaluator::new().evaluate_entities(&predicted, &gold);
        assert_eq!(strict.true_positives, 0);

        let relaxed = Evaluator::new()
            .with_ignore_labels(true)
            .evaluate_entities(&predicted, &gold);
        assert_eq!(relaxed.true_positives, 1);
    }

    #[test]
    fn test_aggregate_report() {
        let mut aggregate = AggregateMetrics::default();
        let doc = DocumentMetrics {
            entities: ExtractionMetrics {
                true_positives: 9,
                false_positives: 1,
                false_negatives: 0,
                gold_total: 9,
                predicted_total: 10,
            },
            relationships: ExtractionMetrics {
                true_positives: 3,
                false_positives: 2,
                false_negatives: 1,
                gold_total: 4,
                predicted_total: 5,
            },
        };
        aggregate.add(&doc);
        aggregate.add(&doc);

        assert_eq!(aggregate.num_documents, 2);
        assert_eq!(aggregate.entity_metrics.true_positives, 18);

        let report = aggregate.report();
        assert!(report.contains("Documents evaluated: 2"));
        assert!(report.contains("Relationship Extraction:"));

        assert_eq!(aggregate.meets_targets(0.85, 0.60), (true, true));
        assert_eq!(aggregate.meets_targets(0.95, 0.70), (false, false));
    }
}
