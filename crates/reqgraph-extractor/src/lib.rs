//! reqgraph Extractor - Requirements graph extraction pipeline
//!
//! Implements rule-based Named Entity Recognition (NER) and
//! Relation Extraction (RE) over free-form requirements discussions.
//!
//! Flow: preprocess (restore punctuation, segment) → entities over the
//! whole text → relationships per sentence → dedupe → [`GraphPayload`].

use once_cell::sync::Lazy;

use reqgraph_core::{EntityLabel, Relationship, Result};

pub mod dedup;
pub mod metrics;
pub mod ner;
pub mod normalize;
pub mod pipeline;
pub mod preprocess;
pub mod punctuation;
pub mod registry;
pub mod relation;

pub use dedup::dedupe;
pub use metrics::{AggregateMetrics, DocumentMetrics, Evaluator, ExtractionMetrics};
pub use ner::RuleBasedNer;
pub use normalize::{normalize_name, to_id};
pub use pipeline::{run_ner_to_neo4j, ExtractionPipeline};
pub use preprocess::{restore_and_segment, split_sentences, Preprocessor};
pub use punctuation::{CommandRestorer, RestorerError};
pub use registry::EntityRegistry;
pub use relation::{RelationRule, RuleBasedRe};

/// Trait for entity extractors
pub trait EntityExtractor: Send + Sync {
    /// Add every entity found in `text` to `registry`
    fn extract_into(&self, text: &str, registry: &mut EntityRegistry) -> Result<()>;

    /// Extract into a fresh registry
    fn extract(&self, text: &str) -> Result<EntityRegistry> {
        let mut registry = EntityRegistry::new();
        self.extract_into(text, &mut registry)?;
        Ok(registry)
    }

    /// First raw span of class `label` in `fragment`, if any
    fn find_first(&self, label: EntityLabel, fragment: &str) -> Option<String>;
}

/// Trait for relation extractors
pub trait RelationExtractor: Send + Sync {
    /// Extract candidate relationships sentence by sentence. Entities matched
    /// inside relation clauses are added to `registry`.
    fn extract(
        &self,
        sentences: &[String],
        registry: &mut EntityRegistry,
    ) -> Result<Vec<Relationship>>;
}

static DEFAULT_NER: Lazy<RuleBasedNer> = Lazy::new(RuleBasedNer::new);

static DEFAULT_RE: Lazy<RuleBasedRe> = Lazy::new(RuleBasedRe::new);

/// Run the default entity pass over `text`
pub fn extract_entities(text: &str) -> Result<EntityRegistry> {
    DEFAULT_NER.extract(text)
}

/// Run the default relation pass over `sentences`, extending `registry`
pub fn extract_relationships(
    sentences: &[String],
    registry: &mut EntityRegistry,
) -> Result<Vec<Relationship>> {
    DEFAULT_RE.extract(sentences, registry)
}
