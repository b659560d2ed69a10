//! Extraction pipeline
//!
//! Preprocess → entities → relationships → dedupe → payload.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::dedup::dedupe;
use crate::ner::RuleBasedNer;
use crate::preprocess::{split_sentences, Preprocessor};
use crate::punctuation::CommandRestorer;
use crate::relation::RuleBasedRe;
use crate::{EntityExtractor, RelationExtractor};
use reqgraph_core::{AppConfig, GraphPayload, PunctuationRestorer};

/// Orchestrates one extraction call. Holds no per-call state, so a single
/// instance can serve many threads.
pub struct ExtractionPipeline {
    preprocessor: Preprocessor,
    entities: Arc<dyn EntityExtractor>,
    relations: Box<dyn RelationExtractor>,
}

impl ExtractionPipeline {
    /// Basic catalogue, no punctuation restorer
    pub fn new() -> Self {
        Self {
            preprocessor: Preprocessor::new(),
            entities: Arc::new(RuleBasedNer::new()),
            relations: Box::new(RuleBasedRe::new()),
        }
    }

    /// Build from application configuration, attaching the configured
    /// punctuation command if there is one
    pub fn from_config(config: &AppConfig) -> Self {
        let ner: Arc<dyn EntityExtractor> = Arc::new(RuleBasedNer::from_config(&config.extraction));
        let re = RuleBasedRe::from_config(&config.extraction).with_entity_extractor(ner.clone());

        let mut preprocessor = Preprocessor::from_config(&config.extraction);
        if let Some(restorer) = CommandRestorer::from_config(&config.punctuation) {
            preprocessor = preprocessor.with_restorer(Box::new(restorer));
        }

        Self {
            preprocessor,
            entities: ner,
            relations: Box::new(re),
        }
    }

    /// Attach a punctuation restorer
    pub fn with_restorer(mut self, restorer: Box<dyn PunctuationRestorer>) -> Self {
        self.preprocessor = self.preprocessor.with_restorer(restorer);
        self
    }

    /// Replace both extraction backends
    pub fn with_extractors(
        mut self,
        entities: Arc<dyn EntityExtractor>,
        relations: Box<dyn RelationExtractor>,
    ) -> Self {
        self.entities = entities;
        self.relations = relations;
        self
    }

    /// Run the full pipeline. Never fails: unusable input or a backend
    /// error produces an empty (or entity-only) payload.
    pub fn run(&self, text: &str, always_restore_punct: bool) -> GraphPayload {
        if text.trim().is_empty() {
            return GraphPayload::empty();
        }

        let prepared = self.preprocessor.prepare(text, always_restore_punct);
        let sentences = split_sentences(&prepared);

        let mut registry = match self.entities.extract(&prepared) {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %e, "Entity extraction failed");
                return GraphPayload::empty();
            }
        };
        let document_entities = registry.len();

        let candidates = match self.relations.extract(&sentences, &mut registry) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Relation extraction failed");
                Vec::new()
            }
        };
        let candidate_count = candidates.len();
        let relationships = dedupe(candidates);

        info!(
            sentences = sentences.len(),
            entities = registry.len(),
            clause_entities = registry.len() - document_entities,
            relationships = relationships.len(),
            duplicates = candidate_count - relationships.len(),
            "Extraction complete"
        );

        GraphPayload {
            entities: registry.into_entities(),
            relationships,
        }
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_PIPELINE: Lazy<ExtractionPipeline> = Lazy::new(ExtractionPipeline::new);

/// Extract a graph payload from `text` with the default pipeline
pub fn run_ner_to_neo4j(text: &str, always_restore_punct: bool) -> GraphPayload {
    DEFAULT_PIPELINE.run(text, always_restore_punct)
}
