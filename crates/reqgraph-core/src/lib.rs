//! reqgraph Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout reqgraph:
//! - Requirements graph models (entities, relationships, payload)
//! - Canonical id construction
//! - Common error types
//! - Capability traits for external collaborators
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, ExtractionConfig, ExtractionProfile, GraphConfig, LoggingConfig,
    PunctuationConfig,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for reqgraph operations
#[derive(Error, Debug)]
pub enum ReqGraphError {
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("Punctuation restoration error: {0}")]
    Punctuation(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ReqGraphError>;

// ============================================================================
// Entity Labels
// ============================================================================

/// Closed set of node labels produced by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityLabel {
    Feature,
    Team,
    Requirement,
    Constraint,
    TestCase,
    Stakeholder,
    Design,
}

impl EntityLabel {
    /// All labels, in catalogue order
    pub const ALL: [EntityLabel; 7] = [
        Self::Feature,
        Self::Team,
        Self::Requirement,
        Self::Constraint,
        Self::TestCase,
        Self::Stakeholder,
        Self::Design,
    ];

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "Feature",
            Self::Team => "Team",
            Self::Requirement => "Requirement",
            Self::Constraint => "Constraint",
            Self::TestCase => "TestCase",
            Self::Stakeholder => "Stakeholder",
            Self::Design => "Design",
        }
    }
}

impl std::fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityLabel {
    type Err = ReqGraphError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ReqGraphError::InvalidEntity(format!("unknown label: {s}")))
    }
}

// ============================================================================
// Relation Types
// ============================================================================

/// Closed set of relationship types
///
/// The last three variants are never produced by the extractor; they are the
/// counterparts a graph writer may materialize for the reverse direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    DependsOn,
    OwnedBy,
    SupportedBy,
    Satisfies,
    AppliesTo,
    Validates,
    Implements,
    Refines,
    DerivedFrom,
    ResponsibleFor,

    Owns,
    Supports,
    SatisfiedBy,
}

impl RelationType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DependsOn => "DEPENDS_ON",
            Self::OwnedBy => "OWNED_BY",
            Self::SupportedBy => "SUPPORTED_BY",
            Self::Satisfies => "SATISFIES",
            Self::AppliesTo => "APPLIES_TO",
            Self::Validates => "VALIDATES",
            Self::Implements => "IMPLEMENTS",
            Self::Refines => "REFINES",
            Self::DerivedFrom => "DERIVED_FROM",
            Self::ResponsibleFor => "RESPONSIBLE_FOR",
            Self::Owns => "OWNS",
            Self::Supports => "SUPPORTS",
            Self::SatisfiedBy => "SATISFIED_BY",
        }
    }

    /// Reverse-direction counterpart, for types that have one
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::OwnedBy => Some(Self::Owns),
            Self::Owns => Some(Self::OwnedBy),
            Self::SupportedBy => Some(Self::Supports),
            Self::Supports => Some(Self::SupportedBy),
            Self::Satisfies => Some(Self::SatisfiedBy),
            Self::SatisfiedBy => Some(Self::Satisfies),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = ReqGraphError;

    fn from_str(s: &str) -> Result<Self> {
        let all = [
            Self::DependsOn,
            Self::OwnedBy,
            Self::SupportedBy,
            Self::Satisfies,
            Self::AppliesTo,
            Self::Validates,
            Self::Implements,
            Self::Refines,
            Self::DerivedFrom,
            Self::ResponsibleFor,
            Self::Owns,
            Self::Supports,
            Self::SatisfiedBy,
        ];
        all.into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ReqGraphError::Extraction(format!("unknown relation type: {s}")))
    }
}

// ============================================================================
// Canonical Ids
// ============================================================================

/// Build the canonical id for a (label, normalized name) pair.
///
/// `feature:login_feature`, `testcase:tc-101`. The id is a pure function of
/// its inputs; whitespace runs become a single underscore.
pub fn canonical_id(label: EntityLabel, name: &str) -> String {
    let clean = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    format!("{}:{}", label.as_str().to_lowercase(), clean)
}

// ============================================================================
// Graph Models
// ============================================================================

/// A node in the requirements graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical id (`label:normalized_name`)
    pub id: String,

    /// Node label
    pub label: EntityLabel,

    /// Normalized display name
    pub name: String,

    /// Extra metadata (e.g. a stakeholder's role)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,

    /// Reserved for scoring backends; the rule engine leaves it unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Entity {
    /// Create a new entity from an already-normalized name
    pub fn new(label: EntityLabel, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let name = name.trim();
        if name.is_empty() {
            return Err(ReqGraphError::InvalidEntity(format!(
                "{label} entity with empty name"
            )));
        }

        Ok(Self {
            id: canonical_id(label, name),
            label,
            name: name.to_string(),
            properties: BTreeMap::new(),
            confidence: None,
        })
    }

    /// Add a property value
    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Set confidence score
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// Check that the record is well-formed: non-empty name and an id that
    /// matches its label and name.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ReqGraphError::InvalidEntity(format!(
                "entity {:?} has an empty name",
                self.id
            )));
        }
        let expected = canonical_id(self.label, &self.name);
        if self.id != expected {
            return Err(ReqGraphError::InvalidEntity(format!(
                "entity id {:?} does not match {expected:?}",
                self.id
            )));
        }
        Ok(())
    }
}

/// A typed edge between two entity ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source entity id
    pub source: String,

    /// Relationship type
    #[serde(rename = "type")]
    pub relation: RelationType,

    /// Target entity id
    pub target: String,

    /// Reserved for scoring backends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl Relationship {
    /// Create a new relationship
    pub fn new(
        source: impl Into<String>,
        relation: RelationType,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            relation,
            target: target.into(),
            confidence: None,
        }
    }

    /// Set confidence score
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    /// The (source, type, target) identity of this edge
    pub fn key(&self) -> (&str, RelationType, &str) {
        (&self.source, self.relation, &self.target)
    }
}

/// Output of one extraction call, ready for the graph writer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPayload {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl GraphPayload {
    /// Payload with no entities and no relationships
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check if nothing was extracted
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }

    /// Find an entity by id
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Entities carrying the given label
    pub fn entities_with_label(&self, label: EntityLabel) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.label == label)
    }

    /// Check for a specific edge
    pub fn has_relationship(&self, source: &str, relation: RelationType, target: &str) -> bool {
        self.relationships
            .iter()
            .any(|r| r.key() == (source, relation, target))
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Capability for restoring punctuation in unpunctuated transcripts
pub trait PunctuationRestorer: Send + Sync {
    /// Return the text with sentence punctuation restored
    fn restore(&self, text: &str) -> Result<String>;

    /// Check if the backend can currently be used
    fn is_available(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
