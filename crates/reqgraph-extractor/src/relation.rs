//! Relation Extraction (RE) module
//!
//! Sentence-scoped, trigger-anchored extraction. For each rule whose
//! trigger occurs in a sentence, the sentence is split at the first
//! trigger; each side is split into a coordination list ("A, B and C")
//! and every left item is related to every right item.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::ner::RuleBasedNer;
use crate::normalize::{normalize_name, strip_punct_edges, to_id};
use crate::{EntityExtractor, EntityRegistry, RelationExtractor};
use reqgraph_core::{
    EntityLabel, ExtractionConfig, ExtractionProfile, RelationType, Relationship, Result,
};

static LIST_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|\band\b)\s*").expect("list separator pattern"));

// ============================================================================
// Rules
// ============================================================================

/// One trigger-anchored relation rule
#[derive(Debug, Clone)]
pub struct RelationRule {
    /// Relation type emitted
    pub relation: RelationType,
    /// Trigger phrases, in match priority order
    pub triggers: Vec<String>,
    /// Compiled trigger alternation
    pub trigger: Regex,
    /// Labels tried on the left side; the first one with any match wins
    pub left: Vec<EntityLabel>,
    /// Label picked on the right side
    pub right: EntityLabel,
}

impl RelationRule {
    /// Build a rule; phrases match case-insensitively on word boundaries
    /// with any whitespace between their words.
    pub fn new(
        triggers: &[&str],
        left: &[EntityLabel],
        relation: RelationType,
        right: EntityLabel,
    ) -> Option<Self> {
        let alternation = triggers
            .iter()
            .map(|phrase| {
                phrase
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+")
            })
            .collect::<Vec<_>>()
            .join("|");
        let trigger = Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok()?;

        Some(Self {
            relation,
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            trigger,
            left: left.to_vec(),
            right,
        })
    }

    /// Split `sentence` around the first trigger occurrence, with edge
    /// punctuation stripped from both sides
    pub fn split<'a>(&self, sentence: &'a str) -> Option<(&'a str, &'a str)> {
        let m = self.trigger.find(sentence)?;
        Some((
            strip_punct_edges(&sentence[..m.start()]),
            strip_punct_edges(&sentence[m.end()..]),
        ))
    }
}

/// Split a clause side into coordination items on `,` and `and`
pub fn split_list(fragment: &str) -> Vec<&str> {
    LIST_SEPARATOR
        .split(fragment)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

// ============================================================================
// Rule-based RE
// ============================================================================

/// Rule-based relation extractor
pub struct RuleBasedRe {
    rules: Vec<RelationRule>,
    /// Class matcher used on clause items
    ner: Arc<dyn EntityExtractor>,
}

impl RuleBasedRe {
    /// Create a rule-based RE with the basic rule table
    pub fn new() -> Self {
        Self::with_profile(ExtractionProfile::Basic)
    }

    /// Create a rule-based RE for the given catalogue
    pub fn with_profile(profile: ExtractionProfile) -> Self {
        Self::build(profile, Arc::new(RuleBasedNer::with_profile(profile)))
    }

    /// Create from extraction settings
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::build(config.profile, Arc::new(RuleBasedNer::from_config(config)))
    }

    /// Use a different class matcher for clause items
    pub fn with_entity_extractor(mut self, ner: Arc<dyn EntityExtractor>) -> Self {
        self.ner = ner;
        self
    }

    fn build(profile: ExtractionProfile, ner: Arc<dyn EntityExtractor>) -> Self {
        let mut re = Self {
            rules: Vec::new(),
            ner,
        };
        re.init_rules(profile == ExtractionProfile::Extended);
        re
    }

    /// The rule table, in evaluation order
    pub fn rules(&self) -> &[RelationRule] {
        &self.rules
    }

    fn init_rules(&mut self, extended: bool) {
        use EntityLabel::*;

        let designs: &[EntityLabel] = if extended {
            &[Feature, Design]
        } else {
            &[Feature]
        };
        let owners: &[EntityLabel] = if extended {
            &[Team, Stakeholder, Feature]
        } else {
            &[Team, Feature]
        };

        self.add_rule(
            &["depends on", "requires", "relies on"],
            &[Feature],
            RelationType::DependsOn,
            Feature,
        );
        self.add_rule(
            &["is owned by", "owned by"],
            &[Feature],
            RelationType::OwnedBy,
            Team,
        );
        self.add_rule(
            &["is supported by", "supported by"],
            &[Feature],
            RelationType::SupportedBy,
            Team,
        );
        self.add_rule(
            &["must satisfy", "satisfies"],
            designs,
            RelationType::Satisfies,
            Requirement,
        );
        self.add_rule(
            &["apply to", "applies to", "apply", "applies"],
            &[Constraint],
            RelationType::AppliesTo,
            Feature,
        );
        self.add_rule(
            &["validate", "validates", "verify", "verifies"],
            &[TestCase],
            RelationType::Validates,
            Feature,
        );
        self.add_rule(&["implements"], designs, RelationType::Implements, Feature);
        self.add_rule(&["refines"], &[Feature], RelationType::Refines, Requirement);
        self.add_rule(
            &["is derived from", "derived from"],
            &[Feature],
            RelationType::DerivedFrom,
            Feature,
        );
        self.add_rule(
            &["is responsible for", "responsible for"],
            owners,
            RelationType::ResponsibleFor,
            Requirement,
        );
    }

    /// Add a relation rule
    fn add_rule(
        &mut self,
        triggers: &[&str],
        left: &[EntityLabel],
        relation: RelationType,
        right: EntityLabel,
    ) {
        if let Some(rule) = RelationRule::new(triggers, left, relation, right) {
            self.rules.push(rule);
        }
    }

    /// Resolve one coordination item to an entity id, registering it if new
    fn resolve(
        &self,
        label: EntityLabel,
        item: &str,
        registry: &mut EntityRegistry,
    ) -> Option<String> {
        if let Some(raw) = self.ner.find_first(label, item) {
            if label == EntityLabel::Stakeholder {
                // "the Blockchain Lead" refers back to the person holding that role
                if let Some(holder) = registry.role_holder(&normalize_name(label, &raw)) {
                    return Some(holder.id.clone());
                }
            }
            return registry.ensure(label, &raw);
        }

        // People are named without a class suffix; accept them only if already known
        if label == EntityLabel::Stakeholder {
            let id = to_id(label, &normalize_name(label, item));
            if registry.contains(&id) {
                return Some(id);
            }
        }
        None
    }

    /// Pick one entity per coordination item of `fragment`
    fn pick(&self, label: EntityLabel, fragment: &str, registry: &mut EntityRegistry) -> Vec<String> {
        split_list(fragment)
            .into_iter()
            .filter_map(|item| self.resolve(label, item, registry))
            .collect()
    }

    /// Try each label in order; the first that yields any entity wins
    fn pick_chain(
        &self,
        labels: &[EntityLabel],
        fragment: &str,
        registry: &mut EntityRegistry,
    ) -> Vec<String> {
        for &label in labels {
            let ids = self.pick(label, fragment, registry);
            if !ids.is_empty() {
                return ids;
            }
        }
        Vec::new()
    }

    /// Candidate relationships for one sentence
    fn extract_sentence(&self, sentence: &str, registry: &mut EntityRegistry) -> Vec<Relationship> {
        let mut relationships = Vec::new();

        for rule in &self.rules {
            let Some((left, right)) = rule.split(sentence) else {
                continue;
            };

            let sources = self.pick_chain(&rule.left, left, registry);
            let targets = self.pick(rule.right, right, registry);

            for source in &sources {
                for target in &targets {
                    relationships.push(Relationship::new(source.clone(), rule.relation, target.clone()));
                }
            }
        }

        relationships
    }
}

impl Default for RuleBasedRe {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationExtractor for RuleBasedRe {
    fn extract(
        &self,
        sentences: &[String],
        registry: &mut EntityRegistry,
    ) -> Result<Vec<Relationship>> {
        let mut relationships = Vec::new();
        for sentence in sentences {
            relationships.extend(self.extract_sentence(sentence, registry));
        }

        debug!(
            sentences = sentences.len(),
            candidates = relationships.len(),
            "Relation pass complete"
        );
        Ok(relationships)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(re: &RuleBasedRe, text: &str) -> (Vec<Relationship>, EntityRegistry) {
        let mut registry = EntityRegistry::new();
        let rels = re
            .extract(&[text.to_string()], &mut registry)
            .unwrap();
        (rels, registry)
    }

    fn triples(rels: &[Relationship]) -> Vec<(String, &'static str, String)> {
        rels.iter()
            .map(|r| (r.source.clone(), r.relation.as_str(), r.target.clone()))
            .collect()
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("Login Feature, Payment Module and Export Module"),
            vec!["Login Feature", "Payment Module", "Export Module"]
        );
        assert_eq!(split_list(" , and "), Vec::<&str>::new());
        // "and" inside a word is not a separator
        assert_eq!(split_list("Brand Module"), vec!["Brand Module"]);
    }

    #[test]
    fn test_trigger_splits_at_first_occurrence() {
        let re = RuleBasedRe::new();
        let rule = &re.rules()[0];
        assert_eq!(
            rule.split("The Login Feature depends on Auth Module, which depends on Crypto Module."),
            Some(("The Login Feature", "Auth Module, which depends on Crypto Module"))
        );
        assert_eq!(rule.split("Nothing here."), None);
    }

    #[test]
    fn test_trigger_tolerates_extra_whitespace() {
        let re = RuleBasedRe::new();
        let (rels, _) = run(&re, "Login Feature DEPENDS   ON Authentication Module");
        assert_eq!(
            triples(&rels),
            vec![(
                "feature:login_feature".to_string(),
                "DEPENDS_ON",
                "feature:authentication_module".to_string()
            )]
        );
    }

    #[test]
    fn test_owned_by_team() {
        let re = RuleBasedRe::new();
        let (rels, registry) = run(&re, "The Export Module is owned by the Platform Team.");

        assert_eq!(
            triples(&rels),
            vec![(
                "feature:export_module".to_string(),
                "OWNED_BY",
                "team:platform_team".to_string()
            )]
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_apply_prefers_longest_phrase() {
        let re = RuleBasedRe::new();
        let (rels, _) = run(&re, "API Constraints apply to the Login Feature and Export Module.");

        assert_eq!(
            triples(&rels),
            vec![
                (
                    "constraint:api_constraints".to_string(),
                    "APPLIES_TO",
                    "feature:login_feature".to_string()
                ),
                (
                    "constraint:api_constraints".to_string(),
                    "APPLIES_TO",
                    "feature:export_module".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_validates_testcase() {
        let re = RuleBasedRe::new();
        let (rels, _) = run(&re, "tc 101 verifies the Login Feature.");
        assert_eq!(
            triples(&rels),
            vec![(
                "testcase:tc-101".to_string(),
                "VALIDATES",
                "feature:login_feature".to_string()
            )]
        );
    }

    #[test]
    fn test_responsible_for_falls_back_to_features() {
        let re = RuleBasedRe::new();

        let (rels, _) = run(&re, "The Security Team is responsible for Audit Requirements.");
        assert_eq!(rels[0].source, "team:security_team");

        let (rels, _) = run(&re, "The Login Feature is responsible for Session Requirements.");
        assert_eq!(rels[0].source, "feature:login_feature");
        assert_eq!(rels[0].target, "requirement:session_requirements");
    }

    #[test]
    fn test_empty_side_is_skipped() {
        let re = RuleBasedRe::new();
        let (rels, registry) = run(&re, "It depends on the Payment Module.");
        assert!(rels.is_empty());
        // Clause entities are still registered
        assert!(registry.contains("feature:payment_module"));

        let (rels, _) = run(&re, "The Login Feature depends on nothing.");
        assert!(rels.is_empty());
    }

    #[test]
    fn test_extended_design_satisfies() {
        let re = RuleBasedRe::with_profile(ExtractionProfile::Extended);
        let (rels, _) = run(
            &re,
            "The Distributed Ledger Architecture Design must satisfy Security Requirements.",
        );
        assert_eq!(
            triples(&rels),
            vec![(
                "design:distributed_ledger_architecture_design".to_string(),
                "SATISFIES",
                "requirement:security_requirements".to_string()
            )]
        );

        let basic = RuleBasedRe::new();
        let (rels, _) = run(
            &basic,
            "The Distributed Ledger Architecture Design must satisfy Security Requirements.",
        );
        assert!(rels.is_empty());
    }

    #[test]
    fn test_extended_stakeholder_role_refers_to_person() {
        let re = RuleBasedRe::with_profile(ExtractionProfile::Extended);
        let ner = RuleBasedNer::with_profile(ExtractionProfile::Extended);

        let mut registry = ner
            .extract("Sarah Kim, the Blockchain Lead, joined.")
            .unwrap();
        let rels = re
            .extract(
                &["The Blockchain Lead is responsible for Ledger Requirements.".to_string()],
                &mut registry,
            )
            .unwrap();

        assert_eq!(
            triples(&rels),
            vec![(
                "stakeholder:sarah_kim".to_string(),
                "RESPONSIBLE_FOR",
                "requirement:ledger_requirements".to_string()
            )]
        );
        assert!(!registry.contains("stakeholder:blockchain_lead"));
    }

    #[test]
    fn test_rule_table() {
        let basic = RuleBasedRe::new();
        assert_eq!(basic.rules().len(), 10);
        assert_eq!(
            basic.rules().last().unwrap().left,
            vec![EntityLabel::Team, EntityLabel::Feature]
        );

        let extended = RuleBasedRe::with_profile(ExtractionProfile::Extended);
        assert_eq!(
            extended.rules().last().unwrap().left,
            vec![EntityLabel::Team, EntityLabel::Stakeholder, EntityLabel::Feature]
        );
    }
}
