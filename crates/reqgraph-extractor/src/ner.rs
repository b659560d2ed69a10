//! Named Entity Recognition (NER) module
//!
//! Rule-based recognition of requirements entities:
//! - Word runs: a short run of name words directly followed by a class
//!   suffix word ("Login Feature", "Platform Team", "Security Requirements")
//! - Codes: short code-style ids ("TC-101", "T-2003", and in the extended
//!   profile "F-101", "C-7", "D-12")
//! - Apposition (extended profile): "Sarah Kim, the Blockchain Lead,"

use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::normalize::normalize_name;
use crate::{EntityExtractor, EntityRegistry};
use reqgraph_core::{Entity, EntityLabel, ExtractionConfig, ExtractionProfile, Result};

// ============================================================================
// Tokens and Stopwords
// ============================================================================

static WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:[-'][\p{L}\p{N}]+)*").expect("word pattern")
});

/// Words that never belong to an entity name. A run of name words stops
/// at the first one of these.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Articles, determiners
        "a", "an", "the", "this", "that", "these", "those", "all", "each", "every", "both",
        "any", "some", "no",
        // Conjunctions
        "and", "or", "but", "nor", "so", "then", "than", "while", "because", "if",
        // Prepositions
        "of", "on", "in", "at", "to", "for", "from", "by", "with", "into", "onto", "over",
        "under", "about", "as", "via", "per", "after", "before", "between", "within",
        // Pronouns
        "i", "you", "your", "we", "our", "us", "they", "their", "them", "he", "she", "his",
        "her", "it", "its", "which", "who", "whom", "whose", "what", "when", "where",
        // Auxiliaries
        "is", "are", "was", "were", "be", "been", "being", "has", "have", "had", "do", "does",
        "did", "must", "should", "will", "would", "shall", "can", "could", "may", "might",
        "also", "not",
        // Reporting verbs
        "presented", "mentioned", "explained", "said", "stated", "discussed", "noted",
        "confirmed", "agreed",
        // Relation triggers
        "depends", "depend", "requires", "require", "relies", "rely", "owned", "supported",
        "satisfy", "satisfies", "apply", "applies", "validate", "validates", "verify",
        "verifies", "implement", "implements", "refine", "refines", "derived", "responsible",
    ]
    .into_iter()
    .collect()
});

/// Acronyms such as "IT" or "US" are names, not pronouns
fn is_acronym(word: &str) -> bool {
    word.chars().count() > 1
        && word.chars().any(char::is_uppercase)
        && !word.chars().any(char::is_lowercase)
}

fn is_stopword(word: &str) -> bool {
    !is_acronym(word) && STOPWORDS.contains(word.to_lowercase().as_str())
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_uppercase())
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    WORD.find_iter(text)
        .map(|m| Token {
            text: m.as_str(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Two tokens belong to one run only if nothing but whitespace separates them
fn adjacent(text: &str, left: &Token<'_>, right: &Token<'_>) -> bool {
    let gap = &text[left.end..right.start];
    !gap.is_empty() && gap.chars().all(char::is_whitespace)
}

// ============================================================================
// Patterns
// ============================================================================

/// A raw matched span
#[derive(Debug, Clone, PartialEq)]
struct Span {
    start: usize,
    end: usize,
    raw: String,
    role: Option<String>,
}

impl Span {
    fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Name words followed by one of a class's suffix words
#[derive(Debug, Clone)]
pub struct WordRunPattern {
    pub label: EntityLabel,
    pub suffixes: Vec<&'static str>,
    /// Suffix must match exactly and name words must be capitalized
    pub case_sensitive: bool,
}

impl WordRunPattern {
    fn new(label: EntityLabel, suffixes: &[&'static str], case_sensitive: bool) -> Self {
        Self {
            label,
            suffixes: suffixes.to_vec(),
            case_sensitive,
        }
    }

    fn is_suffix(&self, word: &str) -> bool {
        if self.case_sensitive {
            self.suffixes.iter().any(|s| *s == word)
        } else {
            self.suffixes.iter().any(|s| s.eq_ignore_ascii_case(word))
        }
    }

    fn accepts_name_word(&self, word: &str) -> bool {
        if is_stopword(word) {
            return false;
        }
        !self.case_sensitive
            || word
                .chars()
                .next()
                .is_some_and(|c| c.is_uppercase() || c.is_numeric())
    }

    fn find_spans(&self, text: &str, tokens: &[Token<'_>], max_words: usize) -> Vec<Span> {
        let mut spans = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            if !self.is_suffix(token.text) {
                continue;
            }
            // Yield to a longer span ending in the next suffix word
            if let Some(next) = tokens.get(i + 1) {
                if adjacent(text, token, next) && self.is_suffix(next.text) {
                    continue;
                }
            }

            let mut first = i;
            let mut count = 0;
            while first > 0 && count < max_words {
                let j = first - 1;
                let word = tokens[j].text;
                if !adjacent(text, &tokens[j], &tokens[first]) || !self.accepts_name_word(word) {
                    break;
                }
                // An earlier suffix word ends its own span unless it chains into this one
                if self.is_suffix(word) && !self.is_suffix(tokens[j + 1].text) {
                    break;
                }
                first = j;
                count += 1;
            }
            if count == 0 {
                continue;
            }

            // "discussed Login Feature" style runs: keep from the first capital
            if let Some(offset) = tokens[first..i]
                .iter()
                .position(|t| starts_uppercase(t.text))
            {
                first += offset;
            }

            let start = tokens[first].start;
            spans.push(Span {
                start,
                end: token.end,
                raw: text[start..token.end].to_string(),
                role: None,
            });
        }

        spans
    }
}

/// A regex over code-style ids
#[derive(Debug, Clone)]
pub struct CodePattern {
    pub label: EntityLabel,
    pub regex: Regex,
}

impl CodePattern {
    fn find_spans(&self, text: &str) -> Vec<Span> {
        self.regex
            .find_iter(text)
            .map(|m| Span {
                start: m.start(),
                end: m.end(),
                raw: m.as_str().to_string(),
                role: None,
            })
            .collect()
    }
}

const TEAM_SUFFIXES: &[&str] = &["Team"];
const FEATURE_SUFFIXES: &[&str] = &["feature", "module", "component"];
const REQUIREMENT_SUFFIXES: &[&str] = &["requirement", "requirements"];
const CONSTRAINT_SUFFIXES: &[&str] = &["constraint", "constraints"];
const STAKEHOLDER_SUFFIXES: &[&str] = &[
    "Manager", "Lead", "Owner", "Architect", "Engineer", "Analyst", "Director", "Sponsor",
    "Designer",
];
const DESIGN_SUFFIXES: &[&str] = &["Design", "Architecture"];

// ============================================================================
// Rule-based NER
// ============================================================================

/// Rule-based NER over requirements discussions
pub struct RuleBasedNer {
    profile: ExtractionProfile,
    /// Longest run of name words in front of a suffix
    max_name_words: usize,
    word_runs: Vec<WordRunPattern>,
    codes: Vec<CodePattern>,
    /// "First Last, the Role," (extended profile only)
    apposition: Option<Regex>,
}

impl RuleBasedNer {
    /// Create a NER with the basic pattern catalogue
    pub fn new() -> Self {
        Self::with_profile(ExtractionProfile::Basic)
    }

    /// Create a NER for the given catalogue
    pub fn with_profile(profile: ExtractionProfile) -> Self {
        let mut ner = Self {
            profile,
            max_name_words: ExtractionConfig::default().max_name_words,
            word_runs: Vec::new(),
            codes: Vec::new(),
            apposition: None,
        };

        ner.init_basic_patterns();
        if profile == ExtractionProfile::Extended {
            ner.init_extended_patterns();
        }
        ner
    }

    /// Create from extraction settings
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::with_profile(config.profile).with_max_name_words(config.max_name_words)
    }

    /// Set the name-word limit (at least one word)
    pub fn with_max_name_words(mut self, max_name_words: usize) -> Self {
        self.max_name_words = max_name_words.max(1);
        self
    }

    /// Active catalogue
    pub fn profile(&self) -> ExtractionProfile {
        self.profile
    }

    /// Labels this NER can produce, in emission order
    pub fn labels(&self) -> Vec<EntityLabel> {
        EntityLabel::ALL
            .into_iter()
            .filter(|label| self.supports(*label))
            .collect()
    }

    /// Check if a label is part of the active catalogue
    pub fn supports(&self, label: EntityLabel) -> bool {
        match label {
            EntityLabel::Stakeholder | EntityLabel::Design => {
                self.profile == ExtractionProfile::Extended
            }
            _ => true,
        }
    }

    fn init_basic_patterns(&mut self) {
        self.word_runs.extend([
            WordRunPattern::new(EntityLabel::Feature, FEATURE_SUFFIXES, false),
            WordRunPattern::new(EntityLabel::Team, TEAM_SUFFIXES, true),
            WordRunPattern::new(EntityLabel::Requirement, REQUIREMENT_SUFFIXES, false),
            WordRunPattern::new(EntityLabel::Constraint, CONSTRAINT_SUFFIXES, false),
        ]);

        // TC is case-insensitive, a bare T must be upper-case
        self.add_code(EntityLabel::TestCase, r"\b(?:(?i:tc)|T)[- ]?\d+\b");
    }

    fn init_extended_patterns(&mut self) {
        self.word_runs.extend([
            WordRunPattern::new(EntityLabel::Stakeholder, STAKEHOLDER_SUFFIXES, true),
            WordRunPattern::new(EntityLabel::Design, DESIGN_SUFFIXES, true),
        ]);

        self.add_code(EntityLabel::Feature, r"\bF-\d+\b");
        self.add_code(EntityLabel::Constraint, r"\bC-\d+\b");
        self.add_code(EntityLabel::Design, r"\bD-\d+\b");

        let role = format!(
            r"((?:\p{{Lu}}\p{{L}}*\s+)*(?:{}))",
            STAKEHOLDER_SUFFIXES.join("|")
        );
        let pattern = format!(
            r"\b(\p{{Lu}}\p{{Ll}}+(?:\s+\p{{Lu}}\p{{Ll}}+)+),\s+(?:the\s+|our\s+)?{role}\s*,"
        );
        self.apposition = Regex::new(&pattern).ok();
    }

    /// Add a code pattern
    fn add_code(&mut self, label: EntityLabel, pattern: &str) {
        if let Ok(regex) = Regex::new(pattern) {
            self.codes.push(CodePattern { label, regex });
        }
    }

    fn apposition_spans(&self, text: &str) -> Vec<Span> {
        let Some(regex) = &self.apposition else {
            return Vec::new();
        };

        regex
            .captures_iter(text)
            .filter_map(|caps| {
                let person = caps.get(1)?;
                let role = caps.get(2)?;
                Some(Span {
                    start: person.start(),
                    end: role.end(),
                    raw: person.as_str().to_string(),
                    role: Some(role.as_str().split_whitespace().collect::<Vec<_>>().join(" ")),
                })
            })
            .collect()
    }

    /// All spans of `label`, ordered by position
    fn spans(&self, label: EntityLabel, text: &str, tokens: &[Token<'_>]) -> Vec<Span> {
        if !self.supports(label) {
            return Vec::new();
        }

        let mut spans = if label == EntityLabel::Stakeholder {
            self.apposition_spans(text)
        } else {
            Vec::new()
        };
        let covered: Vec<Range<usize>> = spans.iter().map(Span::range).collect();

        for pattern in self.word_runs.iter().filter(|p| p.label == label) {
            spans.extend(
                pattern
                    .find_spans(text, tokens, self.max_name_words)
                    .into_iter()
                    .filter(|s| !covered.iter().any(|c| c.start < s.end && s.start < c.end)),
            );
        }
        for code in self.codes.iter().filter(|c| c.label == label) {
            spans.extend(code.find_spans(text));
        }

        spans.sort_by_key(|s| s.start);
        spans
    }
}

impl Default for RuleBasedNer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityExtractor for RuleBasedNer {
    fn extract_into(&self, text: &str, registry: &mut EntityRegistry) -> Result<()> {
        let tokens = tokenize(text);
        let before = registry.len();

        // Roles introduced by apposition anywhere in the text
        let introduced_roles: HashSet<String> = self
            .apposition_spans(text)
            .into_iter()
            .filter_map(|span| span.role)
            .collect();

        for label in self.labels() {
            for span in self.spans(label, text, &tokens) {
                match span.role {
                    Some(role) => {
                        let name = normalize_name(label, &span.raw);
                        if let Ok(entity) = Entity::new(label, name) {
                            registry.insert(entity.with_property("role", role))?;
                        }
                    }
                    None => {
                        // A bare role refers to the person introduced with it
                        if label == EntityLabel::Stakeholder {
                            let role = normalize_name(label, &span.raw);
                            if introduced_roles.contains(&role)
                                || registry.role_holder(&role).is_some()
                            {
                                continue;
                            }
                        }
                        registry.ensure(label, &span.raw);
                    }
                }
            }
        }

        debug!(
            tokens = tokens.len(),
            added = registry.len() - before,
            "Entity pass complete"
        );
        Ok(())
    }

    fn find_first(&self, label: EntityLabel, fragment: &str) -> Option<String> {
        let tokens = tokenize(fragment);
        self.spans(label, fragment, &tokens)
            .into_iter()
            .next()
            .map(|span| span.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(registry: &EntityRegistry) -> Vec<String> {
        registry.entities().iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_feature_run_stops_at_stopwords() {
        let ner = RuleBasedNer::new();
        let registry = ner
            .extract("Sarah presented the Login Feature to the group.")
            .unwrap();

        assert_eq!(ids(&registry), vec!["feature:login_feature"]);
        assert_eq!(registry.entities()[0].name, "Login Feature");
    }

    #[test]
    fn test_each_suffix_is_its_own_entity() {
        let ner = RuleBasedNer::new();
        let registry = ner
            .extract("The Login Feature depends on the Authentication Module and Payment Module.")
            .unwrap();

        assert_eq!(
            ids(&registry),
            vec![
                "feature:login_feature",
                "feature:authentication_module",
                "feature:payment_module"
            ]
        );
    }

    #[test]
    fn test_bare_suffix_is_not_an_entity() {
        let ner = RuleBasedNer::new();
        let registry = ner.extract("This feature needs work. The team agreed.").unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_team_requires_capitalization() {
        let ner = RuleBasedNer::new();
        assert_eq!(
            ner.find_first(EntityLabel::Team, "owned by the Platform Team"),
            Some("Platform Team".to_string())
        );
        assert_eq!(ner.find_first(EntityLabel::Team, "the platform team"), None);
    }

    #[test]
    fn test_lowercase_requirements_match() {
        let ner = RuleBasedNer::new();
        let registry = ner
            .extract("It must satisfy security requirements and API Constraints.")
            .unwrap();

        assert!(registry.contains("requirement:security_requirements"));
        assert!(registry.contains("constraint:api_constraints"));
    }

    #[test]
    fn test_acronyms_are_name_words() {
        let ner = RuleBasedNer::new();
        assert_eq!(
            ner.find_first(EntityLabel::Team, "The IT Team is responsible"),
            Some("IT Team".to_string())
        );
        assert_eq!(
            ner.find_first(EntityLabel::Team, "owned by US Team"),
            Some("US Team".to_string())
        );
        assert_eq!(
            ner.find_first(EntityLabel::Feature, "the IT Module"),
            Some("IT Module".to_string())
        );
        // Title-case pronouns still stop a run
        assert_eq!(ner.find_first(EntityLabel::Feature, "It Module"), None);
        assert!(is_stopword("It"));
        assert!(!is_stopword("IT"));
        assert!(is_stopword("I"));
    }

    #[test]
    fn test_non_ascii_names_stay_whole() {
        let ner = RuleBasedNer::new();
        let registry = ner
            .extract("The Zürich Module depends on the Señal Feature.")
            .unwrap();

        assert_eq!(
            ids(&registry),
            vec!["feature:zürich_module", "feature:señal_feature"]
        );
        assert_eq!(registry.entities()[0].name, "Zürich Module");
    }

    #[test]
    fn test_name_word_limit() {
        let ner = RuleBasedNer::new().with_max_name_words(2);
        assert_eq!(
            ner.find_first(EntityLabel::Feature, "Very Long Winded Export Module"),
            Some("Winded Export Module".to_string())
        );
    }

    #[test]
    fn test_leading_lowercase_trimmed() {
        let ner = RuleBasedNer::new();
        assert_eq!(
            ner.find_first(EntityLabel::Feature, "reviewed Login Feature"),
            Some("Login Feature".to_string())
        );
    }

    #[test]
    fn test_testcase_codes() {
        let ner = RuleBasedNer::new();
        let registry = ner
            .extract("TC-101 validates login. tc 101 was rerun, then T-2003 and TC7 passed.")
            .unwrap();

        assert_eq!(
            ids(&registry),
            vec!["testcase:tc-101", "testcase:t-2003", "testcase:tc-7"]
        );
    }

    #[test]
    fn test_lowercase_t_is_not_a_testcase() {
        let ner = RuleBasedNer::new();
        assert_eq!(ner.find_first(EntityLabel::TestCase, "t 5 minutes"), None);
    }

    #[test]
    fn test_basic_profile_has_no_stakeholders() {
        let ner = RuleBasedNer::new();
        let registry = ner.extract("The Product Manager owns the roadmap.").unwrap();
        assert!(registry.is_empty());
        assert_eq!(ner.labels().len(), 5);
    }

    #[test]
    fn test_extended_apposition_and_roles() {
        let ner = RuleBasedNer::with_profile(ExtractionProfile::Extended);
        let registry = ner
            .extract(
                "Sarah Kim, the Blockchain Lead, met the Product Manager about the \
                 Distributed Ledger Architecture Design.",
            )
            .unwrap();

        let sarah = registry.get("stakeholder:sarah_kim").unwrap();
        assert_eq!(sarah.properties["role"], "Blockchain Lead");
        assert!(registry.contains("stakeholder:product_manager"));
        assert!(!registry.contains("stakeholder:blockchain_lead"));
        assert!(registry.contains("design:distributed_ledger_architecture_design"));
        assert!(!registry.contains("design:distributed_ledger_architecture"));
    }

    #[test]
    fn test_role_before_apposition_refers_to_person() {
        let ner = RuleBasedNer::with_profile(ExtractionProfile::Extended);
        let registry = ner
            .extract(
                "The Blockchain Lead approved the plan. \
                 Sarah Kim, the Blockchain Lead, joined the call.",
            )
            .unwrap();

        assert_eq!(ids(&registry), vec!["stakeholder:sarah_kim"]);
    }

    #[test]
    fn test_extended_codes() {
        let ner = RuleBasedNer::with_profile(ExtractionProfile::Extended);
        let registry = ner.extract("F-101 is limited by C-7 and follows D-12.").unwrap();

        assert_eq!(
            ids(&registry),
            vec!["feature:f-101", "constraint:c-7", "design:d-12"]
        );
    }

    #[test]
    fn test_feature_list_is_not_apposition() {
        let ner = RuleBasedNer::with_profile(ExtractionProfile::Extended);
        let registry = ner
            .extract("Login Feature, Payment Module, and Export Module ship first.")
            .unwrap();

        assert!(registry
            .entities()
            .iter()
            .all(|e| e.label == EntityLabel::Feature));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_emission_follows_label_order() {
        let ner = RuleBasedNer::new();
        let registry = ner
            .extract("TC-1 checks the Platform Team and the Login Feature.")
            .unwrap();

        assert_eq!(
            ids(&registry),
            vec!["feature:login_feature", "team:platform_team", "testcase:tc-1"]
        );
    }
}
