//! Entity name normalization
//!
//! Turns raw matched spans into stable display names. Ids are built from
//! the normalized name with [`to_id`].

use once_cell::sync::Lazy;
use regex::Regex;

use reqgraph_core::EntityLabel;

pub use reqgraph_core::canonical_id as to_id;

/// Characters trimmed from both ends of a raw span
const EDGE_CHARS: &[char] = &[
    '.', ',', ';', ':', '!', '?', '"', '\'', '(', ')', '[', ']', '{', '}',
];

/// Words at which an over-long span is cut (inclusive)
pub const DOMAIN_SUFFIXES: &[&str] = &[
    "feature",
    "module",
    "component",
    "requirements",
    "requirement",
    "constraint",
    "constraints",
    "team",
];

static LEADING_DETERMINER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:the|a|an)\s+").expect("determiner pattern"));

static LEADING_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:presented|mentioned|explained|said|stated|is|are|was|were)\s+")
        .expect("reporting verb pattern")
});

static SUFFIX_TRUNCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^(.+?\b(?:{})\b)",
        DOMAIN_SUFFIXES.join("|")
    ))
    .expect("suffix truncation pattern")
});

static CODE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)[\s\-]*(\d+)$").expect("code shape pattern"));

/// Trim whitespace and surrounding punctuation, quotes and brackets
pub fn strip_punct_edges(s: &str) -> &str {
    s.trim().trim_matches(EDGE_CHARS).trim()
}

/// Drop one leading determiner, then one leading reporting/copular verb
pub fn strip_leading_articles_verbs(s: &str) -> String {
    let s = LEADING_DETERMINER.replace(s, "");
    let s = LEADING_VERB.replace(&s, "");
    s.trim().to_string()
}

/// Cut the string after the first domain-suffix word that is not its
/// first word. Strings without such a word are returned trimmed.
pub fn truncate_to_suffix(s: &str) -> String {
    match SUFFIX_TRUNCATION.captures(s) {
        Some(caps) => caps[1].trim().to_string(),
        None => s.trim().to_string(),
    }
}

/// Canonical form of a code-style id: `tc 101`, `TC101`, `tc-101` all
/// become `TC-101`. Input that is not letters-then-digits is upper-cased
/// with whitespace removed.
pub fn canonical_code(raw: &str) -> String {
    let raw = strip_punct_edges(raw);
    match CODE_SHAPE.captures(raw) {
        Some(caps) => format!("{}-{}", caps[1].to_uppercase(), &caps[2]),
        None => raw
            .split_whitespace()
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Normalize a raw span into the display name for `label`.
///
/// Steps run in a fixed order: edge punctuation, leading article or
/// reporting verb, suffix truncation, a second determiner pass for
/// Requirement/Constraint/Team, whitespace collapse. TestCase names are
/// reduced to their canonical code form.
pub fn normalize_name(label: EntityLabel, raw: &str) -> String {
    if label == EntityLabel::TestCase {
        return canonical_code(raw);
    }

    let name = strip_punct_edges(raw);
    let name = strip_leading_articles_verbs(name);
    let mut name = truncate_to_suffix(&name);

    if matches!(
        label,
        EntityLabel::Requirement | EntityLabel::Constraint | EntityLabel::Team
    ) {
        name = LEADING_DETERMINER.replace(&name, "").into_owned();
    }

    collapse_whitespace(&name)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
