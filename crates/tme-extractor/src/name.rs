//! Person name resolution
//!
//! Names come either from explicitly labeled first/last fields or from a
//! single free-form value in one of two shapes:
//! - `Last, First [Middle...]`
//! - `First [Middle...] Last`

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tme_core::text::title_case;
use tme_core::{best_candidate, EntityCategory, RawLine, ScoredCandidate, NA};

use crate::recognizer::spans_of;
use crate::EntityRecognizer;

/// First and last name, each either title-cased text or [`NA`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

impl PersonName {
    pub fn unresolved() -> Self {
        Self {
            first: NA.to_string(),
            last: NA.to_string(),
        }
    }

    /// Trim and title-case both parts; a blank part becomes [`NA`]
    pub fn from_parts(first: &str, last: &str) -> Self {
        Self {
            first: canonical_part(first),
            last: canonical_part(last),
        }
    }

    /// Parse a free-form name.
    ///
    /// With a comma, the text before it is the last name and the first
    /// token after it the first name (the whole remainder if it is a single
    /// token). Without one, the first and last tokens are used and middle
    /// names are dropped.
    pub fn parse(raw: &str) -> Self {
        if let Some((last, remainder)) = raw.split_once(',') {
            let tokens: Vec<&str> = remainder.split_whitespace().collect();
            let first = if tokens.len() > 1 { tokens[0] } else { remainder };
            return Self::from_parts(first, last);
        }

        let tokens: Vec<&str> = raw.split_whitespace().collect();
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => Self::from_parts(first, last),
            _ => Self::unresolved(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.first != NA && self.last != NA
    }
}

impl Default for PersonName {
    fn default() -> Self {
        Self::unresolved()
    }
}

fn canonical_part(part: &str) -> String {
    let part = part.trim();
    if part.is_empty() {
        NA.to_string()
    } else {
        title_case(part)
    }
}

/// Resolves person names from classified fields or raw text lines
#[derive(Clone)]
pub struct NameResolver {
    recognizer: Arc<dyn EntityRecognizer>,
}

impl NameResolver {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Resolve a name from candidates classified as `Name`.
    ///
    /// Labels mentioning "first" or "last" are preferred. If either part is
    /// not found that way, the highest-scoring candidate's value is parsed.
    pub fn resolve_name(&self, candidates: &[ScoredCandidate]) -> PersonName {
        let mut first: Option<&str> = None;
        let mut last: Option<&str> = None;

        for candidate in candidates {
            if candidate.value.trim().is_empty() {
                continue;
            }
            let label = candidate.label().to_lowercase();
            if label.contains("first") {
                first = Some(candidate.value.as_str());
            } else if label.contains("last") {
                last = Some(candidate.value.as_str());
            }
            if first.is_some() && last.is_some() {
                break;
            }
        }

        if let (Some(first), Some(last)) = (first, last) {
            debug!(first, last, "Resolved name from labeled fields");
            return PersonName::from_parts(first, last);
        }

        match best_candidate(candidates) {
            Some(best) => {
                let name = PersonName::parse(&best.value);
                debug!(value = %best.value, ?name, "Resolved name from best candidate");
                name
            }
            None => PersonName::unresolved(),
        }
    }

    /// Resolve a name from raw lines.
    ///
    /// Exactly one line may carry a PERSON span; its first such span is
    /// parsed. No such line, or several, leaves the name unresolved.
    pub fn resolve_name_from_lines(&self, lines: &[RawLine]) -> PersonName {
        let mut matches: Vec<String> = Vec::new();

        for line in lines {
            let titled = title_case(&line.text);
            let person = spans_of(self.recognizer.as_ref(), &titled)
                .into_iter()
                .find(|span| span.category == EntityCategory::Person);
            if let Some(span) = person {
                matches.push(span.text);
            }
        }

        match matches.as_slice() {
            [only] => {
                let name = PersonName::parse(only);
                debug!(text = %only, ?name, "Resolved name from raw line");
                name
            }
            _ => {
                debug!(lines = matches.len(), "No single PERSON line, name left unresolved");
                PersonName::unresolved()
            }
        }
    }
}

impl std::fmt::Debug for NameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameResolver")
            .field("recognizer", &self.recognizer.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RuleBasedRecognizer, ScriptedRecognizer};
    use tme_core::{Attribute, FieldCandidate};

    fn candidate(label: &str, value: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate::from_field(FieldCandidate::new(label, value, 0.1), Attribute::Name, score)
    }

    fn resolver() -> NameResolver {
        NameResolver::new(Arc::new(RuleBasedRecognizer::new()))
    }

    #[test]
    fn test_labeled_fields() {
        let candidates = vec![candidate("First", "Jane", 3.0), candidate("Last", "Doe", 3.0)];
        assert_eq!(
            resolver().resolve_name(&candidates),
            PersonName::from_parts("Jane", "Doe")
        );
    }

    #[test]
    fn test_labeled_fields_are_title_cased() {
        let candidates = vec![
            candidate("LAST NAME", "  o'brien ", 3.0),
            candidate("First Name", "MARY ANN", 3.0),
        ];
        let name = resolver().resolve_name(&candidates);
        assert_eq!(name.first, "Mary Ann");
        assert_eq!(name.last, "O'Brien");
    }

    #[test]
    fn test_missing_label_falls_back_to_best() {
        let candidates = vec![
            candidate("First Name", "Jane", 3.0),
            candidate("Student", "Smith, John", 4.0),
        ];
        let name = resolver().resolve_name(&candidates);
        assert_eq!(name, PersonName::from_parts("John", "Smith"));
    }

    #[test]
    fn test_comma_form() {
        let candidates = vec![candidate("Student", "Doe, Jane Marie", 3.0)];
        assert_eq!(
            resolver().resolve_name(&candidates),
            PersonName::from_parts("Jane", "Doe")
        );
    }

    #[test]
    fn test_space_form() {
        let candidates = vec![candidate("Student", "Jane Marie Doe", 3.0)];
        assert_eq!(
            resolver().resolve_name(&candidates),
            PersonName::from_parts("Jane", "Doe")
        );
    }

    #[test]
    fn test_zero_candidates() {
        assert_eq!(resolver().resolve_name(&[]), PersonName::unresolved());
    }

    #[test]
    fn test_parse_edge_cases() {
        assert_eq!(PersonName::parse("DOE,JANE"), PersonName::from_parts("Jane", "Doe"));
        assert_eq!(PersonName::parse("Doe,"), PersonName::from_parts("", "Doe"));
        assert_eq!(PersonName::parse("Doe,").first, NA);
        assert_eq!(PersonName::parse("Cher"), PersonName::from_parts("Cher", "Cher"));
        assert_eq!(PersonName::parse("   "), PersonName::unresolved());
    }

    #[test]
    fn test_from_lines_single_person() {
        let lines = vec![
            RawLine::new("OFFICIAL TRANSCRIPT", 0.02),
            RawLine::new("DOE, JANE M.", 0.08),
            RawLine::new("Lincoln High School", 0.12),
        ];
        let name = resolver().resolve_name_from_lines(&lines);
        assert_eq!(name, PersonName::from_parts("Jane", "Doe"));
    }

    #[test]
    fn test_from_lines_ambiguous() {
        let recognizer = ScriptedRecognizer::new()
            .with("jane doe", EntityCategory::Person)
            .with("john roe", EntityCategory::Person);
        let resolver = NameResolver::new(Arc::new(recognizer));

        let lines = vec![
            RawLine::new("Student: Jane Doe", 0.1),
            RawLine::new("Counselor: John Roe", 0.2),
        ];
        assert_eq!(resolver.resolve_name_from_lines(&lines), PersonName::unresolved());
        assert_eq!(resolver.resolve_name_from_lines(&[]), PersonName::unresolved());
    }

    #[test]
    fn test_from_lines_counts_lines_not_spans() {
        let recognizer = ScriptedRecognizer::new()
            .with("jane doe", EntityCategory::Person)
            .with("doe", EntityCategory::Person);
        let resolver = NameResolver::new(Arc::new(recognizer));

        let lines = vec![RawLine::new("jane doe", 0.1)];
        assert_eq!(
            resolver.resolve_name_from_lines(&lines),
            PersonName::from_parts("Jane", "Doe")
        );
    }
}
