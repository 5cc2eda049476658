//! School resolution from raw text lines
//!
//! Each line is scored against the School value-side vocabulary on its
//! own. A recognizer ORG span can optionally add to a line's score.

use std::sync::Arc;

use tracing::debug;

use tme_core::text::{count_matches, title_case};
use tme_core::{Attribute, EntityCategory, FallbackConfig, Lexicon, RawLine, Side, NA};

use crate::recognizer::has_category;
use crate::EntityRecognizer;

/// Picks the line most likely to name the school
#[derive(Clone)]
pub struct SchoolResolver {
    lexicon: Arc<Lexicon>,
    config: FallbackConfig,
    entity_weight: f64,
    recognizer: Arc<dyn EntityRecognizer>,
}

impl SchoolResolver {
    pub fn new(
        lexicon: Arc<Lexicon>,
        config: FallbackConfig,
        entity_weight: f64,
        recognizer: Arc<dyn EntityRecognizer>,
    ) -> Self {
        Self {
            lexicon,
            config,
            entity_weight,
            recognizer,
        }
    }

    /// Score of one line
    pub fn score_line(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let vocabulary = self.lexicon.vocabulary(Attribute::School, Side::Value);

        let alias_hits = count_matches(&lower, &vocabulary.aliases) as f64;
        let anti_hits = count_matches(&lower, &vocabulary.antialiases) as f64;
        let mut score = alias_hits * self.config.school_alias_weight
            + anti_hits * self.config.school_anti_alias_penalty;

        if self.config.corroborate_school_with_entities
            && has_category(self.recognizer.as_ref(), &title_case(text), EntityCategory::Org)
        {
            score += self.entity_weight;
        }

        score
    }

    /// Title-cased text of the best line scoring strictly above the
    /// acceptance threshold, or [`NA`]. Lines tied on the best score are
    /// ambiguous and resolve to [`NA`].
    pub fn resolve_school(&self, lines: &[RawLine]) -> String {
        let threshold = self.config.school_acceptance_threshold;
        let mut best: Option<(&RawLine, f64)> = None;
        let mut tied = false;

        for line in lines {
            if line.text.trim().is_empty() {
                continue;
            }
            let score = self.score_line(&line.text);
            debug!(line = %line.text, score, "Scored school line");

            if score <= threshold {
                continue;
            }
            match best {
                Some((_, top)) if score < top => {}
                Some((_, top)) if score == top => tied = true,
                _ => {
                    best = Some((line, score));
                    tied = false;
                }
            }
        }

        match best {
            Some((_, score)) if tied => {
                debug!(score, "Several school lines share the best score");
                NA.to_string()
            }
            Some((line, score)) => {
                let school = title_case(line.text.trim());
                debug!(%school, score, "Resolved school from raw line");
                school
            }
            None => NA.to_string(),
        }
    }
}

impl std::fmt::Debug for SchoolResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchoolResolver")
            .field("config", &self.config)
            .field("entity_weight", &self.entity_weight)
            .field("recognizer", &self.recognizer.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedRecognizer;

    fn resolver_with(
        config: FallbackConfig,
        recognizer: Arc<dyn EntityRecognizer>,
    ) -> SchoolResolver {
        let lexicon = Arc::new(Lexicon::transcript_default().unwrap());
        SchoolResolver::new(lexicon, config, 2.0, recognizer)
    }

    fn resolver() -> SchoolResolver {
        resolver_with(FallbackConfig::default(), Arc::new(ScriptedRecognizer::new()))
    }

    #[test]
    fn test_picks_highest_scoring_line() {
        let lines = vec![
            RawLine::new("OFFICIAL TRANSCRIPT", 0.01),
            RawLine::new("Springfield School District", 0.03),
            RawLine::new("LINCOLN HIGH SCHOOL", 0.05),
            RawLine::new("Jane Doe", 0.08),
        ];
        assert_eq!(resolver().resolve_school(&lines), "Lincoln High School");
    }

    #[test]
    fn test_anti_alias_disqualifies_line() {
        let resolver = resolver();
        assert_eq!(resolver.score_line("Springfield School District"), -7.0);
        assert_eq!(
            resolver.resolve_school(&[RawLine::new("Springfield School District", 0.1)]),
            NA
        );
    }

    #[test]
    fn test_tied_lines_are_ambiguous() {
        let resolver = resolver();
        let lines = vec![
            RawLine::new("Lincoln High School", 0.05),
            RawLine::new("Roosevelt High School", 0.10),
        ];
        assert_eq!(resolver.score_line("Lincoln High School"), 6.0);
        assert_eq!(resolver.score_line("Roosevelt High School"), 6.0);
        assert_eq!(resolver.resolve_school(&lines), NA);
    }

    #[test]
    fn test_higher_line_breaks_earlier_tie() {
        let lines = vec![
            RawLine::new("Westfield Academy", 0.05),
            RawLine::new("Hillcrest College", 0.08),
            RawLine::new("  st. mary's college prep ", 0.1),
        ];
        assert_eq!(resolver().resolve_school(&lines), "St. Mary'S College Prep");
    }

    #[test]
    fn test_no_lines() {
        assert_eq!(resolver().resolve_school(&[]), NA);
    }

    #[test]
    fn test_org_corroboration_is_opt_in() {
        let recognizer: Arc<dyn EntityRecognizer> =
            Arc::new(ScriptedRecognizer::new().with("westfield", EntityCategory::Org));
        let lines = vec![RawLine::new("Westfield", 0.1)];

        let plain = resolver_with(FallbackConfig::default(), recognizer.clone());
        assert_eq!(plain.resolve_school(&lines), NA);

        let corroborating = resolver_with(
            FallbackConfig {
                corroborate_school_with_entities: true,
                ..Default::default()
            },
            recognizer,
        );
        assert_eq!(corroborating.score_line("Westfield"), 2.0);
        assert_eq!(corroborating.resolve_school(&lines), "Westfield");
    }
}
