//! Field scoring
//!
//! Scores a label/value pair against one attribute from three weak signals:
//! key-side vocabulary in the label, value-side vocabulary in the value, and
//! whether the entity recognizer tags the value with the attribute's category.

use std::sync::Arc;

use tme_core::text::{count_matches, title_case};
use tme_core::{Attribute, Lexicon, ScoringConfig, Side};

use crate::recognizer::has_category;
use crate::EntityRecognizer;

/// Scores label/value pairs against attributes
#[derive(Clone)]
pub struct FieldScorer {
    lexicon: Arc<Lexicon>,
    config: ScoringConfig,
    recognizer: Arc<dyn EntityRecognizer>,
}

impl FieldScorer {
    pub fn new(
        lexicon: Arc<Lexicon>,
        config: ScoringConfig,
        recognizer: Arc<dyn EntityRecognizer>,
    ) -> Self {
        Self {
            lexicon,
            config,
            recognizer,
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn recognizer(&self) -> &dyn EntityRecognizer {
        self.recognizer.as_ref()
    }

    /// Score `label`/`value` against `attribute`. May be negative.
    ///
    /// A blank value scores `0` and the recognizer is not consulted.
    pub fn score(&self, label: &str, value: &str, attribute: Attribute) -> f64 {
        if value.trim().is_empty() {
            return 0.0;
        }

        let mut score = self.vocabulary_score(label, value, attribute);

        let titled = title_case(value);
        if has_category(self.recognizer(), &titled, attribute.entity_category()) {
            score += self.config.entity_weight;
        }

        score
    }

    /// Alias and anti-alias contribution alone, without the recognizer
    pub fn vocabulary_score(&self, label: &str, value: &str, attribute: Attribute) -> f64 {
        let label = label.to_lowercase();
        let value = value.to_lowercase();
        let key = self.lexicon.vocabulary(attribute, Side::Key);
        let val = self.lexicon.vocabulary(attribute, Side::Value);

        let key_hits = count_matches(&label, &key.aliases) as f64;
        let value_hits = count_matches(&value, &val.aliases) as f64;
        let anti_hits = (count_matches(&label, &key.antialiases)
            + count_matches(&value, &val.antialiases)) as f64;

        key_hits * self.config.key_alias_weight
            + value_hits * self.config.value_alias_weight
            + anti_hits * self.config.anti_alias_penalty
    }

    /// Reward for candidates near the page top: `position_weight * (1 - top)`
    pub fn position_bonus(&self, top_position: f64, position_weight: f64) -> f64 {
        position_weight * (1.0 - top_position.clamp(0.0, 1.0))
    }
}

impl std::fmt::Debug for FieldScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldScorer")
            .field("config", &self.config)
            .field("recognizer", &self.recognizer.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedRecognizer;
    use proptest::prelude::*;
    use tme_core::EntityCategory;

    const LEXICON: &str = r#"{
        "Name":   { "key":   { "alias": ["name", "student"], "antialias": ["parent"] },
                    "value": { "alias": ["alpha", "bravo", "charlie", "delta"], "antialias": ["street"] } },
        "Grad":   { "key":   { "alias": ["grad"], "antialias": ["birth"] },
                    "value": { "alias": ["class of"] } },
        "School": { "key":   { "alias": ["school"] },
                    "value": { "alias": ["high"], "antialias": ["district"] } },
        "DOB":    { "key":   { "alias": ["birth"] } }
    }"#;

    fn scorer_with(recognizer: Arc<dyn EntityRecognizer>) -> FieldScorer {
        let lexicon = Arc::new(Lexicon::from_json_str(LEXICON).unwrap());
        FieldScorer::new(lexicon, ScoringConfig::default(), recognizer)
    }

    fn plain_scorer() -> FieldScorer {
        scorer_with(Arc::new(ScriptedRecognizer::new()))
    }

    #[test]
    fn test_key_alias_adds_one_each() {
        let scorer = plain_scorer();
        assert_eq!(scorer.score("Student Name", "x", Attribute::Name), 2.0);
        assert_eq!(scorer.score("Name", "x", Attribute::Name), 1.0);
    }

    #[test]
    fn test_value_alias_adds_two() {
        let scorer = plain_scorer();
        assert_eq!(scorer.score("", "Lincoln High", Attribute::School), 2.0);
        assert_eq!(scorer.score("", "Class of 2012", Attribute::Grad), 2.0);
    }

    #[test]
    fn test_anti_alias_disqualifies() {
        let scorer = plain_scorer();
        assert_eq!(scorer.score("Parent Name", "x", Attribute::Name), -9.0);
        assert_eq!(
            scorer.score("School", "Springfield High District", Attribute::School),
            1.0 + 2.0 - 10.0
        );
    }

    #[test]
    fn test_lenient_penalty() {
        let lexicon = Arc::new(Lexicon::from_json_str(LEXICON).unwrap());
        let scorer = FieldScorer::new(
            lexicon,
            ScoringConfig::lenient(),
            Arc::new(ScriptedRecognizer::new()),
        );
        assert_eq!(scorer.score("Parent Name", "x", Attribute::Name), 0.0);
    }

    #[test]
    fn test_entity_category_adds_once() {
        let recognizer = ScriptedRecognizer::new()
            .with("jane", EntityCategory::Person)
            .with("doe", EntityCategory::Person);
        let scorer = scorer_with(Arc::new(recognizer));

        assert_eq!(scorer.score("Name", "jane doe", Attribute::Name), 3.0);
        // PERSON does not help a DATE attribute
        assert_eq!(scorer.score("", "jane doe", Attribute::Grad), 0.0);
    }

    #[test]
    fn test_recognizer_sees_title_cased_value() {
        let scorer = scorer_with(Arc::new(crate::RuleBasedRecognizer::new()));
        assert_eq!(scorer.score("", "JANE DOE", Attribute::Name), 2.0);
    }

    #[test]
    fn test_recognizer_failure_scores_vocabulary_only() {
        let scorer = scorer_with(Arc::new(ScriptedRecognizer::failing()));
        assert_eq!(scorer.score("Name", "Jane Doe", Attribute::Name), 1.0);
    }

    #[test]
    fn test_empty_value_skips_recognizer() {
        let recognizer = Arc::new(ScriptedRecognizer::new().with("", EntityCategory::Person));
        let scorer = scorer_with(recognizer.clone());

        assert_eq!(scorer.score("Student Name", "   ", Attribute::Name), 0.0);
        assert_eq!(recognizer.calls(), 0);
    }

    #[test]
    fn test_position_bonus_is_clamped() {
        let scorer = plain_scorer();
        assert_eq!(scorer.position_bonus(0.25, 1.0), 0.75);
        assert_eq!(scorer.position_bonus(-0.5, 1.0), 1.0);
        assert_eq!(scorer.position_bonus(1.5, 1.0), 0.0);
        assert_eq!(scorer.position_bonus(0.0, 0.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_blank_value_scores_zero(label in ".*", blank in "[ \t\n]{0,8}") {
            let scorer = plain_scorer();
            for attribute in Attribute::ALL {
                prop_assert_eq!(scorer.score(&label, &blank, attribute), 0.0);
            }
        }

        #[test]
        fn prop_value_aliases_strictly_increase_score(label in "[a-z ]{0,12}", n in 0usize..4) {
            let scorer = plain_scorer();
            let aliases = ["alpha", "bravo", "charlie", "delta"];
            let fewer = format!("x {}", aliases[..n].join(" "));
            let more = format!("x {}", aliases[..n + 1].join(" "));
            prop_assert!(
                scorer.score(&label, &more, Attribute::Name)
                    > scorer.score(&label, &fewer, Attribute::Name)
            );
        }
    }
}
