//! Graduation date resolution from raw text lines
//!
//! Every DATE span found in a line is classified with the line as its
//! label, so a line like `Date of Birth: 03/04/1994` goes to DOB and
//! `Graduation: June 2012` to Grad. The best Grad span above the acceptance
//! threshold is normalized.

use tracing::debug;

use tme_core::text::title_case;
use tme_core::{best_candidate, Attribute, EntityCategory, RawLine, ScoredCandidate, NA};

use crate::classifier::AttributeClassifier;
use crate::date::DateNormalizer;
use crate::recognizer::spans_of;

/// Finds a graduation date among raw lines
#[derive(Debug, Clone)]
pub struct GradResolver {
    classifier: AttributeClassifier,
    dates: DateNormalizer,
    position_weight: f64,
}

impl GradResolver {
    pub fn new(
        classifier: AttributeClassifier,
        dates: DateNormalizer,
        position_weight: f64,
    ) -> Self {
        Self {
            classifier,
            dates,
            position_weight,
        }
    }

    /// Normalized graduation date, or [`NA`]
    pub fn resolve_grad(&self, lines: &[RawLine]) -> String {
        let candidates = self.score_lines(lines);
        match best_candidate(&candidates) {
            Some(best) => self.dates.normalize(&best.value),
            None => NA.to_string(),
        }
    }

    /// DATE spans classified as `Grad` and scoring strictly above the
    /// acceptance threshold, positional bonus included
    pub fn score_lines(&self, lines: &[RawLine]) -> Vec<ScoredCandidate> {
        let scorer = self.classifier.scorer();
        let threshold = scorer.config().acceptance_threshold;
        let mut accepted = Vec::new();

        for line in lines {
            let titled = title_case(&line.text);
            let dates = spans_of(scorer.recognizer(), &titled)
                .into_iter()
                .filter(|span| span.category == EntityCategory::Date);

            for span in dates {
                let (attribute, base) = self.classifier.classify(&line.text, &span.text);
                if attribute != Attribute::Grad {
                    continue;
                }
                let score = base + scorer.position_bonus(line.top_position, self.position_weight);
                debug!(line = %line.text, date = %span.text, score, "Scored graduation date");

                if score > threshold {
                    accepted.push(ScoredCandidate::from_line(
                        line.clone(),
                        Attribute::Grad,
                        score,
                        span.text,
                    ));
                }
            }
        }

        accepted
    }
}
