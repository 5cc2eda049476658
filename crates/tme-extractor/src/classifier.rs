//! Attribute classification of field candidates
//!
//! Each field candidate is scored against every attribute and assigned to
//! the best one. Candidates are kept per attribute only when their score,
//! plus a bonus for sitting near the page top, clears the acceptance
//! threshold. Attributes are maximized independently; two attributes are
//! never reconciled against each other.

use std::collections::BTreeMap;

use tracing::debug;

use tme_core::{best_candidate, Attribute, FieldCandidate, ScoredCandidate};

use crate::scorer::FieldScorer;

/// Accepted candidates per attribute, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    accepted: BTreeMap<Attribute, Vec<ScoredCandidate>>,
}

impl Classification {
    /// Accepted candidates for `attribute`; empty when none qualified
    pub fn candidates(&self, attribute: Attribute) -> &[ScoredCandidate] {
        self.accepted
            .get(&attribute)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Highest-scoring accepted candidate; the earliest wins on ties
    pub fn best(&self, attribute: Attribute) -> Option<&ScoredCandidate> {
        best_candidate(self.candidates(attribute))
    }

    /// Total number of accepted candidates
    pub fn len(&self) -> usize {
        self.accepted.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn accept(&mut self, candidate: ScoredCandidate) {
        self.accepted
            .entry(candidate.attribute)
            .or_default()
            .push(candidate);
    }
}

/// Assigns field candidates to attributes
#[derive(Debug, Clone)]
pub struct AttributeClassifier {
    scorer: FieldScorer,
}

impl AttributeClassifier {
    pub fn new(scorer: FieldScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &FieldScorer {
        &self.scorer
    }

    /// Best attribute for a label/value pair and its score.
    ///
    /// Ties keep the attribute that comes first in [`Attribute::ALL`].
    pub fn classify(&self, label: &str, value: &str) -> (Attribute, f64) {
        let mut best = (Attribute::ALL[0], f64::NEG_INFINITY);
        for attribute in Attribute::ALL {
            let score = self.scorer.score(label, value, attribute);
            if score > best.1 {
                best = (attribute, score);
            }
        }
        best
    }

    /// Classify every candidate with a value and keep those scoring strictly
    /// above the acceptance threshold once the positional bonus is added.
    pub fn classify_all(
        &self,
        candidates: &[FieldCandidate],
        position_weight: f64,
    ) -> Classification {
        let threshold = self.scorer.config().acceptance_threshold;
        let mut classification = Classification::default();

        for candidate in candidates {
            if !candidate.has_value() {
                debug!(label = %candidate.label, "Skipping field with empty value");
                continue;
            }

            let (attribute, base) = self.classify(&candidate.label, &candidate.value);
            let score =
                base + self.scorer.position_bonus(candidate.top_position, position_weight);
            let accepted = score > threshold;

            debug!(
                label = %candidate.label,
                value = %candidate.value,
                attribute = %attribute,
                score,
                accepted,
                "Classified field candidate"
            );

            if accepted {
                classification.accept(ScoredCandidate::from_field(
                    candidate.clone(),
                    attribute,
                    score,
                ));
            }
        }

        classification
    }
}
