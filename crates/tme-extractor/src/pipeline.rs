//! Two-phase extraction
//!
//! Phase 1 classifies the structured key/value fields. Whatever it leaves
//! unresolved is retried in Phase 2 against the raw lines near the top of
//! the page. Phase 2 only ever fills fields Phase 1 left empty.

use std::sync::Arc;

use tracing::{debug, info};

use tme_core::{
    Attribute, EngineConfig, ExtractionRecord, FieldCandidate, Form, FormField, Lexicon, RawLine,
    Resolution,
};
use tme_ocr::OcrDocument;

use crate::classifier::AttributeClassifier;
use crate::date::DateNormalizer;
use crate::grad::GradResolver;
use crate::name::NameResolver;
use crate::school::SchoolResolver;
use crate::scorer::FieldScorer;
use crate::EntityRecognizer;

/// Combine two phases. Values already resolved by `phase1` always win.
pub fn merge(phase1: Resolution, phase2: Resolution) -> Resolution {
    phase1.merge(phase2)
}

/// Transcript metadata extractor
///
/// Immutable after construction and safe to share across threads.
#[derive(Debug, Clone)]
pub struct Extractor {
    config: Arc<EngineConfig>,
    classifier: AttributeClassifier,
    names: NameResolver,
    schools: SchoolResolver,
    grads: GradResolver,
    dates: DateNormalizer,
}

impl Extractor {
    pub fn new(
        lexicon: Arc<Lexicon>,
        config: EngineConfig,
        recognizer: Arc<dyn EntityRecognizer>,
    ) -> Self {
        let scorer = FieldScorer::new(lexicon.clone(), config.scoring.clone(), recognizer.clone());
        let classifier = AttributeClassifier::new(scorer);
        let dates = DateNormalizer::new(config.date.clone());

        Self {
            names: NameResolver::new(recognizer.clone()),
            schools: SchoolResolver::new(
                lexicon,
                config.fallback.clone(),
                config.scoring.entity_weight,
                recognizer,
            ),
            grads: GradResolver::new(
                classifier.clone(),
                dates.clone(),
                config.scoring.position_weight,
            ),
            classifier,
            dates,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve what the key/value fields support
    pub fn phase_one(&self, fields: &[FieldCandidate]) -> Resolution {
        let classification = self
            .classifier
            .classify_all(fields, self.config.scoring.position_weight);
        let mut resolution = Resolution::new();

        let names = classification.candidates(Attribute::Name);
        if !names.is_empty() {
            let name = self.names.resolve_name(names);
            resolution.set(FormField::First, name.first);
            resolution.set(FormField::Last, name.last);
        }

        if let Some(grad) = classification.best(Attribute::Grad) {
            resolution.set(FormField::Grad, self.dates.normalize(&grad.value));
        }

        if let Some(school) = classification.best(Attribute::School) {
            resolution.set(FormField::School, school.value.trim());
        }

        debug!(
            fields = fields.len(),
            accepted = classification.len(),
            missing = ?resolution.missing(),
            "Phase 1 complete"
        );
        resolution
    }

    /// Resolve only `missing` fields from the raw lines in the search window
    pub fn phase_two(&self, missing: &[FormField], lines: &[RawLine]) -> Resolution {
        let top_fraction = self.config.fallback.top_fraction;
        let window: Vec<RawLine> = lines
            .iter()
            .filter(|line| line.top_position <= top_fraction)
            .cloned()
            .collect();
        let mut resolution = Resolution::new();

        if missing.contains(&FormField::First) || missing.contains(&FormField::Last) {
            let name = self.names.resolve_name_from_lines(&window);
            resolution.set(FormField::First, name.first);
            resolution.set(FormField::Last, name.last);
        }

        if missing.contains(&FormField::School) {
            resolution.set(FormField::School, self.schools.resolve_school(&window));
        }

        if missing.contains(&FormField::Grad) && self.config.fallback.resolve_grad {
            resolution.set(FormField::Grad, self.grads.resolve_grad(&window));
        }

        debug!(
            window = window.len(),
            missing = ?missing,
            "Phase 2 complete"
        );
        resolution
    }

    /// Extract a form from both OCR views.
    ///
    /// `confidence1` and `confidence2` are the mean OCR confidences of the
    /// key/value and raw-text views. The form reports `confidence2` when
    /// Phase 2 supplied any value, `confidence1` otherwise.
    pub fn extract(
        &self,
        fields: &[FieldCandidate],
        lines: &[RawLine],
        confidence1: f64,
        confidence2: f64,
    ) -> Form {
        let phase1 = self.phase_one(fields);
        let missing = phase1.missing();

        if missing.is_empty() {
            info!("All fields resolved from key/value fields");
            return phase1.into_form(confidence1);
        }

        let phase2 = self.phase_two(&missing, lines);
        let merged = merge(phase1, phase2);
        let still_missing = merged.missing();
        let from_raw_text = still_missing.len() < missing.len();

        info!(
            missing_after_fields = ?missing,
            missing_after_lines = ?still_missing,
            "Extraction complete"
        );

        let confidence = if from_raw_text {
            confidence2
        } else {
            confidence1
        };
        merged.into_form(confidence)
    }

    /// Extract a document given its key/value and raw-text OCR views
    pub fn extract_document(
        &self,
        document_id: impl Into<String>,
        fields_view: &OcrDocument,
        lines_view: &OcrDocument,
    ) -> ExtractionRecord {
        let document_id = document_id.into();
        let form = self.extract(
            &fields_view.field_candidates(),
            &lines_view.raw_lines(),
            fields_view.confidence(),
            lines_view.confidence(),
        );
        info!(document_id = %document_id, complete = form.is_complete(), "Extracted document");
        ExtractionRecord::new(document_id, form)
    }
}
