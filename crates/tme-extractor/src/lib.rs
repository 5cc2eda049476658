//! TME Extractor - Transcript metadata classification and resolution
//!
//! Scores OCR field candidates and raw lines against the target attributes,
//! resolves names, dates and schools into canonical text, and runs the
//! two-phase (structured fields, then raw text) extraction.

use serde::{Deserialize, Serialize};

use tme_core::{EntityCategory, Result};

/// Span tagged by an entity recognizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    pub category: EntityCategory,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

impl EntitySpan {
    pub fn new(text: impl Into<String>, category: EntityCategory) -> Self {
        let text = text.into();
        let end = text.len();
        Self {
            text,
            category,
            start: 0,
            end,
            confidence: 1.0,
        }
    }

    /// Set the byte range of the span within the recognized text
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end;
        self
    }
}

/// Entity-recognition capability.
///
/// Given text, return spans tagged with a category. Implementations are
/// expected to be case-sensitive; callers title-case text first.
pub trait EntityRecognizer: Send + Sync {
    fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>>;

    /// Short identifier for logs
    fn name(&self) -> &str {
        "recognizer"
    }
}

pub mod batch;
pub mod classifier;
pub mod date;
pub mod grad;
pub mod name;
pub mod pipeline;
pub mod recognizer;
pub mod school;
pub mod scorer;

pub use batch::{BatchExtractor, DocumentInput};
pub use classifier::{AttributeClassifier, Classification};
pub use date::{DateNormalizer, DateParseError};
pub use grad::GradResolver;
pub use name::{NameResolver, PersonName};
pub use pipeline::{merge, Extractor};
pub use recognizer::{CachedRecognizer, RuleBasedRecognizer, ScriptedRecognizer};
pub use school::SchoolResolver;
pub use scorer::FieldScorer;
