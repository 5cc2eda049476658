//! TME Core - Domain models, lexicon, and shared types
//!
//! This crate defines the core abstractions used throughout the TME system:
//! - Target attributes and the OCR-derived candidates scored against them
//! - The resolved `Form` and the phase-to-phase `Resolution` map
//! - The alias/anti-alias `Lexicon`
//! - Common error types
//! - Configuration management

pub mod config;
pub mod lexicon;
pub mod text;

pub use config::{
    BatchConfig, ConfigError, DateConfig, DateFormat, EngineConfig, FallbackConfig, ScoringConfig,
};
pub use lexicon::{Lexicon, LexiconEntry, Side, SideVocabulary};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sentinel for any form field that could not be determined
pub const NA: &str = "NA";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for TME operations
#[derive(Error, Debug)]
pub enum TmeError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Entity recognition failed: {0}")]
    RecognitionError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Extraction task failed: {0}")]
    TaskError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TmeError>;

// ============================================================================
// Attributes
// ============================================================================

/// Metadata attribute a field candidate can be classified as
///
/// The declaration order is the tie-break order used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Name,
    Grad,
    School,
    #[serde(rename = "DOB")]
    Dob,
}

impl Attribute {
    /// Every attribute, in tie-break order
    pub const ALL: [Attribute; 4] = [Self::Name, Self::Grad, Self::School, Self::Dob];

    /// Get the string representation (also the lexicon key)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Grad => "Grad",
            Self::School => "School",
            Self::Dob => "DOB",
        }
    }

    /// Entity category the recognizer is expected to tag a matching value with
    pub fn entity_category(&self) -> EntityCategory {
        match self {
            Self::Name => EntityCategory::Person,
            Self::Grad | Self::Dob => EntityCategory::Date,
            Self::School => EntityCategory::Org,
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Attribute {
    type Err = TmeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "grad" => Ok(Self::Grad),
            "school" => Ok(Self::School),
            "dob" => Ok(Self::Dob),
            other => Err(TmeError::ValidationError(format!(
                "unknown attribute: {other}"
            ))),
        }
    }
}

/// Category assigned to a text span by an entity recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum EntityCategory {
    Person,
    Date,
    Org,
    /// Any category the engine does not score on (GPE, CARDINAL, ...)
    Other,
}

impl EntityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Date => "DATE",
            Self::Org => "ORG",
            Self::Other => "OTHER",
        }
    }
}

impl From<&str> for EntityCategory {
    fn from(label: &str) -> Self {
        match label.trim().to_uppercase().as_str() {
            "PERSON" | "PER" => Self::Person,
            "DATE" => Self::Date,
            "ORG" | "ORGANIZATION" => Self::Org,
            _ => Self::Other,
        }
    }
}

impl From<String> for EntityCategory {
    fn from(label: String) -> Self {
        Self::from(label.as_str())
    }
}

impl std::fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// OCR-derived Candidates
// ============================================================================

/// A detected label/value pair from the key/value view of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCandidate {
    /// Label (key) text as read by OCR
    pub label: String,

    /// Value text as read by OCR
    pub value: String,

    /// Distance from the page top as a fraction of page height (0 = top)
    pub top_position: f64,
}

impl FieldCandidate {
    pub fn new(label: impl Into<String>, value: impl Into<String>, top_position: f64) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            top_position,
        }
    }

    /// Whether the value carries any text. Empty values are never classified.
    pub fn has_value(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

/// A single text line from the raw-text view of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    pub text: String,

    /// Distance from the page top as a fraction of page height (0 = top)
    pub top_position: f64,

    /// OCR confidence for the line, when reported
    pub confidence: Option<f64>,
}

impl RawLine {
    pub fn new(text: impl Into<String>, top_position: f64) -> Self {
        Self {
            text: text.into(),
            top_position,
            confidence: None,
        }
    }

    /// Set OCR confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Where a scored candidate came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Field(FieldCandidate),
    Line(RawLine),
}

impl CandidateSource {
    /// Label text for fields, the line itself for raw lines
    pub fn label(&self) -> &str {
        match self {
            Self::Field(field) => &field.label,
            Self::Line(line) => &line.text,
        }
    }

    pub fn top_position(&self) -> f64 {
        match self {
            Self::Field(field) => field.top_position,
            Self::Line(line) => line.top_position,
        }
    }
}

/// A candidate scored against one attribute during a classification pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub source: CandidateSource,
    pub attribute: Attribute,
    pub score: f64,
    /// Text that would populate the attribute if this candidate wins
    pub value: String,
}

impl ScoredCandidate {
    /// Build a scored candidate from a field; the value is the field's value
    pub fn from_field(field: FieldCandidate, attribute: Attribute, score: f64) -> Self {
        let value = field.value.clone();
        Self {
            source: CandidateSource::Field(field),
            attribute,
            score,
            value,
        }
    }

    /// Build a scored candidate from a raw line with an explicit value
    pub fn from_line(
        line: RawLine,
        attribute: Attribute,
        score: f64,
        value: impl Into<String>,
    ) -> Self {
        Self {
            source: CandidateSource::Line(line),
            attribute,
            score,
            value: value.into(),
        }
    }

    pub fn label(&self) -> &str {
        self.source.label()
    }
}

/// Highest-scoring candidate; the earliest wins on ties
pub fn best_candidate(candidates: &[ScoredCandidate]) -> Option<&ScoredCandidate> {
    candidates.iter().fold(None, |best, candidate| match best {
        Some(current) if current.score >= candidate.score => Some(current),
        _ => Some(candidate),
    })
}

// ============================================================================
// Form and Resolution
// ============================================================================

/// Field of the result form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FormField {
    First,
    Last,
    Grad,
    School,
}

impl FormField {
    pub const ALL: [FormField; 4] = [Self::First, Self::Last, Self::Grad, Self::School];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "First",
            Self::Last => "Last",
            Self::Grad => "Grad",
            Self::School => "School",
        }
    }
}

impl std::fmt::Display for FormField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Extraction result for one document
///
/// Every text field is either [`NA`] or a resolved, canonical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Form {
    pub first: String,
    pub last: String,
    pub grad: String,
    pub school: String,
    /// Mean OCR confidence of the view that sourced the values
    pub confidence: f64,
}

impl Form {
    /// A form with every field unresolved
    pub fn unresolved() -> Self {
        Self {
            first: NA.to_string(),
            last: NA.to_string(),
            grad: NA.to_string(),
            school: NA.to_string(),
            confidence: 0.0,
        }
    }

    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::First => &self.first,
            FormField::Last => &self.last,
            FormField::Grad => &self.grad,
            FormField::School => &self.school,
        }
    }

    /// Fields still holding the sentinel
    pub fn missing(&self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|field| self.get(*field) == NA)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

impl Default for Form {
    fn default() -> Self {
        Self::unresolved()
    }
}

/// Resolved values produced by one extraction phase
///
/// Only resolved values are stored; absence means the field is still `NA`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    values: BTreeMap<FormField, String>,
}

impl Resolution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. Sentinel and blank values leave the field unresolved.
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() || value == NA {
            self.values.remove(&field);
        } else {
            self.values.insert(field, value.to_string());
        }
    }

    /// Builder-style [`Resolution::set`]
    pub fn with(mut self, field: FormField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn is_resolved(&self, field: FormField) -> bool {
        self.values.contains_key(&field)
    }

    /// Fields with no resolved value, in form order
    pub fn missing(&self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|field| !self.is_resolved(*field))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.values.len() == FormField::ALL.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fill fields this resolution is missing from `later`.
    ///
    /// Values already resolved here are never overwritten.
    pub fn merge(mut self, later: Resolution) -> Self {
        for (field, value) in later.values {
            self.values.entry(field).or_insert(value);
        }
        self
    }

    /// Finalize into a form, writing `NA` for unresolved fields
    pub fn into_form(self, confidence: f64) -> Form {
        let take = |field| self.get(field).unwrap_or(NA).to_string();
        Form {
            first: take(FormField::First),
            last: take(FormField::Last),
            grad: take(FormField::Grad),
            school: take(FormField::School),
            confidence,
        }
    }
}

/// A finalized form keyed by the document it was extracted from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub document_id: String,
    #[serde(flatten)]
    pub form: Form,
}

impl ExtractionRecord {
    pub fn new(document_id: impl Into<String>, form: Form) -> Self {
        Self {
            document_id: document_id.into(),
            form,
        }
    }
}

// ============================================================================
// Confidence
// ============================================================================

/// Mean OCR confidence over a document's blocks.
///
/// An empty input yields `0.0` rather than NaN.
pub fn aggregate_confidence(confidences: &[f64]) -> f64 {
    if confidences.is_empty() {
        return 0.0;
    }
    confidences.iter().sum::<f64>() / confidences.len() as f64
}

// ============================================================================
// Tests
// ============================================================================
