//! Entity recognizers
//!
//! Provides implementations of the [`EntityRecognizer`] capability:
//! - Rule-based: regex patterns + vocabulary filters for PERSON/DATE/ORG
//! - Scripted: fixed substring rules, for tests and replaying cached output
//! - Cached: memoizes any recognizer's output per text

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use regex::Regex;

use crate::{EntityRecognizer, EntitySpan};
use tme_core::{EntityCategory, Result, TmeError};

/// Whether `recognizer` tags any span of `text` with `category`.
///
/// Recognizer failures are logged and read as "no spans".
pub(crate) fn has_category(
    recognizer: &dyn EntityRecognizer,
    text: &str,
    category: EntityCategory,
) -> bool {
    spans_of(recognizer, text)
        .iter()
        .any(|span| span.category == category)
}

/// Recognizer output, or no spans when the recognizer fails
pub(crate) fn spans_of(recognizer: &dyn EntityRecognizer, text: &str) -> Vec<EntitySpan> {
    match recognizer.recognize(text) {
        Ok(spans) => spans,
        Err(e) => {
            tracing::warn!(
                recognizer = recognizer.name(),
                "Entity recognition failed for {:?}: {}",
                text,
                e
            );
            Vec::new()
        }
    }
}

// ============================================================================
// Rule-based Recognizer
// ============================================================================

/// Words that never appear in a person's name on a transcript header
const NON_NAME_WORDS: &[&str] = &[
    "academy", "address", "and", "attendance", "avenue", "birth", "city", "class", "college",
    "counselor", "county", "course", "courses", "credit", "credits", "date", "department",
    "diploma", "district", "grade", "grades", "graduate", "graduated", "graduation", "gpa",
    "high", "institute", "issued", "name", "of", "official", "page", "phone", "principal",
    "program", "public", "rank", "record", "registrar", "road", "school", "schools", "semester",
    "signature", "state", "street", "student", "term", "the", "total", "transcript",
    "university", "year",
];

const MONTHS: &str = "jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

/// Rule-based recognizer using regex patterns and a vocabulary filter.
///
/// Like statistical recognizers it is case-sensitive for PERSON: names are
/// only found in capitalized text.
pub struct RuleBasedRecognizer {
    /// Pattern rules (regex -> category, confidence)
    patterns: Vec<(Regex, EntityCategory, f32)>,
    /// Lower-cased words that disqualify a PERSON match
    non_name_words: HashSet<String>,
}

impl RuleBasedRecognizer {
    /// Create a recognizer with the default transcript rules
    pub fn new() -> Self {
        let mut recognizer = Self {
            patterns: Vec::new(),
            non_name_words: NON_NAME_WORDS.iter().map(|w| w.to_string()).collect(),
        };

        recognizer.init_date_patterns();
        recognizer.init_org_patterns();
        recognizer.init_person_patterns();
        recognizer
    }

    /// Add words that must not be read as part of a person's name
    pub fn with_non_name_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.non_name_words
            .extend(words.into_iter().map(|w| w.as_ref().to_lowercase()));
        self
    }

    fn init_date_patterns(&mut self) {
        // Numeric dates
        self.add_pattern(r"\b\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4}\b", EntityCategory::Date, 0.95);
        self.add_pattern(r"\b\d{4}[/.-]\d{1,2}[/.-]\d{1,2}\b", EntityCategory::Date, 0.95);
        self.add_pattern(r"\b\d{1,2}/\d{4}\b", EntityCategory::Date, 0.85);

        // Month-name dates
        self.add_pattern(
            &format!(r"(?i)\b(?:{MONTHS})\.?\s+(?:\d{{1,2}}(?:st|nd|rd|th)?,?\s+)?\d{{4}}\b"),
            EntityCategory::Date,
            0.95,
        );
        self.add_pattern(
            &format!(r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{MONTHS})\.?,?\s+\d{{4}}\b"),
            EntityCategory::Date,
            0.95,
        );

        // Bare years
        self.add_pattern(r"\b(?:19|20)\d{2}\b", EntityCategory::Date, 0.6);
    }

    fn init_org_patterns(&mut self) {
        self.add_pattern(
            r"\b(?:[A-Z][\w.'&-]*\s+){0,4}(?:High School|School|Academy|College|University|Institute|Seminary)\b",
            EntityCategory::Org,
            0.85,
        );
    }

    fn init_person_patterns(&mut self) {
        // Last, First [M.]
        self.add_pattern(
            r"\b[A-Z][a-z'-]+,\s*[A-Z][a-z'-]+(?:\s+[A-Z](?:[a-z'-]+|\.)?)?\b",
            EntityCategory::Person,
            0.9,
        );
        // First [Middle] Last
        self.add_pattern(
            r"\b[A-Z][a-z'-]+(?:\s+[A-Z](?:[a-z'-]+|\.))?\s+[A-Z][a-z'-]+\b",
            EntityCategory::Person,
            0.8,
        );
    }

    /// Add a regex pattern
    fn add_pattern(&mut self, pattern: &str, category: EntityCategory, confidence: f32) {
        match Regex::new(pattern) {
            Ok(regex) => self.patterns.push((regex, category, confidence)),
            Err(e) => tracing::warn!("Skipping invalid recognizer pattern {pattern:?}: {e}"),
        }
    }

    /// A PERSON match must not contain any non-name word
    fn is_plausible_name(&self, text: &str) -> bool {
        text.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|w| !w.is_empty())
            .all(|w| {
                !self
                    .non_name_words
                    .contains(&w.trim_end_matches('.').to_lowercase())
            })
    }

    /// Extract spans using pattern matching
    fn extract_by_patterns(&self, text: &str) -> Vec<EntitySpan> {
        let mut spans = Vec::new();

        for (regex, category, confidence) in &self.patterns {
            for mat in regex.find_iter(text) {
                if *category == EntityCategory::Person && !self.is_plausible_name(mat.as_str()) {
                    continue;
                }
                spans.push(EntitySpan {
                    text: mat.as_str().to_string(),
                    category: *category,
                    start: mat.start(),
                    end: mat.end(),
                    confidence: *confidence,
                });
            }
        }

        spans
    }

    /// Remove overlapping spans, keeping the longest then most confident
    fn deduplicate(&self, mut spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
        spans.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then((b.end - b.start).cmp(&(a.end - a.start)))
                .then(b.confidence.total_cmp(&a.confidence))
        });

        let mut result: Vec<EntitySpan> = Vec::new();
        for span in spans {
            let overlaps = result
                .iter()
                .any(|kept| span.start < kept.end && kept.start < span.end);
            if !overlaps {
                result.push(span);
            }
        }

        result.sort_by_key(|s| s.start);
        result
    }
}

impl Default for RuleBasedRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRecognizer for RuleBasedRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>> {
        let spans = self.extract_by_patterns(text);
        Ok(self.deduplicate(spans))
    }

    fn name(&self) -> &str {
        "rule-based"
    }
}

// ============================================================================
// Scripted Recognizer
// ============================================================================

/// Recognizer driven by fixed substring rules.
///
/// Every rule whose needle occurs in the text (case-insensitively) yields
/// one span. Used as a test double and to replay recognizer output that
/// was computed elsewhere.
#[derive(Default)]
pub struct ScriptedRecognizer {
    rules: Vec<(String, EntityCategory)>,
    fail: bool,
    calls: AtomicU64,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag `needle` with `category` wherever it occurs
    pub fn with(mut self, needle: impl AsRef<str>, category: EntityCategory) -> Self {
        self.rules.push((needle.as_ref().to_lowercase(), category));
        self
    }

    /// A recognizer whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Number of `recognize` calls so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl EntityRecognizer for ScriptedRecognizer {
    fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(TmeError::RecognitionError(
                "scripted recognizer failure".to_string(),
            ));
        }

        let lower = text.to_lowercase();
        let spans = self
            .rules
            .iter()
            .filter_map(|(needle, category)| {
                lower.find(needle.as_str()).map(|start| {
                    let end = start + needle.len();
                    EntitySpan::new(text.get(start..end).unwrap_or(needle.as_str()), *category)
                        .at(start, end)
                })
            })
            .collect();
        Ok(spans)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Cached Recognizer
// ============================================================================

/// Memoizes an inner recognizer's output per text.
///
/// Failed calls are not cached. Thread-safe; share one instance across a
/// batch so repeated header lines are recognized once.
pub struct CachedRecognizer<R> {
    inner: R,
    cache: Cache<String, Arc<Vec<EntitySpan>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: EntityRecognizer> CachedRecognizer<R> {
    pub fn new(inner: R, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(max_capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: EntityRecognizer> EntityRecognizer for CachedRecognizer<R> {
    fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>> {
        if let Some(spans) = self.cache.get(text) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(spans.as_ref().clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let spans = self.inner.recognize(text)?;
        self.cache.insert(text.to_string(), Arc::new(spans.clone()));
        Ok(spans)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

impl<T: EntityRecognizer + ?Sized> EntityRecognizer for Arc<T> {
    fn recognize(&self, text: &str) -> Result<Vec<EntitySpan>> {
        (**self).recognize(text)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ============================================================================
// Tests
// ============================================================================
