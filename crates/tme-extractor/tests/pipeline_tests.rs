//! End-to-end extraction tests over OCR fixtures
//!
//! Both views of a scanned transcript are loaded from `tests/fixtures` and
//! run through the full two-phase pipeline with the rule-based recognizer.

use std::sync::Arc;

use serde_json::Value;
use tme_core::{EngineConfig, Form, Lexicon, NA};
use tme_extractor::{BatchExtractor, DocumentInput, Extractor, RuleBasedRecognizer};
use tme_ocr::OcrDocument;

const KV_VIEW: &str = include_str!("fixtures/transcript_kv.json");
const RAW_VIEW: &str = include_str!("fixtures/transcript_raw.json");

fn extractor() -> Extractor {
    Extractor::new(
        Arc::new(Lexicon::transcript_default().unwrap()),
        EngineConfig::default(),
        Arc::new(RuleBasedRecognizer::new()),
    )
}

fn views() -> (OcrDocument, OcrDocument) {
    (
        OcrDocument::from_json_str(KV_VIEW).unwrap(),
        OcrDocument::from_json_str(RAW_VIEW).unwrap(),
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Mean confidence of the raw view: 470 over its 23 blocks
const RAW_CONFIDENCE: f64 = 470.0 / 23.0;

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
}

fn empty_view() -> OcrDocument {
    OcrDocument::from_json_str(r#"{ "Blocks": [] }"#).unwrap()
}

// =============================================================================
// Two-phase extraction
// =============================================================================

#[test]
fn test_fields_then_lines() -> anyhow::Result<()> {
    init_tracing();
    let kv = OcrDocument::from_json_str(KV_VIEW)?;
    let raw = OcrDocument::from_json_str(RAW_VIEW)?;
    let record = extractor().extract_document("transcript-001", &kv, &raw);

    assert_eq!(record.document_id, "transcript-001");
    assert_eq!(record.form.first, "Jane");
    assert_eq!(record.form.last, "Doe");
    assert_eq!(record.form.grad, "2012");
    // No School field on the form; found in the page header instead
    assert_eq!(record.form.school, "Lincoln High School");
    assert_eq!(record.form.confidence, raw.confidence());
    assert_close(record.form.confidence, RAW_CONFIDENCE);
    Ok(())
}

#[test]
fn test_lines_only() {
    let (_, raw) = views();
    let record = extractor().extract_document("transcript-002", &empty_view(), &raw);

    assert_eq!(record.form.first, "Jane");
    assert_eq!(record.form.last, "Doe");
    assert_eq!(record.form.grad, NA);
    assert_eq!(record.form.school, "Lincoln High School");
    assert_close(record.form.confidence, RAW_CONFIDENCE);
}

#[test]
fn test_fields_only_keeps_field_confidence() {
    let (kv, _) = views();
    let record = extractor().extract_document("transcript-003", &kv, &empty_view());

    assert_eq!(record.form.first, "Jane");
    assert_eq!(record.form.grad, "2012");
    assert_eq!(record.form.school, NA);
    // 700 over the key/value view's 25 blocks
    assert_eq!(record.form.confidence, 28.0);
}

#[test]
fn test_empty_document() {
    let record = extractor().extract_document("blank", &empty_view(), &empty_view());
    assert_eq!(record.form, Form::unresolved());
    assert_eq!(record.form.confidence, 0.0);
}

#[test]
fn test_full_date_format() {
    let mut config = EngineConfig::default();
    config.date.format = tme_core::DateFormat::Full;
    let extractor = Extractor::new(
        Arc::new(Lexicon::transcript_default().unwrap()),
        config,
        Arc::new(RuleBasedRecognizer::new()),
    );

    let (kv, raw) = views();
    let record = extractor.extract_document("transcript-004", &kv, &raw);
    assert_eq!(record.form.grad, "2012/06/05");
}

// =============================================================================
// Output shape
// =============================================================================

#[test]
fn test_record_serializes_form_keys() -> anyhow::Result<()> {
    let (kv, raw) = views();
    let record = extractor().extract_document("transcript-005", &kv, &raw);
    let json: Value = serde_json::to_value(&record)?;

    assert_eq!(json["document_id"], "transcript-005");
    assert_eq!(json["First"], "Jane");
    assert_eq!(json["Last"], "Doe");
    assert_eq!(json["Grad"], "2012");
    assert_eq!(json["School"], "Lincoln High School");
    assert_close(json["Confidence"].as_f64().unwrap(), RAW_CONFIDENCE);
    Ok(())
}

// =============================================================================
// Batch
// =============================================================================

#[tokio::test]
async fn test_batch_over_ocr_views() {
    init_tracing();
    let (kv, raw) = views();
    let documents = vec![
        DocumentInput::from_ocr("a", &kv, &raw),
        DocumentInput::from_ocr("b", &empty_view(), &empty_view()),
        DocumentInput::from_ocr("c", &kv, &empty_view()),
    ];

    let batch = BatchExtractor::with_shared_cache(
        Arc::new(Lexicon::transcript_default().unwrap()),
        EngineConfig::default(),
        Arc::new(RuleBasedRecognizer::new()),
    );
    let records = batch.extract_all(documents).await.unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(records[0].form.is_complete());
    assert_eq!(records[1].form, Form::unresolved());
    assert_eq!(records[2].form.school, NA);
}
