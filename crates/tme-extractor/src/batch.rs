//! Parallel batch extraction
//!
//! Documents are independent, so each one is extracted on the blocking
//! pool while a semaphore bounds how many run at once. Records come back
//! in input order.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use tme_core::{
    EngineConfig, ExtractionRecord, FieldCandidate, Lexicon, RawLine, Result, TmeError,
};
use tme_ocr::OcrDocument;

use crate::pipeline::Extractor;
use crate::recognizer::CachedRecognizer;
use crate::EntityRecognizer;

/// Everything needed to extract one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    pub document_id: String,
    pub fields: Vec<FieldCandidate>,
    pub lines: Vec<RawLine>,
    /// Mean OCR confidence of the key/value view
    pub confidence1: f64,
    /// Mean OCR confidence of the raw-text view
    pub confidence2: f64,
}

impl DocumentInput {
    pub fn new(
        document_id: impl Into<String>,
        fields: Vec<FieldCandidate>,
        lines: Vec<RawLine>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            fields,
            lines,
            confidence1: 0.0,
            confidence2: 0.0,
        }
    }

    pub fn with_confidence(mut self, confidence1: f64, confidence2: f64) -> Self {
        self.confidence1 = confidence1;
        self.confidence2 = confidence2;
        self
    }

    /// Build from the key/value and raw-text OCR views of a document
    pub fn from_ocr(
        document_id: impl Into<String>,
        fields_view: &OcrDocument,
        lines_view: &OcrDocument,
    ) -> Self {
        Self::new(
            document_id,
            fields_view.field_candidates(),
            lines_view.raw_lines(),
        )
        .with_confidence(fields_view.confidence(), lines_view.confidence())
    }
}

/// Runs an [`Extractor`] over many documents concurrently
#[derive(Debug, Clone)]
pub struct BatchExtractor {
    extractor: Arc<Extractor>,
    semaphore: Arc<Semaphore>,
}

impl BatchExtractor {
    /// Concurrency comes from the extractor's batch settings
    pub fn new(extractor: Arc<Extractor>) -> Self {
        let limit = extractor.config().batch.max_concurrency;
        Self::with_concurrency(extractor, limit)
    }

    pub fn with_concurrency(extractor: Arc<Extractor>, max_concurrency: usize) -> Self {
        Self {
            extractor,
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Build an extractor whose recognizer output is memoized across the
    /// whole batch, sized by `config.batch.recognizer_cache_capacity`
    pub fn with_shared_cache(
        lexicon: Arc<Lexicon>,
        config: EngineConfig,
        recognizer: Arc<dyn EntityRecognizer>,
    ) -> Self {
        let cached = CachedRecognizer::new(recognizer, config.batch.recognizer_cache_capacity);
        Self::new(Arc::new(Extractor::new(lexicon, config, Arc::new(cached))))
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Extract every document, returning records in input order
    pub async fn extract_all(
        &self,
        documents: Vec<DocumentInput>,
    ) -> Result<Vec<ExtractionRecord>> {
        let total = documents.len();
        let tasks = documents.into_iter().map(|document| {
            let extractor = self.extractor.clone();
            let semaphore = self.semaphore.clone();
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| TmeError::TaskError(e.to_string()))?;
                let document_id = document.document_id.clone();

                tokio::task::spawn_blocking(move || {
                    let form = extractor.extract(
                        &document.fields,
                        &document.lines,
                        document.confidence1,
                        document.confidence2,
                    );
                    ExtractionRecord::new(document.document_id, form)
                })
                .await
                .map_err(|e| {
                    warn!(document_id = %document_id, "Extraction task failed: {}", e);
                    TmeError::TaskError(format!("{document_id}: {e}"))
                })
            }
        });

        let records = join_all(tasks)
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        let complete = records.iter().filter(|r| r.form.is_complete()).count();
        info!(total, complete, "Batch extraction finished");
        Ok(records)
    }
}
