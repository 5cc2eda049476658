//! TME OCR - OCR block model for scanned transcripts
//!
//! Reads the block graph produced by a form-analysis OCR service
//! (Textract-style `{"Blocks": [...]}` JSON) and turns it into the two
//! views the extractor works on: key/value [`FieldCandidate`]s and raw
//! text [`RawLine`]s, plus the mean block confidence of each view.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tme_core::{aggregate_confidence, FieldCandidate, RawLine};

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Malformed OCR output: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OcrError>;

/// Vertical position used when a block carries no geometry.
///
/// Bottom of the page: no positional bonus, outside every fallback window.
const UNKNOWN_TOP: f64 = 1.0;

// ============================================================================
// Block Model
// ============================================================================

/// Kind of OCR block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    Word,
    KeyValueSet,
    SelectionElement,
    Other,
}

impl From<String> for BlockType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PAGE" => Self::Page,
            "LINE" => Self::Line,
            "WORD" => Self::Word,
            "KEY_VALUE_SET" => Self::KeyValueSet,
            "SELECTION_ELEMENT" => Self::SelectionElement,
            _ => Self::Other,
        }
    }
}

/// Edge from one block to others
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    /// `CHILD`, `VALUE`, ...
    #[serde(rename = "Type")]
    pub kind: String,

    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BoundingBox {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    #[serde(default)]
    pub bounding_box: BoundingBox,
}

/// A single OCR block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub id: String,

    pub block_type: BlockType,

    /// `KEY` or `VALUE` for key/value sets
    #[serde(default)]
    pub entity_types: Vec<String>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,

    pub text: Option<String>,

    /// OCR confidence (0 - 100)
    pub confidence: Option<f64>,

    /// `SELECTED` or `NOT_SELECTED` for checkboxes
    pub selection_status: Option<String>,

    pub geometry: Option<Geometry>,
}

impl Block {
    /// Ids of related blocks of the given relationship kind
    pub fn related<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.relationships
            .iter()
            .filter(move |r| r.kind == kind)
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }

    pub fn is_key(&self) -> bool {
        self.block_type == BlockType::KeyValueSet && self.entity_types.iter().any(|t| t == "KEY")
    }

    pub fn top(&self) -> f64 {
        self.geometry
            .as_ref()
            .map(|g| g.bounding_box.top)
            .unwrap_or(UNKNOWN_TOP)
    }
}

// ============================================================================
// Document
// ============================================================================

/// Full OCR output for one document view
#[derive(Debug, Clone)]
pub struct OcrDocument {
    blocks: Vec<Block>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawDocument {
    #[serde(default)]
    blocks: Vec<Block>,
}

impl OcrDocument {
    pub fn new(blocks: Vec<Block>) -> Self {
        let index = blocks
            .iter()
            .enumerate()
            .map(|(i, block)| (block.id.clone(), i))
            .collect();
        Self { blocks, index }
    }

    /// Parse `{"Blocks": [...]}` JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(content)?;
        Ok(Self::new(raw.blocks))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.index.get(id).map(|&i| &self.blocks[i])
    }

    /// Key/value pairs in block order.
    ///
    /// The label is the text under the KEY block, the value the text of all
    /// its VALUE blocks joined by a space, and the position the key's top.
    pub fn field_candidates(&self) -> Vec<FieldCandidate> {
        let candidates: Vec<FieldCandidate> = self
            .blocks
            .iter()
            .filter(|block| block.is_key())
            .map(|key| {
                let values: Vec<String> = key
                    .related("VALUE")
                    .filter_map(|id| self.block(id))
                    .map(|value| self.child_text(value))
                    .collect();
                FieldCandidate::new(self.child_text(key), values.join(" "), key.top())
            })
            .collect();

        tracing::debug!("Extracted {} field candidates", candidates.len());
        candidates
    }

    /// Text lines in block order
    pub fn raw_lines(&self) -> Vec<RawLine> {
        self.blocks
            .iter()
            .filter(|block| block.block_type == BlockType::Line)
            .map(|line| {
                let mut text = self.child_text(line);
                if text.is_empty() {
                    text = line.text.clone().unwrap_or_default();
                }
                let raw = RawLine::new(text, line.top());
                match line.confidence {
                    Some(confidence) => raw.with_confidence(confidence),
                    None => raw,
                }
            })
            .collect()
    }

    /// Mean confidence over every block; blocks without a reading count
    /// as zero. `0.0` for an empty document.
    pub fn confidence(&self) -> f64 {
        let confidences: Vec<f64> = self
            .blocks
            .iter()
            .map(|b| b.confidence.unwrap_or(0.0))
            .collect();
        aggregate_confidence(&confidences)
    }

    /// Words under a block's CHILD edges; selected checkboxes read as `X`
    fn child_text(&self, block: &Block) -> String {
        let words: Vec<&str> = block
            .related("CHILD")
            .filter_map(|id| self.block(id))
            .filter_map(|child| match child.block_type {
                BlockType::Word => child.text.as_deref(),
                BlockType::SelectionElement
                    if child.selection_status.as_deref() == Some("SELECTED") =>
                {
                    Some("X")
                }
                _ => None,
            })
            .collect();
        words.join(" ")
    }
}

// ============================================================================
// Tests
// ============================================================================
