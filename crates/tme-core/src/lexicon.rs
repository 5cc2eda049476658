//! Alias / anti-alias vocabulary per attribute
//!
//! The lexicon is loaded once from a JSON or TOML document shaped as
//!
//! ```json
//! { "Name": { "key":   { "alias": ["name"], "antialias": ["parent"] },
//!             "value": { "alias": [],       "antialias": ["street"] } } }
//! ```
//!
//! and is read-only afterwards. Every [`Attribute`] must have an entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::Attribute;

/// Which text of a field candidate a vocabulary applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Key,
    Value,
}

/// Positive and negative substrings for one side of one attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideVocabulary {
    #[serde(rename = "alias", default)]
    pub aliases: Vec<String>,

    #[serde(rename = "antialias", default)]
    pub antialiases: Vec<String>,
}

impl SideVocabulary {
    pub fn new<S: AsRef<str>>(aliases: &[S], antialiases: &[S]) -> Self {
        Self {
            aliases: aliases.iter().map(|s| s.as_ref().to_string()).collect(),
            antialiases: antialiases.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    /// Lower-case, trim, drop blanks and duplicates
    fn normalized(self) -> Self {
        Self {
            aliases: normalize_terms(self.aliases),
            antialiases: normalize_terms(self.antialiases),
        }
    }
}

fn normalize_terms(terms: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let term = term.trim().to_lowercase();
        if !term.is_empty() && !normalized.contains(&term) {
            normalized.push(term);
        }
    }
    normalized
}

/// Vocabulary for one attribute, both sides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    #[serde(default)]
    pub key: SideVocabulary,

    #[serde(default)]
    pub value: SideVocabulary,
}

impl LexiconEntry {
    pub fn new(key: SideVocabulary, value: SideVocabulary) -> Self {
        Self { key, value }
    }

    pub fn side(&self, side: Side) -> &SideVocabulary {
        match side {
            Side::Key => &self.key,
            Side::Value => &self.value,
        }
    }
}

/// Process-wide, read-only vocabulary used by the scorer and resolvers
#[derive(Debug, Clone, PartialEq)]
pub struct Lexicon {
    entries: BTreeMap<Attribute, LexiconEntry>,
}

impl Lexicon {
    /// Build a lexicon from explicit entries.
    ///
    /// Fails if any attribute has no entry.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (Attribute, LexiconEntry)>,
    ) -> Result<Self, ConfigError> {
        let entries: BTreeMap<Attribute, LexiconEntry> = entries
            .into_iter()
            .map(|(attribute, entry)| {
                (
                    attribute,
                    LexiconEntry::new(entry.key.normalized(), entry.value.normalized()),
                )
            })
            .collect();

        for attribute in Attribute::ALL {
            if !entries.contains_key(&attribute) {
                return Err(ConfigError::MissingLexiconEntry(attribute.to_string()));
            }
        }

        Ok(Self { entries })
    }

    /// Parse a lexicon document keyed by attribute name
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let document: BTreeMap<String, LexiconEntry> =
            serde_json::from_str(content).map_err(|e| ConfigError::LexiconParseError {
                path: None,
                message: e.to_string(),
            })?;
        Self::from_document(document)
    }

    /// Parse a lexicon document written as TOML tables
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let document: BTreeMap<String, LexiconEntry> =
            toml::from_str(content).map_err(|e| ConfigError::LexiconParseError {
                path: None,
                message: e.to_string(),
            })?;
        Self::from_document(document)
    }

    /// Load from a `.json` or `.toml` file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let parsed = if has_extension(&path, "toml") {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        };

        let lexicon = parsed.map_err(|e| match e {
            ConfigError::LexiconParseError { message, .. } => ConfigError::LexiconParseError {
                path: Some(path.clone()),
                message,
            },
            other => other,
        })?;

        tracing::info!("Loaded lexicon from {}", path.display());
        Ok(lexicon)
    }

    /// Built-in vocabulary for US high-school transcripts
    pub fn transcript_default() -> Result<Self, ConfigError> {
        Self::from_json_str(include_str!("../lexicon/transcript.json"))
    }

    pub fn entry(&self, attribute: Attribute) -> &LexiconEntry {
        // Construction guarantees an entry for every attribute.
        &self.entries[&attribute]
    }

    pub fn vocabulary(&self, attribute: Attribute, side: Side) -> &SideVocabulary {
        self.entry(attribute).side(side)
    }

    fn from_document(document: BTreeMap<String, LexiconEntry>) -> Result<Self, ConfigError> {
        let mut entries = Vec::with_capacity(document.len());
        for (name, entry) in document {
            match name.parse::<Attribute>() {
                Ok(attribute) => entries.push((attribute, entry)),
                Err(_) => tracing::warn!("Ignoring lexicon entry for unknown attribute {name:?}"),
            }
        }
        Self::from_entries(entries)
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "Name":   { "key": { "alias": ["Name", "Student"], "antialias": ["Parent"] },
                    "value": { "alias": [], "antialias": ["street"] } },
        "Grad":   { "key": { "alias": ["grad"] }, "value": {} },
        "School": { "key": { "alias": ["school"] }, "value": { "alias": ["high school"] } },
        "DOB":    { "key": { "alias": ["birth"] } }
    }"#;

    #[test]
    fn test_parse_json_lexicon_lowercases_terms() {
        let lexicon = Lexicon::from_json_str(MINIMAL).unwrap();

        let key = lexicon.vocabulary(Attribute::Name, Side::Key);
        assert_eq!(key.aliases, vec!["name", "student"]);
        assert_eq!(key.antialiases, vec!["parent"]);

        let dob_value = lexicon.vocabulary(Attribute::Dob, Side::Value);
        assert!(dob_value.aliases.is_empty());
    }

    #[test]
    fn test_missing_attribute_is_fatal() {
        let content = r#"{ "Name": {}, "Grad": {}, "School": {} }"#;
        let err = Lexicon::from_json_str(content).unwrap_err();
        assert!(matches!(err, ConfigError::MissingLexiconEntry(ref name) if name == "DOB"));
    }

    #[test]
    fn test_unknown_attribute_is_ignored() {
        let content = r#"{ "Name": {}, "Grad": {}, "School": {}, "DOB": {}, "Major": {} }"#;
        assert!(Lexicon::from_json_str(content).is_ok());
    }

    #[test]
    fn test_parse_toml_lexicon() {
        let content = r#"
            [Name.key]
            alias = ["name"]
            [Grad.value]
            alias = ["class of"]
            [School]
            [DOB]
        "#;
        let lexicon = Lexicon::from_toml_str(content).unwrap();
        assert_eq!(
            lexicon.vocabulary(Attribute::Grad, Side::Value).aliases,
            vec!["class of"]
        );
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lexicon.json");
        std::fs::write(&path, "{ not json").unwrap();

        match Lexicon::from_file(&path) {
            Err(ConfigError::LexiconParseError { path: Some(p), .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_bundled_lexicon_is_complete() {
        let lexicon = Lexicon::transcript_default().unwrap();
        for attribute in Attribute::ALL {
            assert!(!lexicon.vocabulary(attribute, Side::Key).aliases.is_empty());
        }
    }
}
