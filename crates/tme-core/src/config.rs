//! TME Configuration Management
//!
//! Handles engine configuration from TOML files and environment variables.
//! Every scoring weight, threshold and the canonical date format is a
//! setting here rather than a constant in the scorer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Field scoring and Phase 1 acceptance
    pub scoring: ScoringConfig,

    /// Phase 2 raw-text fallback
    pub fallback: FallbackConfig,

    /// Date normalization
    pub date: DateConfig,

    /// Parallel batch extraction
    pub batch: BatchConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_override()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TME_*` environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        // Scoring
        if let Some(v) = env_parse("TME_KEY_ALIAS_WEIGHT")? {
            self.scoring.key_alias_weight = v;
        }
        if let Some(v) = env_parse("TME_VALUE_ALIAS_WEIGHT")? {
            self.scoring.value_alias_weight = v;
        }
        if let Some(v) = env_parse("TME_ENTITY_WEIGHT")? {
            self.scoring.entity_weight = v;
        }
        if let Some(v) = env_parse("TME_ANTI_ALIAS_PENALTY")? {
            self.scoring.anti_alias_penalty = v;
        }
        if let Some(v) = env_parse("TME_ACCEPTANCE_THRESHOLD")? {
            self.scoring.acceptance_threshold = v;
        }
        if let Some(v) = env_parse("TME_POSITION_WEIGHT")? {
            self.scoring.position_weight = v;
        }

        // Fallback
        if let Some(v) = env_parse("TME_FALLBACK_TOP_FRACTION")? {
            self.fallback.top_fraction = v;
        }
        if let Some(v) = env_parse("TME_FALLBACK_RESOLVE_GRAD")? {
            self.fallback.resolve_grad = v;
        }
        if let Some(v) = env_parse("TME_SCHOOL_CORROBORATE_ENTITIES")? {
            self.fallback.corroborate_school_with_entities = v;
        }

        // Date
        if let Some(v) = env_parse("TME_DATE_FORMAT")? {
            self.date.format = v;
        }

        // Batch
        if let Some(v) = env_parse("TME_MAX_CONCURRENCY")? {
            self.batch.max_concurrency = v;
        }
        if let Some(v) = env_parse("TME_RECOGNIZER_CACHE_CAPACITY")? {
            self.batch.recognizer_cache_capacity = v;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fallback.top_fraction) {
            return Err(ConfigError::InvalidValue {
                key: "fallback.top_fraction".to_string(),
                value: self.fallback.top_fraction.to_string(),
            });
        }
        if self.scoring.anti_alias_penalty > 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "scoring.anti_alias_penalty".to_string(),
                value: self.scoring.anti_alias_penalty.to_string(),
            });
        }
        if self.fallback.school_anti_alias_penalty > 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "fallback.school_anti_alias_penalty".to_string(),
                value: self.fallback.school_anti_alias_penalty.to_string(),
            });
        }
        if self.batch.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "batch.max_concurrency".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        Err(_) => Ok(None),
    }
}

/// Weights used by the field scorer and the Phase 1 acceptance threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Added per key-side alias found in the label
    pub key_alias_weight: f64,

    /// Added per value-side alias found in the value
    pub value_alias_weight: f64,

    /// Added once when the recognizer tags the value with the expected category
    pub entity_weight: f64,

    /// Added (negative) per anti-alias hit on either side
    pub anti_alias_penalty: f64,

    /// A candidate is kept only if its score is strictly greater than this
    pub acceptance_threshold: f64,

    /// Multiplier for the `1 - top_position` bonus; 0 disables it
    pub position_weight: f64,
}

impl ScoringConfig {
    /// Anti-alias hits cost one point instead of disqualifying
    pub fn lenient() -> Self {
        Self {
            anti_alias_penalty: -1.0,
            ..Default::default()
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            key_alias_weight: 1.0,
            value_alias_weight: 2.0,
            entity_weight: 2.0,
            // Strict: a single anti-alias hit disqualifies the candidate
            anti_alias_penalty: -10.0,
            acceptance_threshold: 2.0,
            position_weight: 1.0,
        }
    }
}

/// Settings for the raw-text fallback pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Only lines with `top_position <= top_fraction` are searched
    pub top_fraction: f64,

    /// Added per School value-side alias found in a line
    pub school_alias_weight: f64,

    /// Added (negative) per School value-side anti-alias found in a line
    pub school_anti_alias_penalty: f64,

    /// A school line is kept only if its score is strictly greater than this
    pub school_acceptance_threshold: f64,

    /// Add the entity weight to school lines the recognizer tags as ORG
    pub corroborate_school_with_entities: bool,

    /// Search DATE spans in the window for a missing graduation date
    pub resolve_grad: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            top_fraction: 0.3,
            school_alias_weight: 3.0,
            school_anti_alias_penalty: -10.0,
            school_acceptance_threshold: 1.0,
            corroborate_school_with_entities: false,
            resolve_grad: true,
        }
    }
}

/// Date normalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// Canonical output format
    pub format: DateFormat,

    /// Two-digit years below the pivot are 20xx, the rest 19xx
    pub two_digit_year_pivot: u32,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            format: DateFormat::Year,
            two_digit_year_pivot: 50,
        }
    }
}

/// Canonical textual form of a normalized date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// `YYYY`
    #[default]
    Year,
    /// `YYYY/MM/DD`
    Full,
}

impl DateFormat {
    /// chrono format string
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::Year => "%Y",
            Self::Full => "%Y/%m/%d",
        }
    }
}

impl std::str::FromStr for DateFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "year" | "%y" => Ok(Self::Year),
            "full" | "%y/%m/%d" => Ok(Self::Full),
            _ => Err(ConfigError::InvalidValue {
                key: "TME_DATE_FORMAT".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Parallel batch extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Documents extracted at the same time
    pub max_concurrency: usize,

    /// Recognizer results memoized across documents
    pub recognizer_cache_capacity: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            recognizer_cache_capacity: 10_000,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Lexicon has no entry for attribute {0}")]
    MissingLexiconEntry(String),

    #[error("Failed to parse lexicon: {message}")]
    LexiconParseError {
        path: Option<PathBuf>,
        message: String,
    },
}
