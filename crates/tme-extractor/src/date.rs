//! Date normalization
//!
//! Best-effort parsing of free-form transcript dates into a canonical text
//! form. Supported shapes:
//! - numeric: `8/7/2012`, `08-07-12`, `2012-08-07`, `8/2012`, `2012`
//! - month names: `August 7, 2012`, `7 Aug 2012`, `Aug. 7th 2012`, `June 2012`
//!
//! Words that are neither month names nor ordinals are ignored, so values
//! like `Class of 2012` still parse.

use chrono::NaiveDate;
use thiserror::Error;

use tme_core::{DateConfig, DateFormat, NA};

/// Why a date string could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("empty date string")]
    Empty,

    #[error("no date components in {0:?}")]
    NoComponents(String),

    #[error("cannot interpret {0:?} as a date")]
    Unrecognized(String),

    #[error("{year:04}-{month:02}-{day:02} is not a calendar date")]
    OutOfRange { year: i32, month: u32, day: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    /// Digits and how many of them were written
    Number(u32, usize),
    Month(u32),
}

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Month number for a full name or an abbreviation of at least three letters
fn month_number(word: &str) -> Option<u32> {
    if word.len() < 3 {
        return None;
    }
    let word = if word == "sept" { "sep" } else { word };
    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(word))
        .map(|i| i as u32 + 1)
}

/// Strip an ordinal suffix: `7th` -> `7`
fn strip_ordinal(word: &str) -> &str {
    ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| word.strip_suffix(suffix))
        .filter(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(word)
}

/// Parses and formats dates according to [`DateConfig`]
#[derive(Debug, Clone, Default)]
pub struct DateNormalizer {
    config: DateConfig,
}

impl DateNormalizer {
    pub fn new(config: DateConfig) -> Self {
        Self { config }
    }

    pub fn with_format(format: DateFormat) -> Self {
        Self::new(DateConfig {
            format,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &DateConfig {
        &self.config
    }

    /// Canonical text for `raw`, or [`NA`] when it cannot be parsed.
    ///
    /// Parse failures are logged, never returned.
    pub fn normalize(&self, raw: &str) -> String {
        match self.parse(raw) {
            Ok(date) => self.format(date),
            Err(e) => {
                tracing::warn!("Could not normalize date {:?}: {}", raw, e);
                NA.to_string()
            }
        }
    }

    pub fn format(&self, date: NaiveDate) -> String {
        date.format(self.config.format.pattern()).to_string()
    }

    /// Parse a free-form date.
    ///
    /// Numeric dates are read month-first unless the first number cannot be
    /// a month. A missing day is taken as the 1st, a missing month as January.
    pub fn parse(&self, raw: &str) -> Result<NaiveDate, DateParseError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(DateParseError::Empty);
        }

        let tokens =
            tokenize(text).ok_or_else(|| DateParseError::Unrecognized(text.to_string()))?;
        let months: Vec<u32> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Month(m) => Some(*m),
                _ => None,
            })
            .collect();
        let numbers: Vec<(u32, usize)> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Number(n, digits) => Some((*n, *digits)),
                _ => None,
            })
            .collect();

        if numbers.is_empty() {
            return Err(DateParseError::NoComponents(text.to_string()));
        }

        let (year, month, day) = match months.as_slice() {
            [] => self.numeric_parts(&numbers),
            [month] => self.named_parts(*month, &numbers),
            _ => None,
        }
        .ok_or_else(|| DateParseError::Unrecognized(text.to_string()))?;

        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(DateParseError::OutOfRange { year, month, day })
    }

    /// `M/D/Y`, `D/M/Y` (first > 12), `Y/M/D`, `M/Y`, `Y/M`, `Y`
    fn numeric_parts(&self, numbers: &[(u32, usize)]) -> Option<(i32, u32, u32)> {
        match *numbers {
            [(year, 4), (month, _), (day, _)] => Some((year as i32, month, day)),
            [(first, _), (second, _), (year, digits)] => {
                let year = self.expand_year(year, digits)?;
                if first > 12 {
                    Some((year, second, first))
                } else {
                    Some((year, first, second))
                }
            }
            [(year, 4), (month, _)] | [(month, _), (year, 4)] => Some((year as i32, month, 1)),
            [(year, 4)] => Some((year as i32, 1, 1)),
            _ => None,
        }
    }

    /// `Month D Y`, `D Month Y`, `Month Y`
    fn named_parts(&self, month: u32, numbers: &[(u32, usize)]) -> Option<(i32, u32, u32)> {
        match *numbers {
            [(year, 4)] => Some((year as i32, month, 1)),
            [(day, d), (year, y)] if d <= 2 => Some((self.expand_year(year, y)?, month, day)),
            [(year, 4), (day, d)] if d <= 2 => Some((year as i32, month, day)),
            _ => None,
        }
    }

    /// Four-digit years as written; two-digit years around the pivot
    fn expand_year(&self, year: u32, digits: usize) -> Option<i32> {
        match digits {
            4 => Some(year as i32),
            1 | 2 if year < self.config.two_digit_year_pivot => Some(2000 + year as i32),
            1 | 2 => Some(1900 + year as i32),
            _ => None,
        }
    }
}

/// Split into numbers and month names, dropping other words.
///
/// Returns `None` for a number too long to be a date component.
fn tokenize(text: &str) -> Option<Vec<Token>> {
    let lower = text.to_lowercase();
    let mut tokens = Vec::new();

    for word in lower.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let word = strip_ordinal(word);
        if word.chars().all(|c| c.is_ascii_digit()) {
            if word.len() > 4 {
                return None;
            }
            let value = word.parse::<u32>().ok()?;
            tokens.push(Token::Number(value, word.len()));
        } else if let Some(month) = month_number(word) {
            tokens.push(Token::Month(month));
        }
    }

    Some(tokens)
}
