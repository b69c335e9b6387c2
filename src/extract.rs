//! Pulls numeric measurements out of free-text spec-sheet lines.
//!
//! Both extractors expect the number at the very start of the line, directly
//! followed (optionally after whitespace) by its unit. Anything after the unit
//! is ignored, so `"123.8 mm (4.87 inches)"` yields `123.8`.

use bigdecimal::BigDecimal;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static MILLIMETRES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*mm").expect("valid mm pattern"));

static GRAMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(?:\.\d+)?\s*g").expect("valid g pattern"));

/// Failure to find a `<number><unit>` token at the start of a line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("expected a measurement in '{unit}' at start of {text:?}")]
    PatternMismatch { unit: &'static str, text: String },
    #[error("value {text:?} does not fit a {unit} measurement")]
    OutOfRange { unit: &'static str, text: String },
}

/// Extracts a millimetre measurement, e.g. `"58.6 mm"` -> `58.6`.
///
/// The value is kept as an exact decimal so later rounding sees the digits
/// that were written, not their nearest binary float.
/// The line is not trimmed: leading whitespace counts as non-numeric content.
pub fn extract_dimension(text: &str) -> Result<BigDecimal, ExtractError> {
    let mismatch = || ExtractError::PatternMismatch {
        unit: "mm",
        text: text.to_string(),
    };
    let caps = MILLIMETRES.captures(text).ok_or_else(mismatch)?;

    BigDecimal::from_str(&caps[1]).map_err(|_| mismatch())
}

/// Extracts a gram weight, truncating any fractional part (`"143.5 g"` -> `143`).
pub fn extract_weight(text: &str) -> Result<u32, ExtractError> {
    let trimmed = text.trim();
    let caps = GRAMS
        .captures(trimmed)
        .ok_or_else(|| ExtractError::PatternMismatch {
            unit: "g",
            text: trimmed.to_string(),
        })?;

    caps[1].parse().map_err(|_| ExtractError::OutOfRange {
        unit: "g",
        text: trimmed.to_string(),
    })
}
