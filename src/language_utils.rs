//! Language utilities for the target language setting
//!
//! Accepts ISO 639-1 (2-letter), ISO 639-3 and ISO 639-2/B (3-letter) codes.
//! Prompts use the English language name.

use anyhow::{anyhow, Result};
use isolang::Language;

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Resolve a language code to an isolang language
pub fn parse_language(code: &str) -> Result<Language> {
    let normalized = code.trim().to_lowercase();

    let language = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized).or_else(|| {
            BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(b, _)| *b == normalized)
                .and_then(|(_, t)| Language::from_639_3(t))
        }),
        _ => None,
    };

    language.ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Check that a code names a known language
pub fn validate_language_code(code: &str) -> Result<()> {
    parse_language(code).map(|_| ())
}

/// Normalize a language code to ISO 639-3
pub fn normalize_to_part3(code: &str) -> Result<String> {
    Ok(parse_language(code)?.to_639_3().to_string())
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    Ok(parse_language(code)?.to_name().to_string())
}

/// English name followed by the native name when it differs, e.g. "Japanese (日本語)"
pub fn describe_language(code: &str) -> Result<String> {
    let language = parse_language(code)?;
    let name = language.to_name();

    Ok(match language.to_autonym() {
        Some(autonym) if autonym != name => format!("{} ({})", name, autonym),
        _ => name.to_string(),
    })
}
