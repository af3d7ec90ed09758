//! Two-tier parsing of free-text model output into a [`ClassificationResult`].
//!
//! Tier 1 takes the span from the first `{` to the last `}` and decodes it
//! as JSON. Tier 2 scrapes labeled lines (`Classification: PET bottle`)
//! and substitutes a per-field default for anything it cannot find.
//! Model output is non-deterministic, so both tiers must keep their exact
//! matching rules.

use regex::Regex;
use serde::Serialize;

use crate::types::ClassificationResult;

/// Which parsing tier produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseTier {
    Json,
    LabeledLines,
}

/// Labeled-line keywords and the default used when a keyword is absent.
const WASTE_TYPE_LABEL: (&str, &str) = ("waste type", "plastic");
const CLASSIFICATION_LABEL: (&str, &str) = ("classification", "recyclable plastic");
const RECOMMENDATION_LABEL: (&str, &str) = ("recommendation", "Clean and sort before recycling");
const TIP_LABEL: (&str, &str) = ("tip", "Check local recycling guidelines");

/// The canned result shown when the endpoint is unreachable or unusable.
pub fn fallback_classification() -> ClassificationResult {
    ClassificationResult::new(
        "plastic",
        "recyclable material",
        "Clean the item and check local recycling guidelines",
        "Proper sorting helps create a circular economy",
    )
}

/// Parse model output text. Never fails: tier 2 always yields a value.
pub fn parse_classification(text: &str) -> (ClassificationResult, ParseTier) {
    if let Some(result) = parse_embedded_json(text) {
        return (result, ParseTier::Json);
    }
    (parse_labeled_lines(text), ParseTier::LabeledLines)
}

/// Tier 1: decode the outermost `{...}` span as a four-field object.
fn parse_embedded_json(text: &str) -> Option<ClassificationResult> {
    let span = embedded_object_span(text)?;
    serde_json::from_str(span).ok()
}

/// Greedy span from the first `{` to the last `}` (inclusive).
fn embedded_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Tier 2: keyword scraping with field defaults.
fn parse_labeled_lines(text: &str) -> ClassificationResult {
    ClassificationResult {
        waste_type: extract_labeled(text, WASTE_TYPE_LABEL),
        classification: extract_labeled(text, CLASSIFICATION_LABEL),
        recommendations: extract_labeled(text, RECOMMENDATION_LABEL),
        recycling_tips: extract_labeled(text, TIP_LABEL),
    }
}

/// Find `keyword`, skip any run of `:`/whitespace, capture up to the next
/// newline or period. The match is case-insensitive and the capture trimmed.
fn extract_labeled(text: &str, (keyword, default): (&str, &str)) -> String {
    let pattern = format!(r"(?i){}[:\s]*([^\n.]+)", regex::escape(keyword));
    Regex::new(&pattern)
        .ok()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

/// Truncate a string for log messages, respecting char boundaries.
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &s[..cut])
}
