//! Extractor runner.
//!
//! Each declarative [`Extractor`] reads one value out of the live document:
//! - `domTextRegex`: regex scan over landmark or body text
//! - `meta`: content of a named meta tag
//! - `titleRegex`: regex against the document title
//! - `selectorText`: trimmed text of the first matching element
//!
//! Errors (bad pattern, bad selector) are returned to the caller, which
//! records them per extractor instead of aborting the pipeline.

pub mod dom;
pub mod meta;
pub mod title;

use crate::document::Document;
use crate::rules::Extractor;
use crate::types::ExtractionError;
use regex::Regex;

/// Run one extractor against the document.
///
/// Returns `Ok(None)` when the signal is simply not present.
pub fn run_extractor<D: Document + ?Sized>(
    doc: &D,
    extractor: &Extractor,
) -> Result<Option<String>, ExtractionError> {
    match extractor {
        Extractor::DomTextRegex { pattern, scope, .. } => dom::scan_text(doc, pattern, *scope),
        Extractor::Meta { name, .. } => Ok(meta::content(doc, name)),
        Extractor::TitleRegex { pattern, .. } => title::match_title(doc, pattern),
        Extractor::SelectorText { selector, .. } => dom::selector_text(doc, selector),
    }
}

/// Compile a user-supplied pattern
pub(crate) fn compile(pattern: &str) -> Result<Regex, ExtractionError> {
    Regex::new(pattern).map_err(|e| ExtractionError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// First capture group when the pattern has one, else the full match.
///
/// A group that did not participate in the match falls back to the full
/// match.
pub(crate) fn capture(regex: &Regex, text: &str) -> Option<String> {
    let captures = regex.captures(text)?;

    let group = if regex.captures_len() > 1 {
        captures.get(1)
    } else {
        None
    };

    group
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().to_string())
}
