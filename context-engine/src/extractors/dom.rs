//! DOM text extraction (`domTextRegex`, `selectorText`).

use super::{capture, compile};
use crate::document::Document;
use crate::rules::Scope;
use crate::types::ExtractionError;
use tracing::trace;

/// Header landmarks by tag or ARIA role
const HEADER_LANDMARKS: &str = r#"header, [role="banner"]"#;

/// Navigation landmarks by tag or ARIA role
const NAV_LANDMARKS: &str = r#"nav, [role="navigation"]"#;

const BODY: &str = "body";

/// Text of the elements a scan is limited to.
///
/// Falls back to the whole body when the requested landmarks are absent.
pub fn candidate_texts<D: Document + ?Sized>(
    doc: &D,
    scope: Option<Scope>,
) -> Result<Vec<String>, ExtractionError> {
    let landmarks = match scope {
        Some(Scope::Header) => Some(HEADER_LANDMARKS),
        Some(Scope::Nav) => Some(NAV_LANDMARKS),
        Some(Scope::Body) | None => None,
    };

    if let Some(selector) = landmarks {
        let texts = doc.select_texts(selector)?;
        if !texts.is_empty() {
            return Ok(texts);
        }
        trace!("No '{}' landmarks, scanning body", selector);
    }

    doc.select_texts(BODY)
}

/// Scan candidate texts in order and return the first match
pub fn scan_text<D: Document + ?Sized>(
    doc: &D,
    pattern: &str,
    scope: Option<Scope>,
) -> Result<Option<String>, ExtractionError> {
    // Compile first: a bad pattern fails without touching the document
    let regex = compile(pattern)?;

    for text in candidate_texts(doc, scope)? {
        if let Some(value) = capture(&regex, &text) {
            return Ok(Some(value));
        }
    }

    Ok(None)
}

/// Trimmed text content of the first element matching `selector`
pub fn selector_text<D: Document + ?Sized>(
    doc: &D,
    selector: &str,
) -> Result<Option<String>, ExtractionError> {
    Ok(doc
        .select_texts(selector)?
        .into_iter()
        .next()
        .map(|text| text.trim().to_string()))
}
