//! Document title extraction.

use super::{capture, compile};
use crate::document::Document;
use crate::types::ExtractionError;

/// Apply `pattern` to the title; a missing title is matched as empty text
pub fn match_title<D: Document + ?Sized>(
    doc: &D,
    pattern: &str,
) -> Result<Option<String>, ExtractionError> {
    let regex = compile(pattern)?;
    let title = doc.title().unwrap_or_default();
    Ok(capture(&regex, &title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HtmlDocument;

    fn titled(title: &str) -> HtmlDocument {
        HtmlDocument::parse(
            "https://example.com/",
            &format!("<html><head><title>{}</title></head></html>", title),
        )
    }

    #[test]
    fn test_capture_group() {
        let d = titled("MyApp - Dashboard [PROD]");
        assert_eq!(match_title(&d, r"\[(\w+)\]").unwrap().as_deref(), Some("PROD"));
    }

    #[test]
    fn test_full_match() {
        let d = titled("PROD Dashboard");
        assert_eq!(match_title(&d, "PROD").unwrap().as_deref(), Some("PROD"));
    }

    #[test]
    fn test_no_match() {
        let d = titled("Regular Page");
        assert_eq!(match_title(&d, r"\[(\w+)\]").unwrap(), None);
    }

    #[test]
    fn test_invalid_pattern() {
        let d = titled("Regular Page");
        assert!(match_title(&d, "(unclosed").is_err());
    }
}
