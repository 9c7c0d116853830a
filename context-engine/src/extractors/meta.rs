//! Meta tag extraction.

use crate::document::Document;

/// `content` of the first `meta` whose name equals `name` exactly
pub fn content<D: Document + ?Sized>(doc: &D, name: &str) -> Option<String> {
    doc.meta_entries()
        .into_iter()
        .find(|entry| entry.name == name)
        .and_then(|entry| entry.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HtmlDocument;

    #[test]
    fn test_exact_name_only() {
        let d = HtmlDocument::parse(
            "https://example.com/",
            r#"<meta name="env-name" content="a"><meta name="ENV" content="b"><meta name="env" content="c">"#,
        );
        assert_eq!(content(&d, "env").as_deref(), Some("c"));
    }

    #[test]
    fn test_first_match_wins() {
        let d = HtmlDocument::parse(
            "https://example.com/",
            r#"<meta name="env" content="first"><meta name="env" content="second">"#,
        );
        assert_eq!(content(&d, "env").as_deref(), Some("first"));
    }
}
