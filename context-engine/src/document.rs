//! Access to the live document.
//!
//! Extractors and the fingerprint builder only ever read the document
//! through [`Document`]. The host that owns the page applies navigation and
//! content changes through [`DocumentHost`].

use crate::types::ExtractionError;
use scraper::{Html, Selector};

/// A `meta[name]` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEntry {
    pub name: String,
    pub content: Option<String>,
}

/// Read-only view of the current document
pub trait Document {
    /// Full address of the document
    fn href(&self) -> &str;

    /// Document title, `None` when absent or blank
    fn title(&self) -> Option<String>;

    /// Text content of every element matching `selector`, in document order
    fn select_texts(&self, selector: &str) -> Result<Vec<String>, ExtractionError>;

    /// Every `meta` element carrying a `name` attribute, in document order
    fn meta_entries(&self) -> Vec<MetaEntry>;
}

/// Mutations applied by the host between evaluations
pub trait DocumentHost: Document {
    /// Route change; content stays as it was
    fn navigate(&mut self, href: &str);

    /// Content replaced (render, async injection)
    fn replace_html(&mut self, html: &str);
}

/// Document backed by a parsed HTML tree
pub struct HtmlDocument {
    href: String,
    html: Html,
}

impl HtmlDocument {
    pub fn parse(href: impl Into<String>, html: &str) -> Self {
        Self {
            href: href.into(),
            html: Html::parse_document(html),
        }
    }

    /// A document with an empty body
    pub fn blank(href: impl Into<String>) -> Self {
        Self::parse(href, "")
    }
}

impl std::fmt::Debug for HtmlDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlDocument")
            .field("href", &self.href)
            .finish_non_exhaustive()
    }
}

impl Document for HtmlDocument {
    fn href(&self) -> &str {
        &self.href
    }

    fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        let element = self.html.select(&selector).next()?;

        // Collapse whitespace the way browsers report document titles
        let text = element.text().collect::<String>();
        let title = text.split_whitespace().collect::<Vec<_>>().join(" ");

        if title.is_empty() {
            None
        } else {
            Some(title)
        }
    }

    fn select_texts(&self, selector: &str) -> Result<Vec<String>, ExtractionError> {
        let parsed = Selector::parse(selector).map_err(|e| ExtractionError::InvalidSelector {
            selector: selector.to_string(),
            reason: format!("{:?}", e),
        })?;

        Ok(self
            .html
            .select(&parsed)
            .map(|element| element.text().collect::<String>())
            .collect())
    }

    fn meta_entries(&self) -> Vec<MetaEntry> {
        let Ok(selector) = Selector::parse("meta[name]") else {
            return Vec::new();
        };

        self.html
            .select(&selector)
            .filter_map(|element| {
                let value = element.value();
                Some(MetaEntry {
                    name: value.attr("name")?.to_string(),
                    content: value.attr("content").map(str::to_string),
                })
            })
            .collect()
    }
}

impl DocumentHost for HtmlDocument {
    fn navigate(&mut self, href: &str) {
        self.href = href.to_string();
    }

    fn replace_html(&mut self, html: &str) {
        self.html = Html::parse_document(html);
    }
}
