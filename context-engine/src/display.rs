//! Label rendering for presenters.

use crate::rules::DisplayExtras;
use crate::types::Fingerprint;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// `{{ key.path }}` placeholders in label templates
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s*([\w.\-]+)\s*\}\}").unwrap();
}

/// Fill `{{ key }}` placeholders from the fingerprint.
///
/// Unknown keys and non-text values render as empty text.
pub fn render_label(template: &str, fingerprint: &Fingerprint) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            fingerprint.get_str(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

/// Apply the rule's title prefix, if any, to a document title
pub fn titled(title: &str, extras: Option<&DisplayExtras>) -> String {
    match extras.and_then(|extras| extras.title_prefix.as_deref()) {
        Some(prefix) if !prefix.is_empty() && !title.starts_with(prefix) => {
            format!("{}{}", prefix, title)
        }
        _ => title.to_string(),
    }
}
