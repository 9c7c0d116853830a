//! Core types used throughout the context engine.
//!
//! This module defines the page fingerprint, the triggers that drive
//! re-evaluation, the global display style and the error types shared
//! between components.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fingerprint fields produced by the builder. Extractors never write these.
pub const BASE_FIELDS: &[&str] = &["url", "host", "path", "title"];

/// Key path segments that are rejected outright by the path setter
pub const FORBIDDEN_SEGMENTS: &[&str] = &["__proto__", "constructor", "prototype"];

/// A value stored under an extractor key path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Map(BTreeMap<String, FieldValue>),
}

/// Identity snapshot of the current document.
///
/// The base fields come from the document address and title; everything else
/// lives in `extra` and is addressed by dot-separated key paths
/// (`identity.accountId`). Equality is field-for-field and independent of
/// insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Full document address
    pub url: String,
    /// Host name (no port)
    pub host: String,
    /// Path component of the address
    pub path: String,
    /// Document title, omitted when empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extractor-derived fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, FieldValue>,
}

impl Fingerprint {
    pub fn new(url: impl Into<String>, host: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            host: host.into(),
            path: path.into(),
            title: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Look up a text value by dot path.
    ///
    /// Returns `None` when any segment is missing or the final value is not
    /// text, so every match expression built on top of it fails closed.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        let mut segments = path.split('.');
        let first = segments.next()?;

        let base = match first {
            "url" => Some(Some(self.url.as_str())),
            "host" => Some(Some(self.host.as_str())),
            "path" => Some(Some(self.path.as_str())),
            "title" => Some(self.title.as_deref()),
            _ => None,
        };
        if let Some(value) = base {
            // Base fields are plain strings with no children
            return if segments.next().is_none() { value } else { None };
        }

        let mut current = self.extra.get(first)?;
        for segment in segments {
            current = match current {
                FieldValue::Map(map) => map.get(segment)?,
                FieldValue::Text(_) => return None,
            };
        }

        match current {
            FieldValue::Text(text) => Some(text),
            FieldValue::Map(_) => None,
        }
    }

    /// Write a text value at a dot path, creating intermediate maps.
    ///
    /// A text value sitting where an intermediate map is needed is replaced.
    pub fn set_path(&mut self, path: &str, value: impl Into<String>) -> Result<(), KeyPathError> {
        let segments = parse_key_path(path)?;
        if segments.is_empty() {
            return Err(KeyPathError::Empty);
        }

        insert_path(&mut self.extra, &segments, value.into());
        Ok(())
    }
}

fn insert_path(map: &mut BTreeMap<String, FieldValue>, segments: &[&str], value: String) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), FieldValue::Text(value));
        }
        [first, rest @ ..] => {
            let mut child = match map.remove(*first) {
                Some(FieldValue::Map(child)) => child,
                _ => BTreeMap::new(),
            };
            insert_path(&mut child, rest, value);
            map.insert((*first).to_string(), FieldValue::Map(child));
        }
    }
}

/// Split and check a key path against the allow-list rules.
pub fn parse_key_path(path: &str) -> Result<Vec<&str>, KeyPathError> {
    if path.is_empty() {
        return Err(KeyPathError::Empty);
    }

    let segments: Vec<&str> = path.split('.').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(KeyPathError::EmptySegment(path.to_string()));
        }
        if FORBIDDEN_SEGMENTS.contains(segment) {
            return Err(KeyPathError::Forbidden((*segment).to_string()));
        }
    }

    if BASE_FIELDS.contains(&segments[0]) {
        return Err(KeyPathError::Reserved(path.to_string()));
    }

    Ok(segments)
}

/// Global rendering mode, independent of which rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayStyle {
    #[default]
    TopBar,
    Ribbon,
    Combo,
}

impl DisplayStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStyle::TopBar => "topBar",
            DisplayStyle::Ribbon => "ribbon",
            DisplayStyle::Combo => "combo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "topBar" => Some(DisplayStyle::TopBar),
            "ribbon" => Some(DisplayStyle::Ribbon),
            "combo" => Some(DisplayStyle::Combo),
            _ => None,
        }
    }

    /// Accept a display style from the rule store; anything else is absent.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        value.as_str().and_then(Self::parse)
    }
}

/// How the host observed a route change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationKind {
    /// history push
    Push,
    /// history replace
    Replace,
    /// back/forward
    Pop,
}

/// Events that can cause a re-evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Scheduler start
    Init,
    /// Rule set replaced
    RulesUpdated,
    /// Display style replaced
    StyleUpdated,
    /// Single-page-application route change
    Navigation(NavigationKind),
    /// Fragment change
    HashChange,
    /// DOM mutation notification
    Mutation,
    /// Page visibility changed
    Visibility { visible: bool },
    /// Window regained focus
    Focus,
    /// Polling burst tick
    Poll,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Init => "init",
            Trigger::RulesUpdated => "rules",
            Trigger::StyleUpdated => "style",
            Trigger::Navigation(NavigationKind::Push) => "pushState",
            Trigger::Navigation(NavigationKind::Replace) => "replaceState",
            Trigger::Navigation(NavigationKind::Pop) => "popstate",
            Trigger::HashChange => "hashchange",
            Trigger::Mutation => "mutation",
            Trigger::Visibility { .. } => "visibilitychange",
            Trigger::Focus => "focus",
            Trigger::Poll => "poll",
        }
    }
}

/// Errors raised while running a single extractor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Rejections from the key path setter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyPathError {
    #[error("Key path is empty")]
    Empty,

    #[error("Key path '{0}' has an empty segment")]
    EmptySegment(String),

    #[error("Key path segment '{0}' is not allowed")]
    Forbidden(String),

    #[error("Key path '{0}' targets a base fingerprint field")]
    Reserved(String),
}

/// Errors raised when rule store data fails the schema
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Malformed rule data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Rule {index} ({id}): {reason}")]
    InvalidRule {
        index: usize,
        id: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Fingerprint {
        Fingerprint::new("https://example.com/page", "example.com", "/page")
    }

    #[test]
    fn test_get_base_fields() {
        let fp = base().with_title("Home");
        assert_eq!(fp.get_str("host"), Some("example.com"));
        assert_eq!(fp.get_str("title"), Some("Home"));
        assert_eq!(fp.get_str("url.length"), None);
        assert_eq!(base().get_str("title"), None);
    }

    #[test]
    fn test_set_nested_path() {
        let mut fp = base();
        fp.set_path("identity.accountId", "123456789012").unwrap();
        assert_eq!(fp.get_str("identity.accountId"), Some("123456789012"));
        // An intermediate map is not a string
        assert_eq!(fp.get_str("identity"), None);
    }

    #[test]
    fn test_set_path_keeps_siblings() {
        let mut fp = base();
        fp.set_path("identity.accountId", "123456789012").unwrap();
        fp.set_path("identity.role", "Admin").unwrap();
        assert_eq!(fp.get_str("identity.accountId"), Some("123456789012"));
        assert_eq!(fp.get_str("identity.role"), Some("Admin"));
    }

    #[test]
    fn test_set_path_replaces_text_intermediate() {
        let mut fp = base();
        fp.set_path("env", "prod").unwrap();
        fp.set_path("env.region", "us-east-1").unwrap();
        assert_eq!(fp.get_str("env"), None);
        assert_eq!(fp.get_str("env.region"), Some("us-east-1"));
    }

    #[test]
    fn test_forbidden_segments_rejected() {
        let mut fp = base();
        assert_eq!(
            fp.set_path("__proto__.polluted", "x"),
            Err(KeyPathError::Forbidden("__proto__".to_string()))
        );
        assert_eq!(
            fp.set_path("a.constructor", "x"),
            Err(KeyPathError::Forbidden("constructor".to_string()))
        );
        assert_eq!(
            fp.set_path("prototype", "x"),
            Err(KeyPathError::Forbidden("prototype".to_string()))
        );
        assert_eq!(fp, base());
    }

    #[test]
    fn test_reserved_and_empty_paths_rejected() {
        let mut fp = base();
        assert!(matches!(fp.set_path("host", "evil.com"), Err(KeyPathError::Reserved(_))));
        assert!(matches!(fp.set_path("a..b", "x"), Err(KeyPathError::EmptySegment(_))));
        assert_eq!(fp.set_path("", "x"), Err(KeyPathError::Empty));
        assert_eq!(fp.host, "example.com");
    }

    #[test]
    fn test_equality_is_order_independent() {
        let mut a = base();
        a.set_path("x", "1").unwrap();
        a.set_path("y", "2").unwrap();
        let mut b = base();
        b.set_path("y", "2").unwrap();
        b.set_path("x", "1").unwrap();
        assert_eq!(a, b);

        b.set_path("z", "3").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_serializes_flat() {
        let mut fp = base();
        fp.set_path("identity.accountId", "42").unwrap();
        let json = serde_json::to_value(&fp).unwrap();
        assert_eq!(json["host"], "example.com");
        assert_eq!(json["identity"]["accountId"], "42");
        assert!(json.get("title").is_none());
    }

    #[test]
    fn test_display_style_from_value() {
        assert_eq!(
            DisplayStyle::from_value(&serde_json::json!("ribbon")),
            Some(DisplayStyle::Ribbon)
        );
        assert_eq!(DisplayStyle::from_value(&serde_json::json!("sidebar")), None);
        assert_eq!(DisplayStyle::from_value(&serde_json::json!(3)), None);
        assert_eq!(DisplayStyle::default(), DisplayStyle::TopBar);
    }

    #[test]
    fn test_trigger_as_str() {
        assert_eq!(Trigger::Navigation(NavigationKind::Pop).as_str(), "popstate");
        assert_eq!(Trigger::Visibility { visible: true }.as_str(), "visibilitychange");
    }
}
