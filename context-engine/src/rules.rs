//! Rule data contracts and boundary validation.
//!
//! Rules arrive from the external rule store as JSON. They are deserialized
//! into these types and then checked as a whole set: a single bad rule
//! rejects the entire update so the resolver never sees partial data.

use crate::types::ValidationError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    // Hex colour literal and nothing else (no trailing CSS)
    static ref HEX_COLOR: Regex = Regex::new(
        r"^#(?:[0-9a-fA-F]{3,4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$"
    ).unwrap();
}

/// A user-authored rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Stable identity
    pub id: String,
    pub name: String,
    /// Disabled rules are never considered
    pub enabled: bool,
    /// Higher wins
    pub priority: i64,
    pub target: Target,
    pub detection: Detection,
    pub display: DisplaySpec,
}

/// One host or a list of hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostTarget {
    One(String),
    Many(Vec<String>),
}

impl HostTarget {
    pub fn hosts(&self) -> &[String] {
        match self {
            HostTarget::One(host) => std::slice::from_ref(host),
            HostTarget::Many(hosts) => hosts,
        }
    }
}

/// Where a rule applies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<HostTarget>,
    /// Glob over the full URL, `*` is the only wildcard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
}

impl Target {
    /// Configured host condition, ignoring an empty string
    pub fn host(&self) -> Option<&HostTarget> {
        match &self.host {
            Some(HostTarget::One(host)) if host.is_empty() => None,
            other => other.as_ref(),
        }
    }

    /// Configured URL glob, ignoring an empty string
    pub fn url_pattern(&self) -> Option<&str> {
        self.url_pattern.as_deref().filter(|p| !p.is_empty())
    }

    /// A target with neither condition can never match
    pub fn is_configured(&self) -> bool {
        self.host().is_some() || self.url_pattern().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectionMode {
    /// Target match alone is enough
    UrlOnly,
    /// Target match plus extractor-derived signals
    Signals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    pub mode: DetectionMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extractors: Vec<Extractor>,
    #[serde(default, rename = "match", skip_serializing_if = "Vec::is_empty")]
    pub match_exprs: Vec<MatchExpr>,
}

/// Region of the page a DOM text scan is limited to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Header,
    Nav,
    Body,
}

/// Declarative rule for pulling one signal out of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Extractor {
    #[serde(rename_all = "camelCase")]
    DomTextRegex {
        key: String,
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scope: Option<Scope>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        first_match_only: Option<bool>,
    },
    Meta {
        key: String,
        name: String,
    },
    TitleRegex {
        key: String,
        pattern: String,
    },
    SelectorText {
        key: String,
        selector: String,
    },
}

impl Extractor {
    /// Key path the result is written to
    pub fn key(&self) -> &str {
        match self {
            Extractor::DomTextRegex { key, .. }
            | Extractor::Meta { key, .. }
            | Extractor::TitleRegex { key, .. }
            | Extractor::SelectorText { key, .. } => key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Extractor::DomTextRegex { .. } => "domTextRegex",
            Extractor::Meta { .. } => "meta",
            Extractor::TitleRegex { .. } => "titleRegex",
            Extractor::SelectorText { .. } => "selectorText",
        }
    }

    /// Whether the result can change through DOM mutations alone
    pub fn is_dom_dependent(&self) -> bool {
        matches!(
            self,
            Extractor::DomTextRegex { .. } | Extractor::SelectorText { .. }
        )
    }
}

/// Predicate over one fingerprint field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MatchExpr {
    Exists { key: String },
    Eq { key: String, value: String },
    Regex { key: String, pattern: String },
    In { key: String, values: Vec<String> },
}

impl MatchExpr {
    pub fn key(&self) -> &str {
        match self {
            MatchExpr::Exists { key }
            | MatchExpr::Eq { key, .. }
            | MatchExpr::Regex { key, .. }
            | MatchExpr::In { key, .. } => key,
        }
    }
}

/// Indicator anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    HeaderBar,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayExtras {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint_page: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<String>,
}

/// Per-rule presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySpec {
    /// Label with `{{key.path}}` placeholders
    pub label_template: String,
    /// CSS hex colour literal
    pub color: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<DisplayExtras>,
}

impl Rule {
    /// Semantic checks that the type system does not cover
    pub fn validate(&self) -> Result<(), String> {
        if !HEX_COLOR.is_match(&self.display.color) {
            return Err(format!(
                "display.color '{}' is not a hex colour",
                self.display.color
            ));
        }

        if let Some(opacity) = self.display.opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(format!("display.opacity {} is outside [0, 1]", opacity));
            }
        }

        Ok(())
    }

    /// Whether this rule needs DOM mutation notifications to stay current
    pub fn watches_dom(&self) -> bool {
        self.enabled
            && self.detection.mode == DetectionMode::Signals
            && self.detection.extractors.iter().any(Extractor::is_dom_dependent)
    }
}

/// Validate a rule set delivered as a JSON value.
///
/// The whole set is rejected on the first failure.
pub fn rules_from_value(value: serde_json::Value) -> Result<Vec<Rule>, ValidationError> {
    let rules: Vec<Rule> = serde_json::from_value(value)?;

    for (index, rule) in rules.iter().enumerate() {
        rule.validate()
            .map_err(|reason| ValidationError::InvalidRule {
                index,
                id: rule.id.clone(),
                reason,
            })?;
    }

    Ok(rules)
}

/// Validate a rule set delivered as JSON text
pub fn parse_rules(json: &str) -> Result<Vec<Rule>, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    rules_from_value(value)
}
