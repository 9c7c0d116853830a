//! File-backed rule store.
//!
//! Accepts either a bare JSON array of rules or an object of the form
//! `{"rules": [...], "displayStyle": "ribbon"}`. Data that fails validation
//! is treated as absent.

use context_engine::rules::rules_from_value;
use context_engine::{DisplayStyle, Rule};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Validated contents of the store
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub rules: Vec<Rule>,
    pub display_style: Option<DisplayStyle>,
}

pub struct FileRuleStore {
    path: PathBuf,
}

impl FileRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the store; never fails
    pub fn load(&self) -> StoreSnapshot {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => {
                info!("No rules file at {:?}, starting with no rules", self.path);
                return StoreSnapshot::default();
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(value) => Self::snapshot_from_value(value),
            Err(e) => {
                warn!("Rules file {:?} is not JSON: {}", self.path, e);
                StoreSnapshot::default()
            }
        }
    }

    /// Raw rules value for reporting validation errors
    pub fn raw_rules(&self) -> Result<Value, String> {
        let contents = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("Cannot read {:?}: {}", self.path, e))?;
        let value: Value = serde_json::from_str(&contents)
            .map_err(|e| format!("Malformed rule data: {}", e))?;

        Ok(match value {
            Value::Object(mut map) => map.remove("rules").unwrap_or(Value::Array(Vec::new())),
            other => other,
        })
    }

    fn snapshot_from_value(value: Value) -> StoreSnapshot {
        let (rules, style) = match value {
            Value::Object(mut map) => (map.remove("rules"), map.remove("displayStyle")),
            other => (Some(other), None),
        };

        let rules = match rules.map(rules_from_value) {
            Some(Ok(rules)) => rules,
            Some(Err(e)) => {
                warn!("Stored rules rejected: {}", e);
                Vec::new()
            }
            None => Vec::new(),
        };

        let display_style = style.and_then(|value| {
            let parsed = DisplayStyle::from_value(&value);
            if parsed.is_none() {
                warn!("Stored display style rejected: {}", value);
            }
            parsed
        });

        StoreSnapshot {
            rules,
            display_style,
        }
    }
}
