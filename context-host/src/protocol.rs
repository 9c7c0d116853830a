//! Line protocol between the page environment and the host.
//!
//! Input is one JSON object per line on stdin, tagged by `type`. Output is
//! one JSON object per line on stdout, tagged by `event`.

use chrono::{DateTime, Utc};
use context_engine::rules::{rules_from_value, Position};
use context_engine::{DisplayStyle, HostEvent, NavigationKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Message received from the page environment
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    /// Route change
    Navigate {
        #[serde(default = "default_navigation")]
        kind: NavigationKind,
        url: String,
        #[serde(default)]
        html: Option<String>,
    },
    /// New document content
    Mutate { html: String },
    /// Fragment change
    Hashchange { url: String },
    Visibility { visible: bool },
    Focus,
    /// Rule store change notification. Both fields are raw and validated here.
    #[serde(rename_all = "camelCase")]
    Storage {
        #[serde(default)]
        rules: Option<serde_json::Value>,
        #[serde(default)]
        display_style: Option<serde_json::Value>,
    },
    Shutdown,
}

fn default_navigation() -> NavigationKind {
    NavigationKind::Push
}

impl HostMessage {
    /// Parse one input line
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Translate into scheduler events.
    ///
    /// Store deltas that fail validation are dropped so the scheduler keeps
    /// its last good rules and style.
    pub fn into_events(self) -> Vec<HostEvent> {
        match self {
            HostMessage::Navigate { kind, url, html } => {
                vec![HostEvent::Navigated { kind, url, html }]
            }
            HostMessage::Mutate { html } => vec![HostEvent::Mutated { html }],
            HostMessage::Hashchange { url } => vec![HostEvent::HashChanged { url }],
            HostMessage::Visibility { visible } => vec![HostEvent::Visibility { visible }],
            HostMessage::Focus => vec![HostEvent::Focus],
            HostMessage::Storage {
                rules,
                display_style,
            } => {
                let mut events = Vec::new();

                if let Some(value) = rules {
                    match rules_from_value(value) {
                        Ok(rules) => events.push(HostEvent::RulesChanged(rules)),
                        Err(e) => warn!("Rejected rules update: {}", e),
                    }
                }

                if let Some(value) = display_style {
                    match DisplayStyle::from_value(&value) {
                        Some(style) => events.push(HostEvent::DisplayStyleChanged(style)),
                        None => warn!("Rejected display style update: {}", value),
                    }
                }

                events
            }
            HostMessage::Shutdown => vec![HostEvent::Shutdown],
        }
    }
}

/// Presenter call emitted on stdout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PresenterEvent {
    #[serde(rename_all = "camelCase")]
    Show {
        rule_id: String,
        rule_name: String,
        label: String,
        color: String,
        position: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        opacity: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        style: DisplayStyle,
        at: DateTime<Utc>,
    },
    Clear {
        at: DateTime<Utc>,
    },
}
