//! Configuration management for the context engine.
//!
//! Loads configuration from TOML files and provides runtime defaults.

use crate::scheduler::{self, TimingConfig};
use crate::types::DisplayStyle;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub timing: TimingSettings,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether indicators are shown at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Delay that coalesces bursts of triggers into one evaluation
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,

    /// How long a lost match stays visible before it is cleared
    #[serde(default = "default_grace")]
    pub grace_ms: u64,

    /// Length of the polling burst after a navigation
    #[serde(default = "default_poll_duration")]
    pub poll_duration_ms: u64,

    /// Interval between polling burst ticks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce(),
            grace_ms: default_grace(),
            poll_duration_ms: default_poll_duration(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl TimingSettings {
    /// Scheduler timing. A zero poll interval falls back to the default so
    /// the burst cannot spin.
    pub fn to_timing(&self) -> TimingConfig {
        let poll_interval_ms = if self.poll_interval_ms == 0 {
            warn!("timing.poll_interval_ms must be positive, using default");
            default_poll_interval()
        } else {
            self.poll_interval_ms
        };

        TimingConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            grace: Duration::from_millis(self.grace_ms),
            poll_duration: Duration::from_millis(self.poll_duration_ms),
            poll_interval: Duration::from_millis(poll_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Style used until the rule store supplies one
    #[serde(default)]
    pub default_style: DisplayStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Rules JSON file; `None` uses `rules.json` next to the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_debounce() -> u64 {
    scheduler::DEBOUNCE_MS
}

fn default_grace() -> u64 {
    scheduler::GRACE_MS
}

fn default_poll_duration() -> u64 {
    scheduler::POLL_DURATION_MS
}

fn default_poll_interval() -> u64 {
    scheduler::POLL_INTERVAL_MS
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_config_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config file: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("No config file found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    /// Directory holding the config and rules files
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("context-marker")
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Rules file to load, relative to `config_path` unless configured
    pub fn rules_path(&self, config_path: &std::path::Path) -> PathBuf {
        match &self.store.rules_path {
            Some(path) => path.clone(),
            None => config_path
                .parent()
                .map(|dir| dir.join("rules.json"))
                .unwrap_or_else(|| PathBuf::from("rules.json")),
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to_path(Self::default_config_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(&path, contents)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }
}
