//! Context Engine - page context resolution and re-evaluation
//!
//! This crate decides which declared context (environment, account, tenant)
//! the current document belongs to and keeps that decision live while the
//! document navigates and mutates:
//!
//! - **Fingerprint**: identity snapshot of the document, enriched by
//!   declarative extractors
//! - **Resolver**: picks the highest-priority enabled rule whose target and
//!   match expressions hold
//! - **Scheduler**: debounces triggers, runs polling bursts after navigation
//!   and holds a lost match for a grace window before clearing it
//!
//! # Architecture
//!
//! The scheduler is a deterministic state machine over explicit instants.
//! [`driver::run`] connects it to host events and the tokio clock; presenters
//! receive `show`/`clear` calls only when the visible state really changes.

pub mod config;
pub mod display;
pub mod document;
pub mod driver;
pub mod extractors;
pub mod fingerprint;
pub mod presets;
pub mod resolver;
pub mod rules;
pub mod scheduler;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use display::{render_label, titled};
pub use document::{Document, DocumentHost, HtmlDocument, MetaEntry};
pub use driver::{run, HostEvent};
pub use extractors::run_extractor;
pub use fingerprint::{build, enrich, Enrichment, EnrichmentReport, FailedExtractor};
pub use resolver::{resolve, ResolveResult};
pub use rules::{
    parse_rules, rules_from_value, Detection, DetectionMode, DisplaySpec, Extractor, MatchExpr,
    Rule, Target,
};
pub use scheduler::{Phase, Presenter, Scheduler, SchedulerStatus, TimingConfig};
pub use types::{
    DisplayStyle, ExtractionError, FieldValue, Fingerprint, KeyPathError, NavigationKind,
    Trigger, ValidationError,
};
