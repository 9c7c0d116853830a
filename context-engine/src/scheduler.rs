//! Re-evaluation scheduler.
//!
//! Owns the current rules and display style, decides when the
//! build → resolve pipeline runs, and tells the presenter to show or clear
//! the indicator. The scheduler never sleeps or spawns: every operation takes
//! the current instant, timers are plain deadlines, and the caller fires them
//! with [`Scheduler::advance`]. The async driver in [`crate::driver`] wires
//! this to the tokio clock.

use crate::document::Document;
use crate::fingerprint::build;
use crate::resolver::{resolve, ResolveResult};
use crate::rules::Rule;
use crate::types::{DisplayStyle, Fingerprint, Trigger};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Debounce window for coalescing triggers
pub const DEBOUNCE_MS: u64 = 300;

/// Grace window before a lost match is cleared
pub const GRACE_MS: u64 = 4000;

/// Length of the polling burst after a navigation
pub const POLL_DURATION_MS: u64 = 4000;

/// Interval between polling burst ticks
pub const POLL_INTERVAL_MS: u64 = 500;

/// Renders the indicator. Calls are idempotent on the receiving side.
pub trait Presenter {
    fn show(&mut self, rule: &Rule, fingerprint: &Fingerprint, style: DisplayStyle);
    fn clear(&mut self);
}

/// Scheduler timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    pub debounce: Duration,
    pub grace: Duration,
    pub poll_duration: Duration,
    pub poll_interval: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEBOUNCE_MS),
            grace: Duration::from_millis(GRACE_MS),
            poll_duration: Duration::from_millis(POLL_DURATION_MS),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        }
    }
}

/// Indicator state as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing shown
    Idle,
    /// Indicator visible for a matched rule
    Matched,
    /// Match lost, grace window running
    GracePending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Running,
    TornDown,
}

#[derive(Debug, Clone, Copy)]
enum Timer {
    Debounce,
    Burst,
    Grace,
}

/// Last identity handed to the presenter
#[derive(Debug, Clone)]
struct Shown {
    rule_id: String,
    fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Copy)]
struct Burst {
    started: Instant,
    next_tick: Instant,
}

/// Scheduler status snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub phase: Phase,
    pub rule_id: Option<String>,
    pub rules: usize,
    pub observing_dom: bool,
    pub debounce_pending: bool,
    pub burst_active: bool,
    pub evaluations: u64,
    pub shows: u64,
    pub clears: u64,
}

/// Re-evaluation scheduler for one document lifetime
pub struct Scheduler<D, P> {
    doc: D,
    presenter: P,
    timing: TimingConfig,
    rules: Vec<Rule>,
    style: DisplayStyle,
    lifecycle: Lifecycle,
    /// Mutation notifications are only honoured while set
    observing: bool,
    shown: Option<Shown>,
    /// Next evaluation re-shows even an unchanged match
    stale: bool,
    debounce_at: Option<Instant>,
    grace_at: Option<Instant>,
    burst: Option<Burst>,
    /// Triggers coalesced into the pending evaluation
    causes: Vec<&'static str>,
    evaluations: u64,
    shows: u64,
    clears: u64,
}

impl<D: Document, P: Presenter> Scheduler<D, P> {
    pub fn new(doc: D, presenter: P, mut timing: TimingConfig) -> Self {
        // A zero interval would re-arm the burst tick at the same instant forever
        if timing.poll_interval.is_zero() {
            warn!("Poll interval must be positive, using {}ms", POLL_INTERVAL_MS);
            timing.poll_interval = Duration::from_millis(POLL_INTERVAL_MS);
        }

        Self {
            doc,
            presenter,
            timing,
            rules: Vec::new(),
            style: DisplayStyle::default(),
            lifecycle: Lifecycle::Created,
            observing: false,
            shown: None,
            stale: false,
            debounce_at: None,
            grace_at: None,
            burst: None,
            causes: Vec::new(),
            evaluations: 0,
            shows: 0,
            clears: 0,
        }
    }

    /// Install rules and style, start listening and evaluate immediately
    pub fn init(&mut self, rules: Vec<Rule>, style: DisplayStyle, now: Instant) {
        if self.lifecycle == Lifecycle::TornDown {
            debug!("Scheduler already torn down, ignoring init");
            return;
        }

        info!("Starting scheduler with {} rules, style {}", rules.len(), style.as_str());
        self.rules = rules;
        self.style = style;
        self.lifecycle = Lifecycle::Running;
        self.refresh_observation();
        self.note_cause(Trigger::Init);
        self.evaluate(now);
    }

    /// Replace the rule set and evaluate immediately
    pub fn update_rules(&mut self, rules: Vec<Rule>, now: Instant) {
        if !self.is_running() {
            return;
        }

        info!("Rules updated: {} rules", rules.len());
        self.rules = rules;
        self.grace_at = None;
        self.refresh_observation();
        self.note_cause(Trigger::RulesUpdated);
        self.evaluate(now);
    }

    /// Replace the display style and evaluate immediately.
    ///
    /// The current match is re-shown in the new style even when nothing else
    /// changed.
    pub fn update_display_style(&mut self, style: DisplayStyle, now: Instant) {
        if !self.is_running() {
            return;
        }

        info!("Display style changed to {}", style.as_str());
        self.style = style;
        self.stale = true;
        self.note_cause(Trigger::StyleUpdated);
        self.evaluate(now);
    }

    /// Feed an external event
    pub fn trigger(&mut self, trigger: Trigger, now: Instant) {
        if !self.is_running() {
            trace!("Ignoring {} while not running", trigger.as_str());
            return;
        }

        match trigger {
            Trigger::Navigation(_) => {
                self.grace_at = None;
                self.schedule_evaluate(trigger, now);
                self.start_burst(now);
            }
            Trigger::Mutation if !self.observing => {
                trace!("Ignoring mutation, no rule reads the DOM");
            }
            Trigger::Visibility { visible: false } => {
                trace!("Page hidden, not evaluating");
            }
            _ => self.schedule_evaluate(trigger, now),
        }
    }

    /// Debounce an evaluation. A pending one is pushed back, never queued.
    pub fn schedule_evaluate(&mut self, cause: Trigger, now: Instant) {
        if !self.is_running() {
            return;
        }

        self.note_cause(cause);
        self.debounce_at = Some(now + self.timing.debounce);
    }

    /// Build a fresh fingerprint, resolve it and update the presenter
    pub fn evaluate(&mut self, now: Instant) {
        if !self.is_running() {
            return;
        }

        self.debounce_at = None;
        self.evaluations += 1;
        let causes = std::mem::take(&mut self.causes);

        match self.resolve_current() {
            Some(result) => {
                debug!(
                    "Evaluation #{} matched '{}' (triggered by {:?})",
                    self.evaluations, result.rule.id, causes
                );
                if self.grace_at.take().is_some() {
                    debug!("Match returned within grace window");
                }
                self.apply_match(result);
            }
            None => {
                debug!(
                    "Evaluation #{} found no match (triggered by {:?})",
                    self.evaluations, causes
                );
                if self.shown.is_some() && self.grace_at.is_none() {
                    debug!("Match lost, clearing in {:?} unless it returns", self.timing.grace);
                    self.grace_at = Some(now + self.timing.grace);
                }
            }
        }
    }

    /// Earliest pending deadline, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.next_timer().map(|(at, _)| at)
    }

    /// Fire every deadline at or before `now`, oldest first.
    ///
    /// Each timer runs as if at its own deadline, so a late call behaves the
    /// same as punctual ones. Returns the number of timers fired.
    pub fn advance(&mut self, now: Instant) -> usize {
        let mut fired = 0;

        while let Some((at, timer)) = self.next_timer() {
            if at > now {
                break;
            }
            match timer {
                Timer::Debounce => self.evaluate(at),
                Timer::Burst => self.burst_tick(at),
                Timer::Grace => self.grace_expired(),
            }
            fired += 1;
        }

        fired
    }

    /// Cancel every timer and stop observing. Later calls are ignored.
    pub fn teardown(&mut self) {
        if self.lifecycle == Lifecycle::TornDown {
            return;
        }

        info!(
            "Scheduler torn down after {} evaluations ({} shows, {} clears)",
            self.evaluations, self.shows, self.clears
        );
        self.lifecycle = Lifecycle::TornDown;
        self.debounce_at = None;
        self.grace_at = None;
        self.burst = None;
        self.observing = false;
        self.causes.clear();
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// Whether DOM mutations currently schedule evaluations
    pub fn is_observing_dom(&self) -> bool {
        self.observing
    }

    pub fn phase(&self) -> Phase {
        match (&self.shown, self.grace_at) {
            (None, _) => Phase::Idle,
            (Some(_), None) => Phase::Matched,
            (Some(_), Some(_)) => Phase::GracePending,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn display_style(&self) -> DisplayStyle {
        self.style
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            phase: self.phase(),
            rule_id: self.shown.as_ref().map(|shown| shown.rule_id.clone()),
            rules: self.rules.len(),
            observing_dom: self.observing,
            debounce_pending: self.debounce_at.is_some(),
            burst_active: self.burst.is_some(),
            evaluations: self.evaluations,
            shows: self.shows,
            clears: self.clears,
        }
    }

    pub fn document(&self) -> &D {
        &self.doc
    }

    /// Mutable document access for the host; changes are only picked up by
    /// the next evaluation
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_parts(self) -> (D, P) {
        (self.doc, self.presenter)
    }

    fn resolve_current(&self) -> Option<ResolveResult> {
        let base = build(&self.doc);
        resolve(&self.rules, &base, &self.doc)
    }

    fn apply_match(&mut self, result: ResolveResult) {
        let unchanged = !self.stale
            && self.shown.as_ref().is_some_and(|shown| {
                shown.rule_id == result.rule.id && shown.fingerprint == result.fingerprint
            });
        if unchanged {
            trace!("Match unchanged, presenter not called");
            return;
        }

        if let Some(report) = &result.report {
            if !report.failed_extractors.is_empty() {
                debug!(
                    "Rule '{}' matched with failed extractors: {:?}",
                    result.rule.id, report.failed_extractors
                );
            }
        }

        info!("Showing rule '{}' ({})", result.rule.id, result.rule.name);
        self.presenter.show(&result.rule, &result.fingerprint, self.style);
        self.shows += 1;
        self.stale = false;
        self.shown = Some(Shown {
            rule_id: result.rule.id,
            fingerprint: result.fingerprint,
        });
    }

    /// The grace window ran out: resolve again before deciding to clear
    fn grace_expired(&mut self) {
        self.grace_at = None;
        self.evaluations += 1;

        match self.resolve_current() {
            Some(result) => {
                debug!("Match '{}' found at grace expiry", result.rule.id);
                self.apply_match(result);
            }
            None => {
                info!("No match for the whole grace window, clearing indicator");
                self.presenter.clear();
                self.clears += 1;
                self.shown = None;
                self.stale = false;
            }
        }
    }

    fn start_burst(&mut self, now: Instant) {
        if self.burst.is_some() {
            trace!("Restarting polling burst");
        }
        self.burst = Some(Burst {
            started: now,
            next_tick: now + self.timing.poll_interval,
        });
    }

    fn burst_tick(&mut self, at: Instant) {
        let Some(burst) = self.burst.as_mut() else {
            return;
        };

        if at.duration_since(burst.started) > self.timing.poll_duration {
            trace!("Polling burst finished");
            self.burst = None;
            return;
        }

        burst.next_tick = at + self.timing.poll_interval;
        self.schedule_evaluate(Trigger::Poll, at);
    }

    fn refresh_observation(&mut self) {
        let needed = self.rules.iter().any(Rule::watches_dom);
        if needed != self.observing {
            debug!("DOM observation {}", if needed { "started" } else { "stopped" });
        }
        self.observing = needed;
    }

    fn note_cause(&mut self, cause: Trigger) {
        let name = cause.as_str();
        if !self.causes.contains(&name) {
            self.causes.push(name);
        }
    }

    fn next_timer(&self) -> Option<(Instant, Timer)> {
        [
            self.debounce_at.map(|at| (at, Timer::Debounce)),
            self.burst.map(|burst| (burst.next_tick, Timer::Burst)),
            self.grace_at.map(|at| (at, Timer::Grace)),
        ]
        .into_iter()
        .flatten()
        .min_by_key(|(at, _)| *at)
    }
}
