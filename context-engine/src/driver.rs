//! Async driver for the scheduler.
//!
//! Runs one document lifetime on the current tokio task: host events arrive
//! over an mpsc channel, scheduler deadlines are slept on with the tokio
//! clock. Documents are usually not `Send`, so the driver is awaited in place
//! (or on a `LocalSet`) rather than spawned.

use crate::document::DocumentHost;
use crate::rules::Rule;
use crate::scheduler::{Presenter, Scheduler};
use crate::types::{DisplayStyle, NavigationKind, Trigger};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Notifications from the environment hosting the document
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Route change, optionally with the content rendered for the new route
    Navigated {
        kind: NavigationKind,
        url: String,
        html: Option<String>,
    },
    /// Document content changed
    Mutated { html: String },
    /// Fragment changed
    HashChanged { url: String },
    Visibility { visible: bool },
    Focus,
    /// Validated rule set from the rule store
    RulesChanged(Vec<Rule>),
    /// Validated display style from the rule store
    DisplayStyleChanged(DisplayStyle),
    Shutdown,
}

/// Current time on the tokio clock.
///
/// Use this for every instant handed to a driven scheduler so paused test
/// time and real time agree.
pub fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}

/// Drive an initialised scheduler until shutdown.
///
/// Returns the torn-down scheduler so callers can inspect the document and
/// presenter.
pub async fn run<D, P>(
    mut scheduler: Scheduler<D, P>,
    mut events: mpsc::Receiver<HostEvent>,
) -> Scheduler<D, P>
where
    D: DocumentHost,
    P: Presenter,
{
    loop {
        let deadline = scheduler.next_deadline();

        tokio::select! {
            event = events.recv() => match event {
                Some(HostEvent::Shutdown) => {
                    info!("Shutdown requested");
                    break;
                }
                Some(event) => apply(&mut scheduler, event, now()),
                None => {
                    debug!("Host event channel closed");
                    break;
                }
            },
            _ = sleep_until(deadline) => {
                scheduler.advance(now());
            }
        }
    }

    scheduler.teardown();
    scheduler
}

/// Apply one host event to the document and scheduler
pub fn apply<D, P>(scheduler: &mut Scheduler<D, P>, event: HostEvent, now: std::time::Instant)
where
    D: DocumentHost,
    P: Presenter,
{
    match event {
        HostEvent::Navigated { kind, url, html } => {
            debug!("Navigated ({:?}) to {}", kind, url);
            let doc = scheduler.document_mut();
            doc.navigate(&url);
            if let Some(html) = html {
                doc.replace_html(&html);
            }
            scheduler.trigger(Trigger::Navigation(kind), now);
        }
        HostEvent::Mutated { html } => {
            scheduler.document_mut().replace_html(&html);
            scheduler.trigger(Trigger::Mutation, now);
        }
        HostEvent::HashChanged { url } => {
            scheduler.document_mut().navigate(&url);
            scheduler.trigger(Trigger::HashChange, now);
        }
        HostEvent::Visibility { visible } => {
            scheduler.trigger(Trigger::Visibility { visible }, now);
        }
        HostEvent::Focus => scheduler.trigger(Trigger::Focus, now),
        HostEvent::RulesChanged(rules) => scheduler.update_rules(rules, now),
        HostEvent::DisplayStyleChanged(style) => scheduler.update_display_style(style, now),
        HostEvent::Shutdown => scheduler.teardown(),
    }
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}
