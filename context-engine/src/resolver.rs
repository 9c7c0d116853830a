//! Rule resolution.
//!
//! Picks the single highest-priority enabled rule whose target and
//! detection conditions hold for the current page. Target checks run
//! before any extraction; `urlOnly` rules never touch the document.

use crate::document::Document;
use crate::fingerprint::{enrich, EnrichmentReport};
use crate::rules::{DetectionMode, MatchExpr, Rule, Target};
use crate::types::Fingerprint;
use regex::Regex;
use tracing::{trace, warn};

/// A matched rule with the fingerprint state that satisfied it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveResult {
    pub rule: Rule,
    /// Base fingerprint for `urlOnly` rules, enriched for `signals` rules
    pub fingerprint: Fingerprint,
    /// Enrichment metadata, present for `signals` rules
    pub report: Option<EnrichmentReport>,
}

/// Resolve the winning rule for `base`.
///
/// Candidates are the enabled rules ordered by descending priority. The sort
/// is stable, so equal priorities keep their input order and the earlier
/// rule wins. `None` is the normal "nothing applies" outcome.
pub fn resolve<D: Document + ?Sized>(
    rules: &[Rule],
    base: &Fingerprint,
    doc: &D,
) -> Option<ResolveResult> {
    let mut candidates: Vec<&Rule> = rules.iter().filter(|rule| rule.enabled).collect();
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

    for rule in candidates {
        if !matches_target(&rule.target, base) {
            continue;
        }

        match rule.detection.mode {
            DetectionMode::UrlOnly => {
                trace!("Rule '{}' matched on target alone", rule.id);
                return Some(ResolveResult {
                    rule: rule.clone(),
                    fingerprint: base.clone(),
                    report: None,
                });
            }
            DetectionMode::Signals => {
                let enrichment = enrich(doc, base, &rule.detection.extractors);

                let satisfied = rule
                    .detection
                    .match_exprs
                    .iter()
                    .all(|expr| evaluate_match(expr, &enrichment.fingerprint));

                if satisfied {
                    trace!(
                        "Rule '{}' matched with keys {:?}",
                        rule.id,
                        enrichment.report.extracted_keys
                    );
                    return Some(ResolveResult {
                        rule: rule.clone(),
                        fingerprint: enrichment.fingerprint,
                        report: Some(enrichment.report),
                    });
                }

                trace!("Rule '{}' signals did not match", rule.id);
            }
        }
    }

    None
}

/// Host and URL conditions. Both must pass when both are configured.
pub fn matches_target(target: &Target, fingerprint: &Fingerprint) -> bool {
    if !target.is_configured() {
        return false;
    }

    if let Some(hosts) = target.host() {
        if !hosts
            .hosts()
            .iter()
            .any(|host| host_matches(host, &fingerprint.host))
        {
            return false;
        }
    }

    if let Some(pattern) = target.url_pattern() {
        if !glob_matches(pattern, &fingerprint.url) {
            return false;
        }
    }

    true
}

/// Exact host or a subdomain of it (`sub.example.com` for `example.com`,
/// never `notexample.com`)
pub fn host_matches(target: &str, host: &str) -> bool {
    host == target
        || host
            .strip_suffix(target)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Translate a URL glob into an anchored regex.
///
/// `*` is the only wildcard; every other character matches literally.
pub fn glob_to_regex(pattern: &str) -> String {
    let literal_parts: Vec<String> = pattern.split('*').map(regex::escape).collect();
    format!("^{}$", literal_parts.join(".*"))
}

/// Whether `text` matches the whole glob `pattern`
pub fn glob_matches(pattern: &str, text: &str) -> bool {
    match Regex::new(&glob_to_regex(pattern)) {
        Ok(regex) => regex.is_match(text),
        Err(e) => {
            warn!("URL pattern '{}' could not be compiled: {}", pattern, e);
            false
        }
    }
}

/// Evaluate one match expression. Missing or non-text values fail closed.
pub fn evaluate_match(expr: &MatchExpr, fingerprint: &Fingerprint) -> bool {
    let value = fingerprint.get_str(expr.key());

    match expr {
        MatchExpr::Exists { .. } => value.is_some(),
        MatchExpr::Eq { value: expected, .. } => value == Some(expected.as_str()),
        MatchExpr::Regex { pattern, .. } => {
            let Some(value) = value else {
                return false;
            };
            match Regex::new(pattern) {
                Ok(regex) => regex.is_match(value),
                Err(e) => {
                    warn!("Match pattern '{}' could not be compiled: {}", pattern, e);
                    false
                }
            }
        }
        MatchExpr::In { values, .. } => {
            value.is_some_and(|value| values.iter().any(|candidate| candidate == value))
        }
    }
}
