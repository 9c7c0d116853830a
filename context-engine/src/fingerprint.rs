//! Fingerprint builder and enricher.
//!
//! The builder snapshots the document identity (address, host, path, title).
//! The enricher runs a rule's extractors over a copy of that snapshot; the
//! input fingerprint is never modified.

use crate::document::Document;
use crate::extractors::run_extractor;
use crate::rules::Extractor;
use crate::types::{parse_key_path, Fingerprint, KeyPathError};
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

/// An extractor that failed during enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedExtractor {
    /// Extractor type tag (`domTextRegex`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
}

/// Debug metadata travelling alongside an enriched fingerprint.
///
/// Not part of fingerprint equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentReport {
    pub extracted_keys: Vec<String>,
    pub failed_extractors: Vec<FailedExtractor>,
}

/// Result of [`enrich`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub fingerprint: Fingerprint,
    pub report: EnrichmentReport,
}

/// Snapshot the current document identity. Never fails.
pub fn build<D: Document + ?Sized>(doc: &D) -> Fingerprint {
    let href = doc.href();

    let mut fingerprint = match Url::parse(href) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default().to_string();
            let path = url.path().to_string();
            Fingerprint::new(url.as_str(), host, path)
        }
        Err(e) => {
            debug!("Unparsable document address '{}': {}", href, e);
            Fingerprint::new(href, "", "/")
        }
    };

    fingerprint.title = doc.title();
    fingerprint
}

/// Run `extractors` over a copy of `base`.
///
/// Every extractor is attempted; failures are recorded and never abort the
/// rest. Key paths with a forbidden segment are skipped without a trace in
/// the report.
pub fn enrich<D: Document + ?Sized>(
    doc: &D,
    base: &Fingerprint,
    extractors: &[Extractor],
) -> Enrichment {
    let mut fingerprint = base.clone();
    let mut report = EnrichmentReport::default();

    for extractor in extractors {
        let key = extractor.key();

        match parse_key_path(key) {
            Ok(_) => {}
            Err(KeyPathError::Forbidden(segment)) => {
                trace!("Skipping {} extractor: segment '{}' is forbidden", extractor.kind(), segment);
                continue;
            }
            Err(e) => {
                report.failed_extractors.push(FailedExtractor {
                    kind: extractor.kind().to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        }

        match run_extractor(doc, extractor) {
            Ok(Some(value)) => match fingerprint.set_path(key, value) {
                Ok(()) => report.extracted_keys.push(key.to_string()),
                Err(e) => report.failed_extractors.push(FailedExtractor {
                    kind: extractor.kind().to_string(),
                    reason: e.to_string(),
                }),
            },
            Ok(None) => {
                trace!("{} extractor found nothing for '{}'", extractor.kind(), key);
            }
            Err(e) => {
                debug!("{} extractor failed for '{}': {}", extractor.kind(), key, e);
                report.failed_extractors.push(FailedExtractor {
                    kind: extractor.kind().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Enrichment {
        fingerprint,
        report,
    }
}
