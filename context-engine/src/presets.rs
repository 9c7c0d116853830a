//! Built-in extractor sets for well-known consoles.

use crate::rules::{Extractor, Scope};

/// AWS console: account id and assumed role name from the header
pub fn aws_extractors() -> Vec<Extractor> {
    vec![
        Extractor::DomTextRegex {
            key: "identity.accountId".to_string(),
            pattern: r"\b\d{12}\b".to_string(),
            scope: Some(Scope::Header),
            first_match_only: None,
        },
        Extractor::DomTextRegex {
            key: "identity.roleName".to_string(),
            pattern: r"role\s*[:：]\s*([A-Za-z0-9+=,.@_-]+)".to_string(),
            scope: Some(Scope::Header),
            first_match_only: None,
        },
    ]
}

/// Look up a preset by name
pub fn by_name(name: &str) -> Option<Vec<Extractor>> {
    match name {
        "aws" => Some(aws_extractors()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::HtmlDocument;
    use crate::fingerprint::{build, enrich};

    #[test]
    fn test_aws_header_identity() {
        let d = HtmlDocument::parse(
            "https://us-east-1.console.aws.amazon.com/console/home",
            r#"<header><span>role: AdminAccess</span> <span>Account 123456789012</span></header>
               <main>Other account 999999999999</main>"#,
        );
        let out = enrich(&d, &build(&d), &aws_extractors());
        assert_eq!(out.fingerprint.get_str("identity.accountId"), Some("123456789012"));
        assert_eq!(out.fingerprint.get_str("identity.roleName"), Some("AdminAccess"));
        assert!(out.report.failed_extractors.is_empty());
    }

    #[test]
    fn test_full_width_colon() {
        let d = HtmlDocument::parse(
            "https://console.aws.amazon.com/",
            "<header>Role：ReadOnly</header>",
        );
        // Pattern is case sensitive, as configured
        let out = enrich(&d, &build(&d), &aws_extractors());
        assert_eq!(out.fingerprint.get_str("identity.roleName"), None);

        let d = HtmlDocument::parse("https://console.aws.amazon.com/", "<header>role：ReadOnly</header>");
        let out = enrich(&d, &build(&d), &aws_extractors());
        assert_eq!(out.fingerprint.get_str("identity.roleName"), Some("ReadOnly"));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(by_name("aws").map(|set| set.len()), Some(2));
        assert!(by_name("gcp").is_none());
    }
}
