//! End-to-end scenarios: rules JSON in, presenter calls out.

use context_engine::document::DocumentHost;
use context_engine::{
    build, parse_rules, presets, render_label, resolve, DisplayStyle, Fingerprint, HtmlDocument,
    NavigationKind, Phase, Presenter, Rule, Scheduler, TimingConfig, Trigger,
};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

#[derive(Default)]
struct LabelPresenter {
    shown: Vec<String>,
    clears: usize,
}

impl Presenter for LabelPresenter {
    fn show(&mut self, rule: &Rule, fingerprint: &Fingerprint, _style: DisplayStyle) {
        self.shown
            .push(render_label(&rule.display.label_template, fingerprint));
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

const TWO_URL_RULES: &str = r##"[
    {"id": "a", "name": "A", "enabled": true, "priority": 10,
     "target": {"urlPattern": "https://app.example.com/*"},
     "detection": {"mode": "urlOnly"},
     "display": {"labelTemplate": "A", "color": "#111", "position": "topLeft"}},
    {"id": "b", "name": "B", "enabled": true, "priority": 200,
     "target": {"urlPattern": "https://app.example.com/*"},
     "detection": {"mode": "urlOnly"},
     "display": {"labelTemplate": "B", "color": "#222", "position": "topLeft"}}
]"##;

const ENV_RULE: &str = r##"[
    {"id": "prod", "name": "Production", "enabled": true, "priority": 100,
     "target": {"host": "example.com"},
     "detection": {
        "mode": "signals",
        "extractors": [{"type": "selectorText", "key": "env", "selector": "#env"}],
        "match": [{"op": "eq", "key": "env", "value": "production"}]
     },
     "display": {"labelTemplate": "ENV: {{env}}", "color": "#ff0000", "position": "topRight"}}
]"##;

#[test]
fn test_higher_priority_url_rule_wins() {
    let rules = parse_rules(TWO_URL_RULES).unwrap();
    let doc = HtmlDocument::blank("https://app.example.com/dashboard");
    let result = resolve(&rules, &build(&doc), &doc).unwrap();
    assert_eq!(result.rule.id, "b");
}

#[test]
fn test_env_text_change_flips_resolution() {
    let rules = parse_rules(ENV_RULE).unwrap();
    let mut doc = HtmlDocument::parse(
        "https://sub.example.com/app",
        r#"<div id="env">production</div>"#,
    );

    let result = resolve(&rules, &build(&doc), &doc).unwrap();
    assert_eq!(result.rule.id, "prod");
    assert_eq!(result.fingerprint.get_str("env"), Some("production"));

    doc.replace_html(r#"<div id="env">staging</div>"#);
    assert!(resolve(&rules, &build(&doc), &doc).is_none());
}

#[test]
fn test_evaluate_twice_presents_once() {
    let t0 = Instant::now();
    let doc = HtmlDocument::parse("https://example.com/", r#"<div id="env">production</div>"#);
    let mut scheduler = Scheduler::new(doc, LabelPresenter::default(), TimingConfig::default());
    scheduler.init(parse_rules(ENV_RULE).unwrap(), DisplayStyle::TopBar, t0);
    scheduler.evaluate(t0 + ms(1));
    scheduler.evaluate(t0 + ms(2));

    assert_eq!(scheduler.presenter().shown, vec!["ENV: production".to_string()]);
    assert_eq!(scheduler.presenter().clears, 0);
}

#[test]
fn test_indicator_survives_brief_content_loss() {
    let t0 = Instant::now();
    let doc = HtmlDocument::parse("https://example.com/", r#"<div id="env">production</div>"#);
    let mut scheduler = Scheduler::new(doc, LabelPresenter::default(), TimingConfig::default());
    scheduler.init(parse_rules(ENV_RULE).unwrap(), DisplayStyle::TopBar, t0);

    // Content disappears while the page re-renders
    scheduler.document_mut().replace_html("<div>loading</div>");
    scheduler.trigger(Trigger::Mutation, t0 + ms(100));
    scheduler.advance(t0 + ms(3000));
    assert_eq!(scheduler.phase(), Phase::GracePending);
    assert_eq!(scheduler.presenter().clears, 0);

    // And comes back inside the window
    scheduler
        .document_mut()
        .replace_html(r#"<div id="env">production</div>"#);
    scheduler.trigger(Trigger::Mutation, t0 + ms(3500));
    scheduler.advance(t0 + ms(20_000));

    assert_eq!(scheduler.presenter().clears, 0);
    assert_eq!(scheduler.presenter().shown.len(), 1);
    assert_eq!(scheduler.phase(), Phase::Matched);
}

#[test]
fn test_indicator_cleared_after_full_grace_window() {
    let t0 = Instant::now();
    let doc = HtmlDocument::parse("https://example.com/", r#"<div id="env">production</div>"#);
    let mut scheduler = Scheduler::new(doc, LabelPresenter::default(), TimingConfig::default());
    scheduler.init(parse_rules(ENV_RULE).unwrap(), DisplayStyle::TopBar, t0);

    scheduler.document_mut().replace_html("<div>gone</div>");
    scheduler.trigger(Trigger::Mutation, t0);
    scheduler.advance(t0 + ms(4299));
    assert_eq!(scheduler.presenter().clears, 0);
    scheduler.advance(t0 + ms(4300));
    assert_eq!(scheduler.presenter().clears, 1);
    assert_eq!(scheduler.phase(), Phase::Idle);
}

#[test]
fn test_spa_navigation_to_other_account() {
    let mut extractors = serde_json::to_value(presets::aws_extractors()).unwrap();
    let rules: Vec<Rule> = serde_json::from_value(serde_json::json!([{
        "id": "aws-prod", "name": "AWS production", "enabled": true, "priority": 50,
        "target": {"host": "aws.amazon.com"},
        "detection": {
            "mode": "signals",
            "extractors": extractors.take(),
            "match": [{"op": "in", "key": "identity.accountId", "values": ["111122223333"]}]
        },
        "display": {
            "labelTemplate": "{{identity.roleName}} @ {{identity.accountId}}",
            "color": "#d13212",
            "position": "headerBar"
        }
    }]))
    .unwrap();

    let t0 = Instant::now();
    let doc = HtmlDocument::parse(
        "https://console.aws.amazon.com/ec2/home",
        "<header>role: Admin 111122223333</header>",
    );
    let mut scheduler = Scheduler::new(doc, LabelPresenter::default(), TimingConfig::default());
    scheduler.init(rules, DisplayStyle::Combo, t0);
    assert_eq!(
        scheduler.presenter().shown,
        vec!["Admin @ 111122223333".to_string()]
    );

    // Account switch through client-side routing; the header renders late
    scheduler
        .document_mut()
        .navigate("https://console.aws.amazon.com/iam/home");
    scheduler.trigger(Trigger::Navigation(NavigationKind::Push), t0 + ms(10));
    scheduler
        .document_mut()
        .replace_html("<header>role: Admin 444455556666</header>");
    scheduler.advance(t0 + ms(10_000));

    assert_eq!(scheduler.presenter().clears, 1);
    assert_eq!(scheduler.phase(), Phase::Idle);
}
