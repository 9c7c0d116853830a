//! Presenter that reports indicator changes as JSON lines.

use crate::protocol::PresenterEvent;
use chrono::Utc;
use context_engine::{render_label, titled, DisplayStyle, Fingerprint, Presenter, Rule};
use std::io::Write;
use tracing::{debug, warn};

pub struct JsonLinePresenter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinePresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn emit(&mut self, event: &PresenterEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize presenter event: {}", e);
                return;
            }
        };

        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("Failed to write presenter event: {}", e);
        }
    }
}

impl<W: Write> Presenter for JsonLinePresenter<W> {
    fn show(&mut self, rule: &Rule, fingerprint: &Fingerprint, style: DisplayStyle) {
        let label = render_label(&rule.display.label_template, fingerprint);
        debug!("Presenting '{}' for rule '{}'", label, rule.id);

        let title = fingerprint
            .title
            .as_deref()
            .filter(|_| rule.display.extras.is_some())
            .map(|title| titled(title, rule.display.extras.as_ref()));

        self.emit(&PresenterEvent::Show {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            label,
            color: rule.display.color.clone(),
            position: rule.display.position,
            opacity: rule.display.opacity,
            title,
            style,
            at: Utc::now(),
        });
    }

    fn clear(&mut self) {
        self.emit(&PresenterEvent::Clear { at: Utc::now() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_engine::parse_rules;
    use pretty_assertions::assert_eq;

    fn rule() -> Rule {
        parse_rules(
            r##"[{"id":"prod","name":"Production","enabled":true,"priority":1,
                "target":{"host":"example.com"},"detection":{"mode":"urlOnly"},
                "display":{"labelTemplate":"ENV {{env}}","color":"#f00","position":"headerBar",
                           "opacity":0.8,"extras":{"titlePrefix":"[PROD] "}}}]"##,
        )
        .unwrap()
        .remove(0)
    }

    fn lines(buf: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_show_and_clear_lines() {
        let mut fp = Fingerprint::new("https://example.com/", "example.com", "/").with_title("Home");
        fp.set_path("env", "production").unwrap();

        let mut buf = Vec::new();
        let mut presenter = JsonLinePresenter::new(&mut buf);
        presenter.show(&rule(), &fp, DisplayStyle::Ribbon);
        presenter.clear();

        let out = lines(buf);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["event"], "show");
        assert_eq!(out[0]["ruleId"], "prod");
        assert_eq!(out[0]["label"], "ENV production");
        assert_eq!(out[0]["position"], "headerBar");
        assert_eq!(out[0]["style"], "ribbon");
        assert_eq!(out[0]["title"], "[PROD] Home");
        assert_eq!(out[1]["event"], "clear");
    }

    #[test]
    fn test_show_without_title_omits_it() {
        let fp = Fingerprint::new("https://example.com/", "example.com", "/");
        let mut buf = Vec::new();
        let mut presenter = JsonLinePresenter::new(&mut buf);
        presenter.show(&rule(), &fp, DisplayStyle::TopBar);

        let out = lines(buf);
        assert!(out[0].get("title").is_none());
        assert_eq!(out[0]["label"], "ENV ");
    }
}
