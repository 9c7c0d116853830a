//! Context Host - runs the context engine for one document
//!
//! The page environment reports navigation, content changes, visibility,
//! focus and rule store deltas as JSON lines on stdin. Indicator changes are
//! written as JSON lines on stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Host a document, reading events from stdin
//! context-host --url https://console.example.com/ --html page.html
//!
//! # Resolve once and print the result
//! context-host --resolve --url https://console.example.com/ --html page.html
//!
//! # Check a rules file
//! context-host --validate --rules rules.json
//! ```

mod presenter;
mod protocol;
mod store;

use context_engine::rules::rules_from_value;
use context_engine::{
    build, driver, render_label, resolve, Config, DisplayStyle, Document, HostEvent,
    HtmlDocument, Scheduler,
};
use presenter::JsonLinePresenter;
use protocol::HostMessage;
use serde_json::json;
use std::path::PathBuf;
use store::FileRuleStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// What the process should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Mode {
    #[default]
    Run,
    Resolve,
    Validate,
    InitConfig,
}

/// Command line options
#[derive(Debug, Clone, Default, PartialEq)]
struct HostArgs {
    mode: Mode,
    /// Path to config file
    config_path: Option<PathBuf>,
    /// Rules file, overriding the configured one
    rules_path: Option<PathBuf>,
    /// Initial document address
    url: Option<String>,
    /// Initial document content
    html_path: Option<PathBuf>,
    /// Display style, overriding the store and config
    style: Option<DisplayStyle>,
}

/// Parse command line arguments
fn parse_args(args: &[String]) -> HostArgs {
    let mut host_args = HostArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("Context Host v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--resolve" => {
                host_args.mode = Mode::Resolve;
            }
            "--validate" => {
                host_args.mode = Mode::Validate;
            }
            "--init-config" => {
                host_args.mode = Mode::InitConfig;
            }
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    host_args.config_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--rules" => {
                i += 1;
                if i < args.len() {
                    host_args.rules_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--url" => {
                i += 1;
                if i < args.len() {
                    host_args.url = Some(args[i].clone());
                }
            }
            "--html" => {
                i += 1;
                if i < args.len() {
                    host_args.html_path = Some(PathBuf::from(&args[i]));
                }
            }
            "--style" => {
                i += 1;
                if i < args.len() {
                    match DisplayStyle::parse(&args[i]) {
                        Some(style) => host_args.style = Some(style),
                        None => {
                            eprintln!("Unknown display style: {}", args[i]);
                            eprintln!("Expected one of: topBar, ribbon, combo");
                            std::process::exit(1);
                        }
                    }
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Use --help for usage information.");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    host_args
}

fn print_help() {
    println!(
        r#"Context Host - Page context resolution for one document

USAGE:
    context-host [OPTIONS]

OPTIONS:
    -h, --help              Show this help message
    -v, --version           Show version
    -c, --config <PATH>     Path to configuration file
    --rules <PATH>          Rules file (default: rules.json next to the config file)
    --url <URL>             Initial document address (default: about:blank)
    --html <PATH>           Initial document content
    --style <STYLE>         Display style: topBar, ribbon, combo
    --resolve               Resolve once, print the result and exit
    --validate              Validate the rules file and exit
    --init-config           Write a default configuration file and exit

PROTOCOL:
    stdin   {{"type":"navigate","kind":"push|replace|pop","url":"...","html":"..."}}
            {{"type":"mutate","html":"..."}}
            {{"type":"hashchange","url":"..."}}
            {{"type":"visibility","visible":true}}
            {{"type":"focus"}}
            {{"type":"storage","rules":[...],"displayStyle":"ribbon"}}
            {{"type":"shutdown"}}
    stdout  {{"event":"show",...}} and {{"event":"clear",...}}

ENVIRONMENT:
    RUST_LOG                Log filter (overrides general.log_level)

EXAMPLES:
    context-host --url https://console.aws.amazon.com/ --html page.html
    context-host --resolve --url https://app.example.com/ --html page.html
    context-host --validate --rules ~/rules.json
"#
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().collect();
    let args = parse_args(&argv);

    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(Config::default_config_path);
    let config = Config::load_from_path(config_path.clone());

    // Initialize logging; stdout carries the protocol
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();

    info!("Configuration loaded from {:?}", config_path);

    let rules_path = args
        .rules_path
        .clone()
        .unwrap_or_else(|| config.rules_path(&config_path));
    let store = FileRuleStore::new(rules_path);

    match args.mode {
        Mode::InitConfig => init_config(config_path),
        Mode::Validate => validate(&store),
        Mode::Resolve => resolve_once(&args, &config, &store),
        Mode::Run => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(run_host(&args, &config, &store));
            // The stdin reader blocks in a thread that cannot be cancelled
            runtime.shutdown_background();
            result
        }
    }
}

fn init_config(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        println!("Configuration already exists at {}", path.display());
        return Ok(());
    }

    Config::default().save_to_path(path.clone())?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn validate(store: &FileRuleStore) -> Result<(), Box<dyn std::error::Error>> {
    let result = store
        .raw_rules()
        .and_then(|value| rules_from_value(value).map_err(|e| e.to_string()));

    match result {
        Ok(rules) => {
            println!("{}", json!({ "valid": true, "rules": rules.len() }));
            Ok(())
        }
        Err(reason) => {
            println!("{}", json!({ "valid": false, "error": reason }));
            std::process::exit(1);
        }
    }
}

fn read_document(args: &HostArgs) -> Result<HtmlDocument, Box<dyn std::error::Error>> {
    let url = args.url.clone().unwrap_or_else(|| "about:blank".to_string());
    let html = match &args.html_path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?,
        None => String::new(),
    };

    Ok(HtmlDocument::parse(url, &html))
}

fn display_style(args: &HostArgs, config: &Config, stored: Option<DisplayStyle>) -> DisplayStyle {
    args.style
        .or(stored)
        .unwrap_or(config.display.default_style)
}

fn resolve_once(
    args: &HostArgs,
    config: &Config,
    store: &FileRuleStore,
) -> Result<(), Box<dyn std::error::Error>> {
    if args.url.is_none() {
        return Err("--resolve requires --url".into());
    }

    let doc = read_document(args)?;
    let snapshot = store.load();
    let style = display_style(args, config, snapshot.display_style);
    let base = build(&doc);

    let output = match resolve(&snapshot.rules, &base, &doc) {
        Some(result) => json!({
            "matched": true,
            "ruleId": result.rule.id,
            "label": render_label(&result.rule.display.label_template, &result.fingerprint),
            "style": style,
            "fingerprint": result.fingerprint,
            "report": result.report,
        }),
        None => json!({
            "matched": false,
            "fingerprint": base,
        }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_host(
    args: &HostArgs,
    config: &Config,
    store: &FileRuleStore,
) -> Result<(), Box<dyn std::error::Error>> {
    if !config.general.enabled {
        info!("Context markers are disabled in configuration, exiting");
        return Ok(());
    }

    let doc = read_document(args)?;
    let snapshot = store.load();
    let style = display_style(args, config, snapshot.display_style);
    info!(
        "Hosting {} with {} rules from {:?}",
        doc.href(),
        snapshot.rules.len(),
        store.path()
    );

    let mut scheduler = Scheduler::new(
        doc,
        JsonLinePresenter::new(std::io::stdout()),
        config.timing.to_timing(),
    );
    scheduler.init(snapshot.rules, style, driver::now());

    let (tx, rx) = mpsc::channel::<HostEvent>(64);

    tokio::spawn(read_stdin(tx.clone()));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            let _ = tx.send(HostEvent::Shutdown).await;
        }
    });

    let scheduler = driver::run(scheduler, rx).await;
    let status = scheduler.status();
    info!(
        "Host stopped after {} evaluations ({} shows, {} clears)",
        status.evaluations, status.shows, status.clears
    );

    Ok(())
}

/// Forward stdin messages to the driver until EOF
async fn read_stdin(tx: mpsc::Sender<HostEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match HostMessage::parse(line) {
                    Ok(message) => {
                        for event in message.into_events() {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => warn!("Ignoring malformed host message: {}", e),
                }
            }
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        }
    }

    let _ = tx.send(HostEvent::Shutdown).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> HostArgs {
        let argv: Vec<String> = std::iter::once("context-host")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect();
        parse_args(&argv)
    }

    #[test]
    fn test_defaults() {
        assert_eq!(args(&[]), HostArgs::default());
        assert_eq!(args(&[]).mode, Mode::Run);
    }

    #[test]
    fn test_resolve_options() {
        let parsed = args(&[
            "--resolve",
            "--url",
            "https://example.com/",
            "--html",
            "page.html",
            "--style",
            "ribbon",
            "-c",
            "cfg.toml",
        ]);
        assert_eq!(parsed.mode, Mode::Resolve);
        assert_eq!(parsed.url.as_deref(), Some("https://example.com/"));
        assert_eq!(parsed.html_path, Some(PathBuf::from("page.html")));
        assert_eq!(parsed.style, Some(DisplayStyle::Ribbon));
        assert_eq!(parsed.config_path, Some(PathBuf::from("cfg.toml")));
    }

    #[test]
    fn test_style_precedence() {
        let config = Config::default();
        let mut parsed = args(&[]);
        assert_eq!(display_style(&parsed, &config, None), DisplayStyle::TopBar);
        assert_eq!(
            display_style(&parsed, &config, Some(DisplayStyle::Combo)),
            DisplayStyle::Combo
        );
        parsed.style = Some(DisplayStyle::Ribbon);
        assert_eq!(
            display_style(&parsed, &config, Some(DisplayStyle::Combo)),
            DisplayStyle::Ribbon
        );
    }

    #[test]
    fn test_read_document_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<title>Console</title>").unwrap();

        let mut parsed = args(&["--url", "https://example.com/"]);
        parsed.html_path = Some(path);
        let doc = read_document(&parsed).unwrap();
        assert_eq!(build(&doc).title.as_deref(), Some("Console"));

        parsed.html_path = Some(dir.path().join("missing.html"));
        assert!(read_document(&parsed).is_err());
    }
}
