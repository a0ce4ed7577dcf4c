// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! tracekit command-line entry point.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;

use tracekit::config::{self, CliOptions, ResolvedConfig};
use tracekit::logging::{init_logging, LoggingConfig};
use tracekit::report::{
    EventKind, EventRecord, EventSink, JsonLinesSink, Level, LifecycleEvent, Telemetry,
};
use tracekit::trace::{ManualClock, TraceHeaders};
use tracekit::{SinkError, Value, VERSION};

/// tracekit - trace context, safe metadata and bounded timers.
#[derive(Parser)]
#[command(name = "tracekit")]
#[command(author, version, about = "Trace context and metadata sanitization toolkit", long_about = None)]
struct Cli {
    /// Show debug output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Directory holding the global config.json (defaults to ~/.tracekit)
    #[arg(long, global = true, env = "TRACEKIT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for tracekit.
#[derive(Subcommand)]
enum Commands {
    /// Sanitize JSON from a file or stdin
    Sanitize {
        /// Input file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Maximum nesting depth
        #[arg(short, long)]
        depth: Option<usize>,

        /// Extra key to strip (repeatable)
        #[arg(short, long = "redact")]
        redact: Vec<String>,
    },

    /// Run a scripted session and print its records and stats
    Demo {
        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Print a fresh trace header pair
    Headers,

    /// Show the resolved configuration
    Config {
        /// Write an example .tracekit.json in the current directory
        #[arg(long)]
        init: bool,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::development().with_filter("tracekit=debug")
    } else {
        LoggingConfig::production()
    };
    let _guard = init_logging(&logging)?;

    handle_command(cli.command, cli.config_dir.as_deref())
}

fn handle_command(command: Commands, config_dir: Option<&Path>) -> anyhow::Result<()> {
    match command {
        Commands::Sanitize {
            file,
            depth,
            redact,
        } => {
            let cli_options = CliOptions {
                sanitize_depth: depth,
                redact_keys: redact,
                ..Default::default()
            };
            let config = load(config_dir, cli_options)?;
            run_sanitize(&config, file.as_deref())?;
        }
        Commands::Demo { json } => {
            let config = load(config_dir, CliOptions::default())?;
            run_demo(&config, json)?;
        }
        Commands::Headers => {
            let telemetry = Telemetry::new(Arc::new(tracekit::report::NoopSink));
            telemetry.start_span("outbound");
            print_headers(&telemetry.trace_headers());
        }
        Commands::Config { init } => {
            let workspace_root = std::env::current_dir()?;
            if init {
                let path = config::init_config(&workspace_root, None)?;
                println!("Created config file: {}", path.display());
            } else {
                let config = load(config_dir, CliOptions::default())?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
        Commands::Version => {
            println!("tracekit {}", VERSION);
        }
    }
    Ok(())
}

fn load(config_dir: Option<&Path>, cli_options: CliOptions) -> anyhow::Result<ResolvedConfig> {
    let workspace_root = std::env::current_dir()?;
    let root = config::find_workspace_root(&workspace_root).unwrap_or(workspace_root);
    let config = match config_dir {
        Some(dir) => config::load_config_with_global_dir(&root, dir, cli_options)?,
        None => config::load_config(&root, cli_options)?,
    };
    Ok(config)
}

fn run_sanitize(config: &ResolvedConfig, file: Option<&Path>) -> anyhow::Result<()> {
    let input = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let json: serde_json::Value = serde_json::from_str(&input)?;
    let sanitized = config.sanitizer()?.sanitize(&Value::from(json));
    println!("{}", serde_json::to_string_pretty(&sanitized)?);
    Ok(())
}

/// A scripted session: nested spans, a timed step, an orphaned timer, a
/// failing operation and a background transition with a span left open.
fn run_demo(config: &ResolvedConfig, json: bool) -> anyhow::Result<()> {
    let sink: Arc<dyn EventSink> = if json {
        Arc::new(JsonLinesSink::stdout())
    } else {
        Arc::new(|record: EventRecord| -> Result<(), SinkError> {
            print_record(&record);
            Ok(())
        })
    };

    let clock = Arc::new(ManualClock::new());
    let telemetry = Telemetry::builder(sink)
        .with_sanitizer(config.sanitizer()?)
        .with_limits(config.trace_limits())
        .with_console_echo(config.console_echo())
        .with_clock(clock.clone())
        .build();

    telemetry.start_span("app_launch");
    {
        let _checkout = telemetry.span("checkout");

        telemetry.start_timer("render_cart");
        clock.advance(Duration::from_millis(120));
        let cart = Value::map([("items", Value::from(3)), ("token", Value::from("tok_live_123"))]);
        cart.insert("self", cart.clone());
        telemetry.end_timer("render_cart", Some("checkout"), Some(&cart));

        let _ = telemetry.with_trace("payment", || -> Result<(), std::io::Error> {
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "payment gateway unreachable",
            ))
        });

        let declined = Value::map([
            ("message", Value::from("Card declined")),
            ("code", Value::from("card_declined")),
        ]);
        telemetry.report_error(declined, Some("checkout"), None);
    }

    telemetry.start_timer("upload_receipt");
    clock.advance(config.timer_ttl() + Duration::from_millis(1));
    telemetry.sweep_expired();

    telemetry.report_info("receipt shown", Some("checkout"), None);
    telemetry.on_lifecycle(LifecycleEvent::Background);

    println!();
    println!("{}", telemetry.stats().format_report());
    Ok(())
}

fn print_record(record: &EventRecord) {
    let level = match record.level {
        Level::Error => "ERROR".red().bold(),
        Level::Warning => "WARN ".yellow().bold(),
        Level::Info => "INFO ".green().bold(),
    };
    let kind = match record.kind {
        EventKind::Diagnostic => format!("[{}]", record.kind).magenta(),
        _ => format!("[{}]", record.kind).dimmed(),
    };
    println!(
        "{} {} {} {}",
        level,
        kind,
        record.message,
        format!("trace={} spans={}", record.trace_id.short(), record.span_chain.join(" > ")).dimmed()
    );
    if let Some(metadata) = &record.metadata {
        println!("      {}", metadata.to_json().to_string().dimmed());
    }
}

fn print_headers(headers: &TraceHeaders) {
    for (name, value) in headers.to_pairs() {
        println!("{}: {}", name.cyan(), value);
    }
}
