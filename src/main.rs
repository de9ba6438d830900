//! Document Verification Tool - CLI Interface
//!
//! Command-line front end for the layered verification pipeline:
//! ingest a document, run every analysis layer, and emit the report to
//! stdout or a file. Exit code 0 means the run completed; with
//! `--fail-suspect`, a SUSPECT verdict exits 2 for automated intake.

use clap::{Arg, ArgAction, Command, ValueEnum};
use std::process;
use tracing::{error, info};
use veridoc::config::VerifierConfig;
use veridoc::pipeline::Pipeline;
use veridoc::report::{Report, ReportFormat};
use veridoc::types::Document;
use veridoc::verdict::VerdictOutcome;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages (default)
    Info,
    /// Debug and all messages
    Debug,
    /// Trace and all messages (most verbose)
    Trace,
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let quiet = matches.get_flag("quiet");
    let level = matches
        .get_one::<LogLevel>("verbose")
        .copied()
        .unwrap_or(LogLevel::Info);
    init_logging(level, quiet);

    info!("🚀 veridoc v{} starting", env!("CARGO_PKG_VERSION"));

    let input = matches.get_one::<String>("input").unwrap();
    let out_path = matches.get_one::<String>("out");
    let format = match matches.get_one::<String>("format").unwrap().parse::<ReportFormat>() {
        Ok(format) => format,
        Err(e) => {
            error!("❌ {}", e);
            process::exit(1);
        }
    };

    let mut config = if let Some(config_path) = matches.get_one::<String>("config") {
        match VerifierConfig::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                error!("❌ Failed to load config file: {}", e);
                process::exit(1);
            }
        }
    } else {
        VerifierConfig::default()
    };

    // CLI switches override the file-based configuration.
    if let Some(timeout_ms) = matches.get_one::<u64>("timeout") {
        config.stage_timeout_ms = *timeout_ms;
    }
    if matches.get_flag("assume-raster") {
        config.assume_raster = true;
    }

    let document = match Document::from_path(input).await {
        Ok(doc) => doc,
        Err(e) => {
            error!("❌ Cannot ingest {}: {}", input, e);
            process::exit(1);
        }
    };

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("❌ Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let run = match pipeline.run(&document).await {
        Ok(run) => run,
        Err(e) => {
            error!("❌ Verification run failed: {}", e);
            process::exit(1);
        }
    };

    let report = Report::from_run(&run);
    match out_path {
        Some(path) => {
            if let Err(e) = report.save(path, format).await {
                error!("❌ Failed to write report: {}", e);
                process::exit(1);
            }
            info!("📋 Report written to {}", path);
        }
        None => match report.render(format) {
            Ok(content) => println!("{content}"),
            Err(e) => {
                error!("❌ Failed to render report: {}", e);
                process::exit(1);
            }
        },
    }

    info!("🏁 Verdict: {}", run.verdict.overall);
    if matches.get_flag("fail-suspect") && run.verdict.overall == VerdictOutcome::Suspect {
        process::exit(2);
    }
}

fn build_cli() -> Command {
    Command::new("veridoc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Layered document-forensics verifier for scanned and born-digital documents")
        .long_about(
            "Runs signature, structure, visual and text analysis over one document and \
             reduces the findings to a single OK/SUSPECT verdict. Layers degrade \
             independently: a failed or skipped stage is recorded and weighed by the \
             verdict policy instead of aborting the run.",
        )
        // Input and configuration
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Document to verify")
                .required(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (JSON/YAML)"),
        )
        // Report output
        .arg(
            Arg::new("out")
                .short('o')
                .long("out")
                .value_name("FILE")
                .help("Write the report here instead of stdout"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .value_parser(["json", "text", "markdown"])
                .default_value("json")
                .help("Report output format"),
        )
        // Pipeline overrides
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64))
                .help("Per-stage timeout in milliseconds"),
        )
        .arg(
            Arg::new("assume-raster")
                .long("assume-raster")
                .action(ArgAction::SetTrue)
                .help("Force the raster route (visual stage + OCR text source)"),
        )
        .arg(
            Arg::new("fail-suspect")
                .long("fail-suspect")
                .action(ArgAction::SetTrue)
                .help("Exit with code 2 when the verdict is SUSPECT"),
        )
        // Logging
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .value_parser(clap::value_parser!(LogLevel))
                .default_value("info")
                .help("Set logging verbosity"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Suppress all output except errors"),
        )
}

fn init_logging(level: LogLevel, quiet: bool) {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter_level = if quiet {
        "error"
    } else {
        match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    };

    // Logs go to stderr so a report on stdout stays pipeable.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!("veridoc={}", filter_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}
