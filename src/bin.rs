//! Binary entry point for `symptom-predictor`.
//!
//! This module provides the command-line interface with options for the
//! configuration file path, a few common overrides, and logging verbosity. It
//! initializes tracing and starts the service.

use std::path::PathBuf;

use clap::Parser;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use symptom_predictor::prelude::{Config, ConfigOverrides, Void};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Symptom-predictor – ranked disease predictions from free-text symptoms.
///
/// Configuration can come from `config.toml` or `SYMPTOM_PREDICTOR_*` environment
/// variables. The model directory and the specialty mapping must exist, or the
/// service refuses to start.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the service will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the pretrained model directory.
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
    /// Override the port to listen on.
    #[arg(short, long)]
    port: Option<u16>,
    /// Export spans over OTLP/HTTP in addition to stdout.
    #[arg(long)]
    otlp: bool,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Main entry point for the symptom-predictor binary.
///
/// Sets up logging based on verbosity, loads configuration, and starts the server.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    // Construct the level filter.

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stdout = tracing_subscriber::fmt::layer()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    // Prepare the otlp layer.

    let otel = if args.otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("symptom-predictor");

        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    // Load the configuration and apply overrides.

    let overrides = ConfigOverrides {
        model_dir: args.model_dir,
        port: args.port,
    };
    let config = Config::load(args.config.as_deref(), &overrides)?;

    symptom_predictor::start(config).await
}
