//! CLI entry point for the density report tool.
//!
//! Reads a dimension sheet and a weight sheet, derives per-model volume and
//! volume-per-gram, and prints the sorted report. Running without a
//! subcommand behaves like `report` with every default.

use anyhow::Result;
use clap::{Parser, Subcommand};
use density_report::order::ReferenceOrder;
use density_report::output::{OutputFormat, emit, render};
use density_report::parser::{ParseKind, parse_source};
use density_report::pipeline::{collect, ordered_records};
use density_report::record::Accumulator;
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "density_report")]
#[command(about = "Build a volume-per-gram report from product spec sheets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the dimension and weight sheets into a sorted report
    Report(ReportArgs),
    /// Parse a single sheet and log its raw entries
    Parse {
        /// Sheet kind: "dims" or "weight"
        #[arg(value_name = "KIND")]
        kind: String,

        /// Path to file or URL to fetch
        #[arg(value_name = "FILE_OR_URL")]
        source: String,
    },
}

#[derive(clap::Args)]
struct ReportArgs {
    /// Dimension sheet (path or URL)
    #[arg(short, long, default_value = "dims.csv")]
    dims: String,

    /// Weight sheet (path or URL)
    #[arg(short, long, default_value = "weight.csv")]
    weights: String,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// JSON array of model names overriding the built-in order
    #[arg(long)]
    order: Option<String>,

    /// Prefix CSV output with a header row
    #[arg(long, default_value_t = false)]
    header: bool,

    /// Gzip compress the output file
    #[arg(long, default_value_t = false, requires = "output")]
    gzip: bool,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            dims: "dims.csv".to_string(),
            weights: "weight.csv".to_string(),
            output: None,
            format: OutputFormat::Csv,
            order: None,
            header: false,
            gzip: false,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing()?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Report(ReportArgs::default())) {
        Commands::Report(args) => report(args).await?,
        Commands::Parse { kind, source } => {
            let kind: ParseKind = kind.parse()?;
            let mut acc = Accumulator::new();
            let entries = parse_source(&source, kind, &mut acc).await?;

            for entry in &entries {
                info!(%entry, "Entry");
            }
            info!(
                entries = entries.len(),
                models = acc.len(),
                "Parse summary"
            );
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// stdout is left to the report itself.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/density_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("density_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Runs the full batch and emits the report only once both sheets parsed.
#[tracing::instrument(skip(args), fields(dims = %args.dims, weights = %args.weights))]
async fn report(args: ReportArgs) -> Result<()> {
    let order = match &args.order {
        Some(path) => ReferenceOrder::load(path)?,
        None => ReferenceOrder::default(),
    };
    info!(known_models = order.len(), "Reference order ready");

    let acc = collect(&args.dims, &args.weights).await?;
    let records = ordered_records(acc, &order);

    let unknown = records
        .iter()
        .filter(|r| order.rank(&r.model).is_none())
        .count();
    if unknown > 0 {
        info!(unknown, "Models outside the reference order placed last");
    }

    let rendered = render(&records, args.format, args.header)?;
    emit(&rendered, args.output.as_deref(), args.gzip)?;

    info!(
        rows = records.len(),
        destination = args.output.as_deref().unwrap_or("stdout"),
        "Report complete"
    );
    Ok(())
}
