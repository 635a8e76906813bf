//! CLI entry point for the pedestrian counts API.
//!
//! Provides subcommands for serving the HTTP API and for running single
//! queries against the dataset from the command line.

use anyhow::Result;
use clap::{Parser, Subcommand};
use pedestrian_counts::config::{DataArgs, ServeArgs};
use pedestrian_counts::output::{append_records, print_json, print_pretty};
use pedestrian_counts::{api, query::QueryEngine};
use std::ffi::OsStr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "pedestrian_counts")]
#[command(about = "Read-only API over pedestrian counts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the dataset and serve the HTTP API
    Serve(ServeArgs),
    /// Log dataset statistics, time range, locations and weather conditions
    Inspect(DataArgs),
    /// Sum count columns per day, week, month, quarter or year
    Aggregate {
        #[command(flatten)]
        data: DataArgs,

        /// One of day, week, month, quarter, year
        #[arg(short, long)]
        granularity: String,

        /// Only aggregate this location
        #[arg(short, long)]
        location: Option<String>,

        /// CSV file to append results to (logged as JSON when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Log the monthly child/adult share report
    Focus(DataArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/pedestrian_counts.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("pedestrian_counts.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

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

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            print_pretty(&args);
            let engine = args.build_engine();
            if engine.dataset().is_empty() {
                info!("Serving in degraded mode: metadata endpoints will answer 503");
            }
            api::serve(engine, args.bind).await?;
        }
        Commands::Inspect(data) => {
            let engine = QueryEngine::new(data.load_store().handle());
            print_json(&engine.stats()?)?;
            print_json(&engine.time_range()?)?;
            print_json(&engine.locations()?)?;
            print_json(&engine.weather_conditions()?)?;
        }
        Commands::Aggregate {
            data,
            granularity,
            location,
            output,
        } => {
            let engine = QueryEngine::new(data.load_store().handle());
            let series = engine.aggregate(&granularity, location.as_deref())?;
            let records = series.to_records();
            match output {
                Some(path) => {
                    append_records(&path, &records)?;
                    info!(path = %path, buckets = records.len(), "Aggregation written");
                }
                None => print_json(&records)?,
            }
        }
        Commands::Focus(data) => {
            let engine = QueryEngine::new(data.load_store().handle());
            print_json(&engine.focus_report())?;
        }
    }

    Ok(())
}
