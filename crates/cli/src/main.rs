use crate::{error::CliError, output::OutcomeWriter};
use clap::Parser;
use commands::Commands;
use connectors::{bulk::polling::PollingBulkRuntime, file::csv::transport::CsvLogTransport};
use engine_core::{
    counters::ReturnValues, drain::drain, reader::ResultReader, settings::ReaderSettings,
};
use model::schema::Schema;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(
    name = "bulk-reader",
    version = "0.1.0",
    about = "Drains the per-row results of a bulk job"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Log filter, e.g. \"debug\" or \"engine_core=trace\" (overrides RUST_LOG)"
    )]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;

    match cli.command {
        Commands::Drain {
            settings,
            schema,
            results,
            accepted,
            rejected,
        } => {
            let values = run_drain(
                &settings,
                &schema,
                &results,
                accepted.as_deref(),
                rejected.as_deref(),
            )
            .await?;

            let json = serde_json::to_string_pretty(&values)?;
            println!("{json}");
        }
    }

    Ok(())
}

fn init_tracing(log_level: Option<&str>) -> Result<(), CliError> {
    let filter = match log_level {
        Some(level) => {
            EnvFilter::try_new(level).map_err(|_| CliError::InvalidLogLevel(level.to_string()))?
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    // stdout carries the report; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn load_json<T: DeserializeOwned>(path: &str) -> Result<T, CliError> {
    let source = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&source).map_err(|source| CliError::ConfigDeserialize {
        file: path.to_string(),
        source,
    })
}

async fn run_drain(
    settings_path: &str,
    schema_path: &str,
    results_dir: &str,
    accepted: Option<&str>,
    rejected: Option<&str>,
) -> Result<ReturnValues, CliError> {
    let settings: ReaderSettings = load_json(settings_path).await?;
    let schema: Schema = load_json(schema_path).await?;

    info!(
        "Draining {} results for '{}' from {}",
        settings.job.action, settings.job.module, results_dir
    );

    let runtime = PollingBulkRuntime::new(CsvLogTransport::new(results_dir));
    let mut reader = ResultReader::new(runtime, settings, Arc::new(schema));
    let mut writer = OutcomeWriter::create(accepted, rejected)?;

    let values = drain(&mut reader, |outcome| writer.write(outcome)).await?;
    writer.finish()?;

    info!(
        "Done: total={}, success={}, reject={}",
        values.total, values.success, values.reject
    );
    Ok(values)
}
