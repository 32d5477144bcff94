use std::{
    io,
    path::{Path, PathBuf},
    process,
};

use approach_chart::{
    settings::SettingsError, Chart, ChartError, ChartSettings, JsonSource,
};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "approach-chart")]
#[command(about = "Generate ILS/LOC approach charts as SVG", long_about = None)]
struct Args {
    /// Directory holding one `<AIRPORT>.json` procedure export per airport
    #[arg(long, global = true, default_value = "data")]
    data: PathBuf,

    /// Directory the chart is written to
    #[arg(long, global = true, default_value = ".")]
    output: PathBuf,

    /// JSON file overriding the default chart settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one approach procedure
    Generate {
        /// ICAO airport identifier, e.g. KXYZ
        airport: String,
        /// Approach identifier, e.g. I28R
        approach: String,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Chart(#[from] ChartError),
}

fn settings(config: Option<&Path>) -> Result<ChartSettings, SettingsError> {
    config.map_or_else(|| Ok(ChartSettings::default()), ChartSettings::from_file)
}

fn run(args: &Args) -> Result<PathBuf, CliError> {
    let settings = settings(args.config.as_deref())?;
    let source = JsonSource::new(args.data.clone());
    match &args.command {
        Command::Generate { airport, approach } => Ok(Chart::generate_to_file(
            &source,
            airport,
            approach,
            &settings,
            &args.output,
        )?),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {err}");
        }
        process::exit(1);
    }
}
