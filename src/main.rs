//! `retail-etl`: load the retail star schema.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use retail_etl::cleaning::DatasetKind;
use retail_etl::config::{CredentialScope, CredentialStore, CredentialsProvider, PipelineConfig};
use retail_etl::extraction::{
    Extractor, ReqwestHttpClient, S3Storage, SqliteTableSource, TableSource, UnavailableTables,
};
use retail_etl::logging::{LogConfig, LogFormat, init_logging};
use retail_etl::pipeline::{FailurePolicy, Pipeline, standard_jobs};
use retail_etl::sink::SqliteWarehouse;

#[derive(Parser)]
#[command(
    name = "retail-etl",
    version,
    about = "Extract, clean and load retail sales data into a star-schema warehouse"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipelines and print a per-dataset summary.
    Run(RunArgs),

    /// List the tables of the source database.
    Tables {
        /// Credentials file (YAML, one section per source).
        #[arg(long, value_name = "FILE")]
        credentials: PathBuf,
    },
}

#[derive(Parser)]
struct RunArgs {
    /// Pipeline configuration (YAML). Defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Credentials file (YAML, one section per source).
    #[arg(long, value_name = "FILE")]
    credentials: PathBuf,

    /// Only load these datasets (kind or table name); repeatable.
    #[arg(long = "only", value_name = "DATASET")]
    only: Vec<DatasetKind>,

    /// Stop at the first failed dataset.
    #[arg(long = "fail-fast")]
    fail_fast: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        })
        .with_ansi(io::stderr().is_terminal())
        .with_log_file(cli.log_file.clone());
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Run(args) => run(&args),
        Command::Tables { credentials } => list_tables(&credentials).map(|()| true),
    };
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every selected dataset loaded.
fn run(args: &RunArgs) -> Result<bool> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if args.fail_fast {
        config.failure_policy = FailurePolicy::Abort;
    }
    let credentials = CredentialStore::load(&args.credentials)?;

    let tables: Box<dyn TableSource> =
        match SqliteTableSource::from_credentials(&credentials.credentials(CredentialScope::Rds)) {
            Ok(source) => Box::new(source),
            Err(error) => {
                tracing::warn!(%error, "relational store unavailable");
                Box::new(UnavailableTables {
                    reason: error.to_string(),
                })
            }
        };
    let http = ReqwestHttpClient::new().context("building http client")?;
    let objects =
        S3Storage::from_credentials(&credentials.credentials(CredentialScope::ObjectStore))
            .context("configuring object storage")?;
    let mut warehouse =
        SqliteWarehouse::from_credentials(&credentials.credentials(CredentialScope::Warehouse))
            .context("opening warehouse")?;

    let jobs: Vec<_> = standard_jobs(&config)
        .into_iter()
        .filter(|job| args.only.is_empty() || args.only.contains(&job.kind))
        .collect();

    let extractor = Extractor {
        tables: tables.as_ref(),
        http: &http,
        objects: &objects,
        credentials: &credentials,
    };
    let summary = Pipeline::new(extractor, &mut warehouse)
        .with_policy(config.failure_policy)
        .run(&jobs);

    print!("{summary}");
    Ok(!summary.has_failures())
}

fn list_tables(credentials: &Path) -> Result<()> {
    let store = CredentialStore::load(credentials)?;
    let source = SqliteTableSource::from_credentials(&store.credentials(CredentialScope::Rds))
        .context("opening source database")?;
    for table in source.list_tables()? {
        println!("{table}");
    }
    Ok(())
}
