//! Binary entry point for the rowbase command loop.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;

use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use rowbase::cli::{Repl, ReportFormat};
use rowbase::primitives::pager::PagerOptions;
use rowbase::{Table, TableOptions};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use config::CliConfig;

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser, Debug)]
#[command(
    name = "rowbase",
    version,
    about = "Interactive shell over a single rowbase table file"
)]
struct Cli {
    #[arg(value_name = "DB", help = "Table file to open; created when missing")]
    db_path: Option<PathBuf>,

    #[arg(
        long,
        env = "ROWBASE_CONFIG",
        value_name = "PATH",
        help = "Config file (defaults to <config dir>/rowbase/config.toml)"
    )]
    config: Option<PathBuf>,

    #[arg(long, help = "Override pager capacity (pages)")]
    max_pages: Option<u32>,

    #[arg(
        long,
        value_name = "FILTER",
        help = "Log filter directive, e.g. rowbase=debug (falls back to RUST_LOG)"
    )]
    log: Option<String>,

    #[arg(
        long,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for .btree, .stats and .verify"
    )]
    format: OutputFormat,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.clone())?;
    init_logging(cli.log.as_deref().or(config.log_filter()))?;
    debug!(config = ?config.path(), "cli.config");

    let db_path = cli
        .db_path
        .clone()
        .or_else(|| config.default_db_path().cloned())
        .ok_or("Must supply a database filename.")?;

    let mut pager = PagerOptions::default();
    if let Some(max_pages) = cli.max_pages.or(config.max_pages()) {
        pager.max_pages = max_pages;
    }
    let table = Table::open_with(
        &db_path,
        TableOptions {
            pager,
            ..TableOptions::default()
        },
    )?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    Repl::new(stdin.lock(), stdout.lock())
        .with_format(cli.format.into())
        .run(table)?;
    Ok(())
}

fn init_logging(filter: Option<&str>) -> Result<(), Box<dyn Error>> {
    let filter = match filter {
        Some(directive) => EnvFilter::try_new(directive)?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|err| format!("failed to install logger: {err}"))?;
    Ok(())
}
