//! dsl-normalize CLI - converts DSL dictionary sources into relational tables
//!
//! `parse` decodes a dictionary and prints the normalized tables; `inspect`
//! prints per-line diagnostics as NDJSON.

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dsl_normalize::{
    inspect_lines, parse_lines, read_source_lines, write_report, ErrorPolicy, ImportConfig,
    OutputFormat,
};

#[derive(Parser)]
#[command(name = "dsl-normalize")]
#[command(version, about = "Normalizes DSL dictionary sources into relational tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a dictionary and print its tables
    Parse {
        /// Path to the DSL dictionary source
        #[arg(short, long)]
        path: PathBuf,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Encoding label used when the source has no BOM
        #[arg(short, long)]
        encoding: Option<String>,

        /// Output format (table, ndjson, json)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Invalid line handling (fail-fast, collect)
        #[arg(long)]
        error_policy: Option<ErrorPolicy>,

        /// Also print the attribute/translation join table
        #[arg(long)]
        include_attribute_links: bool,
    },

    /// Print classification and extracted fragments for every line
    Inspect {
        /// Path to the DSL dictionary source
        #[arg(short, long)]
        path: PathBuf,

        /// Encoding label used when the source has no BOM
        #[arg(short, long)]
        encoding: Option<String>,
    },
}

fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            path,
            config,
            encoding,
            format,
            error_policy,
            include_attribute_links,
        } => {
            let overrides = CliOverrides {
                encoding,
                format,
                error_policy,
                include_attribute_links,
            };
            resolve_config(config, overrides).and_then(|config| parse_dictionary(path, config))
        }
        Commands::Inspect { path, encoding } => {
            let overrides = CliOverrides {
                encoding,
                ..CliOverrides::default()
            };
            resolve_config(None, overrides).and_then(|config| inspect_dictionary(path, config))
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[derive(Default)]
struct CliOverrides {
    encoding: Option<String>,
    format: Option<OutputFormat>,
    error_policy: Option<ErrorPolicy>,
    include_attribute_links: bool,
}

/// Build the effective config with precedence: CLI > ENV > config file > default
fn resolve_config(path: Option<PathBuf>, cli: CliOverrides) -> Result<ImportConfig, String> {
    let config = match path {
        Some(path) => ImportConfig::load_from_file(&path).map_err(|e| e.to_string())?,
        None => ImportConfig::default(),
    };
    let mut config = config.with_env_overrides().map_err(|e| e.to_string())?;

    if let Some(encoding) = cli.encoding {
        config.encoding = encoding;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(error_policy) = cli.error_policy {
        config.error_policy = error_policy;
    }
    if cli.include_attribute_links {
        config.include_attribute_links = true;
    }

    tracing::debug!(?config, "configuration resolved");
    Ok(config)
}

fn parse_dictionary(path: PathBuf, config: ImportConfig) -> Result<(), String> {
    let lines = read_source_lines(&path, &config.encoding).map_err(|e| e.to_string())?;
    let outcome = parse_lines(&lines, config.error_policy).map_err(|e| e.to_string())?;

    for rejected in &outcome.rejected {
        eprintln!("  ⚠ Skipped {}", rejected);
    }

    let stdout = io::stdout();
    write_report(
        stdout.lock(),
        &outcome,
        config.format,
        config.include_attribute_links,
    )
    .map_err(|e| format!("Failed to write report: {}", e))
}

fn inspect_dictionary(path: PathBuf, config: ImportConfig) -> Result<(), String> {
    let lines = read_source_lines(&path, &config.encoding).map_err(|e| e.to_string())?;
    let reports = inspect_lines(&lines).map_err(|e| e.to_string())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for report in &reports {
        serde_json::to_writer(&mut out, report)
            .map_err(|e| format!("Failed to serialize line {}: {}", report.line_number, e))?;
        writeln!(out).map_err(|e| format!("Failed to write output: {}", e))?;
    }
    out.flush()
        .map_err(|e| format!("Failed to write output: {}", e))
}
