#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the grades extraction tool.
//!
//! `notas extract <FILE>` reads a grades page saved from a browser.
//! `notas scrape` logs into the student portal configured through the
//! `PORTAL_*` environment variables and downloads the page itself. Both
//! write the extracted courses to a JSON report.

mod config;
mod output;

use std::path::PathBuf;

use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use notas_extract::GradeExtractor;
use notas_portal::{GradesPageSource, LocalFile, PortalClient, PortalConfig};

#[derive(Parser)]
#[command(name = "notas", about = "Grade concentration page extractor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract grades from a saved HTML page
    Extract {
        /// Path to the saved grades page
        file: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Log into the portal and extract grades from the live page
    Scrape {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Where to write the JSON report
    #[arg(long, default_value = "notas.json")]
    output: PathBuf,
    /// Config file (defaults to `notas.toml` when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Year assigned to courses whose period shows no year (defaults to
    /// the current year)
    #[arg(long)]
    year: Option<i32>,
    /// Exit with an error when no course could be extracted
    #[arg(long)]
    strict: bool,
}

/// Initializes logging, defaulting to `info` when `RUST_LOG` is unset.
fn init_logger() {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

/// Fetches, extracts and writes one grades page.
async fn run(
    source: &impl GradesPageSource,
    extractor: &GradeExtractor,
    args: &RunArgs,
    save_raw: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Reading grades from {}", source.describe());
    let html = source.fetch_html().await?;

    let report = extractor.extract(&html);
    output::write_report(&args.output, &report)?;

    if report.is_empty() {
        log::warn!("No courses extracted: {}", report.outcome);
        if save_raw {
            let raw = output::write_raw_html(&args.output, &html)?;
            log::warn!("Saved the raw page to {} for inspection", raw.display());
        }
        if args.strict {
            return Err(format!("No courses extracted ({})", report.outcome).into());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let cli = Cli::parse();

    let args = match &cli.command {
        Commands::Extract { run, .. } | Commands::Scrape { run } => run,
    };

    let file_config = config::load(args.config.as_deref())?;
    let mut options = file_config.extract;
    let year = args
        .year
        .or(options.fallback_year)
        .unwrap_or_else(|| chrono::Local::now().year());
    options.fallback_year = Some(year);
    let extractor = GradeExtractor::new(&options)?;

    match &cli.command {
        Commands::Extract { file, run: args } => {
            run(&LocalFile::new(file), &extractor, args, false).await?;
        }
        Commands::Scrape { run: args } => {
            let portal = PortalConfig::from_env(&file_config.portal)?;
            log::debug!("Portal config: {portal:?}");
            let client = PortalClient::new(portal)?;
            run(&client, &extractor, args, true).await?;
        }
    }

    Ok(())
}
