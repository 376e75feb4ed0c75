//! # lottery_sheets
//!
//! Extracts Spanish lottery draw results (Primitiva, Bonoloto) from publicly
//! published spreadsheets and keeps them in a document store and local files.
//!
//! ## Features
//!
//! - Three retrieval strategies per sheet (direct CSV export, per-sheet CSV
//!   export, HTML table scan), all contributing rows
//! - Tolerant row parsing: Spanish month names, weekday prefixes,
//!   spreadsheet serial dates, numbers spread over one or many cells
//! - Deduplication by date and numbers, newest draw first
//! - Idempotent upserts into a JSON-file store or MongoDB (`mongo` feature)
//! - Raw JSON and processed CSV outputs, file/store ETL, window features
//!
//! ## Usage
//!
//! ```sh
//! lottery_sheets scrape --which 1 --save
//! lottery_sheets import --game bonoloto
//! lottery_sheets export --game primitiva
//! lottery_sheets features --prefix primitiva
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: [`scrapers::sheets`] turns one URL into CSV and HTML payloads
//! 2. **Parsing**: [`extract`] reads payload rows into canonical draws
//! 3. **Collapsing**: [`orchestrator`] dedups and orders draws across sources
//! 4. **Sinks**: [`storage`] upserts documents, [`outputs`] writes files

use chrono::NaiveDate;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod etl;
mod extract;
mod features;
mod models;
mod orchestrator;
mod outputs;
mod scrapers;
mod storage;
mod utils;

use cli::{Cli, Command, ExportArgs, FeaturesArgs, ImportArgs, ScrapeArgs};
use config::Settings;
use orchestrator::{Extractor, latest_draw};
use scrapers::http::HttpClient;
use storage::{Backend, upsert_records};
use utils::today_in;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("lottery_sheets starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref()).await?;
    args.apply(&mut settings);
    let today = today_in(settings.reference_tz()?);
    debug!(%today, timezone = %settings.timezone, data_dir = %settings.data_dir, "Settings resolved");

    let result = match &args.command {
        Command::Scrape(a) => run_scrape(a, &settings, today).await,
        Command::Import(a) => run_import(a, &settings).await,
        Command::Export(a) => run_export(a, &settings, today).await,
        Command::Features(a) => run_features(a, &settings).await,
    };

    match &result {
        Ok(()) => info!(elapsed_ms = start_time.elapsed().as_millis() as u64, "Finished"),
        Err(e) => error!(error = %e, elapsed_ms = start_time.elapsed().as_millis() as u64, "Command failed"),
    }
    result
}

#[instrument(level = "info", skip(settings))]
async fn run_scrape(args: &ScrapeArgs, settings: &Settings, today: NaiveDate) -> Result<(), Box<dyn Error>> {
    let sources = settings.resolve_sources(args.source_arg(), args.name.as_deref());
    let Some(first) = sources.first() else {
        warn!(source = args.source_arg(), "No sources to scrape");
        return Ok(());
    };
    let prefix = args.name.clone().unwrap_or_else(|| first.game.clone());

    let extractor = Extractor::new(HttpClient::new(&settings.user_agent)?, settings.clone());
    let records = extractor.extract(&sources).await;
    if records.is_empty() {
        warn!(%prefix, "No draws extracted; nothing stored or saved");
        return Ok(());
    }

    if let Some(latest) = latest_draw(&records) {
        info!(
            date = %latest.date_key(),
            numbers = ?latest.numbers,
            bonus = ?latest.bonus_number,
            reseed = ?latest.reseed_number,
            "Latest draw"
        );
    }

    if !args.no_store {
        let store = Backend::open(settings).await?;
        let summary = upsert_records(&store, &settings.collection_name(&prefix), &records, args.ordered).await?;
        if !summary.write_errors.is_empty() {
            warn!(failed = summary.write_errors.len(), "Some upserts failed");
        }
    }

    if args.save {
        outputs::save_records(&records, settings, &prefix, today).await?;
    }
    Ok(())
}

#[instrument(level = "info", skip(settings))]
async fn run_import(args: &ImportArgs, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let store = Backend::open(settings).await?;
    let summary = etl::import_files(&store, settings, &args.prefix(), args.ordered).await?;
    info!(n_ops = summary.n_ops, upserted = summary.upserted, ok = summary.ok(), "Import finished");
    Ok(())
}

#[instrument(level = "info", skip(settings))]
async fn run_export(args: &ExportArgs, settings: &Settings, today: NaiveDate) -> Result<(), Box<dyn Error>> {
    let store = Backend::open(settings).await?;
    let documents = etl::export_store(&store, settings, &args.prefix(), today).await?;
    info!(documents, "Export finished");
    Ok(())
}

#[instrument(level = "info", skip(settings))]
async fn run_features(args: &FeaturesArgs, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let path = outputs::processed::processed_path(&settings.processed_dir(), &args.prefix);
    if !path.exists() {
        warn!(path = %path.display(), "Processed CSV not found; run scrape --save or export first");
        return Ok(());
    }
    let draws = outputs::processed::read_processed(&path).await?;
    if let Some((features, labels)) = features::write_features(&draws, args.window, &settings.processed_dir()).await? {
        info!(features = %features.display(), labels = %labels.display(), "Features written");
    }
    Ok(())
}
