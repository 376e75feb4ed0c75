//! Moving draws between local files and the document store.
//!
//! - [`import_files`]: processed CSV (or raw JSON) into the store
//! - [`export_store`]: store contents back out as raw JSON plus processed CSV

use crate::config::Settings;
use crate::models::{LooseDraw, UpsertSummary};
use crate::outputs::{json, processed};
use crate::storage::{DrawStore, upsert_loose};
use chrono::NaiveDate;
use std::error::Error;
use tracing::{info, instrument, warn};

/// Draws saved locally for `prefix`, preferring the processed CSV.
///
/// Draws with no game get `prefix` as their game.
#[instrument(level = "info", skip(settings))]
pub async fn load_local_draws(settings: &Settings, prefix: &str) -> Result<Vec<LooseDraw>, Box<dyn Error>> {
    let csv_path = processed::processed_path(&settings.processed_dir(), prefix);
    let raw_path = json::raw_path(&settings.raw_dir(), prefix);

    let mut draws = if csv_path.exists() {
        info!(path = %csv_path.display(), "Reading processed CSV");
        processed::read_processed(&csv_path).await?
    } else if raw_path.exists() {
        info!(path = %raw_path.display(), "Reading raw JSON");
        json::read_raw(&raw_path).await?
    } else {
        warn!(
            csv = %csv_path.display(),
            raw = %raw_path.display(),
            "No local files for prefix"
        );
        Vec::new()
    };

    for draw in draws.iter_mut().filter(|d| d.game.is_empty()) {
        draw.game = prefix.to_string();
    }
    Ok(draws)
}

/// Upsert the local files of `prefix` into its collection.
#[instrument(level = "info", skip(store, settings))]
pub async fn import_files<S: DrawStore>(
    store: &S,
    settings: &Settings,
    prefix: &str,
    ordered: bool,
) -> Result<UpsertSummary, Box<dyn Error>> {
    let draws = load_local_draws(settings, prefix).await?;
    if draws.is_empty() {
        warn!(prefix, "No rows to import");
        return Ok(UpsertSummary::default());
    }
    let collection = settings.collection_name(prefix);
    Ok(upsert_loose(store, &collection, &draws, ordered).await?)
}

/// Write every document of `prefix`'s collection to raw JSON and processed CSV.
///
/// Returns the number of documents read from the store.
#[instrument(level = "info", skip(store, settings))]
pub async fn export_store<S: DrawStore>(
    store: &S,
    settings: &Settings,
    prefix: &str,
    today: NaiveDate,
) -> Result<usize, Box<dyn Error>> {
    let collection = settings.collection_name(prefix);
    let docs = store.load_documents(&collection).await?;
    if docs.is_empty() {
        warn!(%collection, "Collection is empty");
    }

    let draws: Vec<LooseDraw> = docs.iter().map(LooseDraw::from).collect();
    json::write_raw(&draws, &settings.raw_dir(), prefix).await?;
    let rows = processed::rows_from_loose(&draws, today);
    processed::write_processed(&rows, &settings.processed_dir(), prefix).await?;
    info!(%collection, documents = docs.len(), rows = rows.len(), "Exported collection");
    Ok(docs.len())
}
