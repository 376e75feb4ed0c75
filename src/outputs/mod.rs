//! File outputs for extracted draws.
//!
//! # Submodules
//!
//! - [`json`]: the unfiltered raw JSON dump of an extraction
//! - [`processed`]: the cleaned, date-ascending CSV without future draws
//!
//! # Output Structure
//!
//! ```text
//! data_dir/
//! ├── raw/
//! │   └── primitiva_raw.json
//! └── processed/
//!     ├── primitiva_processed.csv
//!     ├── features.csv
//!     └── labels.csv
//! ```

use crate::config::Settings;
use crate::models::DrawRecord;
use chrono::NaiveDate;
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, instrument};

pub mod json;
pub mod processed;

/// Write the raw JSON and the processed CSV for one extraction.
///
/// # Arguments
///
/// * `records` - Extraction output, any order
/// * `settings` - Supplies the `raw/` and `processed/` directories
/// * `prefix` - File name prefix, e.g. `primitiva`
/// * `today` - Draws dated after this day are left out of the CSV
///
/// # Returns
///
/// Paths of the raw JSON file and the processed CSV file.
///
/// # Errors
///
/// Returns an error if a directory is not writable or serialization fails.
#[instrument(level = "info", skip(records, settings), fields(count = records.len()))]
pub async fn save_records(
    records: &[DrawRecord],
    settings: &Settings,
    prefix: &str,
    today: NaiveDate,
) -> Result<(PathBuf, PathBuf), Box<dyn Error>> {
    let raw = json::write_raw(records, &settings.raw_dir(), prefix).await?;
    let rows = processed::rows_from_records(records, today);
    let csv = processed::write_processed(&rows, &settings.processed_dir(), prefix).await?;
    info!(raw = %raw.display(), processed = %csv.display(), kept = rows.len(), "Saved outputs");
    Ok((raw, csv))
}
