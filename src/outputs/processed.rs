//! The processed CSV: one row per draw, oldest first, nothing after today.
//!
//! Header: `game,date,n1,n2,n3,n4,n5,n6,bonus_number,reseed_number`.
//! Missing bonus values are written as empty fields.

use crate::extract::parse_date;
use crate::models::{DrawRecord, LooseDraw};
use crate::utils::ensure_writable_dir;
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

pub const HEADER: [&str; 10] = [
    "game",
    "date",
    "n1",
    "n2",
    "n3",
    "n4",
    "n5",
    "n6",
    "bonus_number",
    "reseed_number",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedRow {
    pub game: String,
    pub date: NaiveDate,
    pub n1: u32,
    pub n2: u32,
    pub n3: u32,
    pub n4: u32,
    pub n5: u32,
    pub n6: u32,
    pub bonus_number: Option<u32>,
    pub reseed_number: Option<u32>,
}

impl From<&DrawRecord> for ProcessedRow {
    fn from(r: &DrawRecord) -> Self {
        let [n1, n2, n3, n4, n5, n6] = r.numbers;
        ProcessedRow {
            game: r.game.clone(),
            date: r.date,
            n1,
            n2,
            n3,
            n4,
            n5,
            n6,
            bonus_number: r.bonus_number,
            reseed_number: r.reseed_number,
        }
    }
}

/// A processed CSV row as text; numeric cells may read `7.0` or `nan`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    game: String,
    date: String,
    n1: String,
    n2: String,
    n3: String,
    n4: String,
    n5: String,
    n6: String,
    bonus_number: String,
    reseed_number: String,
}

/// Whole non-negative number from a cell such as `7`, `7.0` or ` 7 `.
fn cell_number(cell: &str) -> Option<u32> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return None;
    }
    if let Ok(n) = cell.parse::<u32>() {
        return Some(n);
    }
    let f = cell.parse::<f64>().ok()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as u32)
}

impl From<CsvRow> for LooseDraw {
    fn from(row: CsvRow) -> Self {
        let numbers = [&row.n1, &row.n2, &row.n3, &row.n4, &row.n5, &row.n6]
            .into_iter()
            .filter_map(|c| cell_number(c))
            .collect();
        let date = row.date.trim();
        LooseDraw {
            game: row.game,
            date: (!date.is_empty()).then(|| date.to_string()),
            numbers,
            bonus_number: cell_number(&row.bonus_number),
            reseed_number: cell_number(&row.reseed_number),
            source: None,
        }
    }
}

pub fn processed_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{prefix}_processed.csv"))
}

/// Draws dated on or before `today`, ascending by date.
pub fn rows_from_records(records: &[DrawRecord], today: NaiveDate) -> Vec<ProcessedRow> {
    let mut rows: Vec<ProcessedRow> = records
        .iter()
        .filter(|r| r.date <= today)
        .map(ProcessedRow::from)
        .collect();
    rows.sort_by_key(|r| r.date);
    rows
}

/// Canonical record for a loose draw, if it has a readable date and six numbers.
pub fn record_from_loose(draw: &LooseDraw) -> Option<DrawRecord> {
    let date = parse_date(draw.date.as_deref()?)?;
    let numbers: [u32; 6] = draw.numbers.get(..6)?.try_into().ok()?;
    Some(DrawRecord {
        game: draw.game.clone(),
        date,
        numbers,
        bonus_number: draw.bonus_number,
        reseed_number: draw.reseed_number,
        source: draw.source.clone(),
    })
}

/// Same as [`rows_from_records`] for loose draws; unreadable ones are dropped.
pub fn rows_from_loose(draws: &[LooseDraw], today: NaiveDate) -> Vec<ProcessedRow> {
    let records: Vec<DrawRecord> = draws.iter().filter_map(record_from_loose).collect();
    if records.len() < draws.len() {
        debug!(dropped = draws.len() - records.len(), "Dropped draws without a usable date or numbers");
    }
    rows_from_records(&records, today)
}

/// Write `rows` to `{dir}/{prefix}_processed.csv`, header included even when empty.
#[instrument(level = "info", skip(rows, dir), fields(dir = %dir.display(), count = rows.len()))]
pub async fn write_processed(rows: &[ProcessedRow], dir: &Path, prefix: &str) -> Result<PathBuf, Box<dyn Error>> {
    ensure_writable_dir(dir).await?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;

    let path = processed_path(dir, prefix);
    fs::write(&path, bytes).await?;
    info!(path = %path.display(), "Wrote processed CSV");
    Ok(path)
}

/// Read a processed CSV in file order.
pub async fn read_processed(path: &Path) -> Result<Vec<LooseDraw>, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut draws = Vec::new();
    for row in reader.deserialize::<CsvRow>() {
        draws.push(LooseDraw::from(row?));
    }
    Ok(draws)
}
