//! Sliding-window features for next-draw modelling.
//!
//! For every draw `i >= K` of a date-ascending history the feature row holds
//! how often each number 1..=49 came out in the `K` previous draws, whether
//! it came out in draw `i - 1`, and the relative position `i / len`. The
//! label row marks the numbers of draw `i` itself.

use crate::models::LooseDraw;
use crate::utils::ensure_writable_dir;
use csv::Writer;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub const MAX_NUMBER: usize = 49;
pub const DEFAULT_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub counts: [u32; MAX_NUMBER],
    pub last: [u8; MAX_NUMBER],
    pub idx_norm: f64,
    pub target_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRow {
    pub target_date: String,
    pub hits: [u8; MAX_NUMBER],
}

/// 0/1 marks for the numbers of one draw; out-of-range numbers are ignored.
pub fn indicator(numbers: &[u32]) -> [u8; MAX_NUMBER] {
    let mut marks = [0u8; MAX_NUMBER];
    for &n in numbers {
        if (1..=MAX_NUMBER as u32).contains(&n) {
            marks[n as usize - 1] = 1;
        }
    }
    marks
}

/// Feature and label rows, or `None` when there are fewer than `window + 1` draws.
pub fn build(draws: &[LooseDraw], window: usize) -> Option<(Vec<FeatureRow>, Vec<LabelRow>)> {
    if draws.len() < window + 1 {
        return None;
    }
    let marks: Vec<[u8; MAX_NUMBER]> = draws.iter().map(|d| indicator(&d.numbers)).collect();
    let in_range = |n: &&u32| (1..=MAX_NUMBER as u32).contains(*n);
    let denom = draws.len().max(1) as f64;

    let mut features = Vec::with_capacity(draws.len() - window);
    let mut labels = Vec::with_capacity(draws.len() - window);
    for i in window..draws.len() {
        let mut counts = [0u32; MAX_NUMBER];
        // every occurrence counts, including a number repeated within one draw
        for past in &draws[i - window..i] {
            for &n in past.numbers.iter().filter(in_range) {
                counts[n as usize - 1] += 1;
            }
        }
        let target_date = draws[i].date.clone().unwrap_or_default();
        features.push(FeatureRow {
            counts,
            last: if window > 0 { marks[i - 1] } else { [0; MAX_NUMBER] },
            idx_norm: i as f64 / denom,
            target_date: target_date.clone(),
        });
        labels.push(LabelRow {
            target_date,
            hits: marks[i],
        });
    }
    Some((features, labels))
}

fn feature_header() -> Vec<String> {
    (1..=MAX_NUMBER)
        .map(|n| format!("cnt_{n}"))
        .chain((1..=MAX_NUMBER).map(|n| format!("last_{n}")))
        .chain(["idx_norm".to_string(), "target_date".to_string()])
        .collect()
}

fn label_header() -> Vec<String> {
    std::iter::once("target_date".to_string())
        .chain((1..=MAX_NUMBER).map(|n| format!("l_{n}")))
        .collect()
}

fn features_csv(rows: &[FeatureRow]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut w = Writer::from_writer(Vec::new());
    w.write_record(feature_header())?;
    for row in rows {
        let record: Vec<String> = row
            .counts
            .iter()
            .map(u32::to_string)
            .chain(row.last.iter().map(u8::to_string))
            .chain([row.idx_norm.to_string(), row.target_date.clone()])
            .collect();
        w.write_record(record)?;
    }
    Ok(w.into_inner().map_err(|e| e.into_error())?)
}

fn labels_csv(rows: &[LabelRow]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut w = Writer::from_writer(Vec::new());
    w.write_record(label_header())?;
    for row in rows {
        let record: Vec<String> = std::iter::once(row.target_date.clone())
            .chain(row.hits.iter().map(u8::to_string))
            .collect();
        w.write_record(record)?;
    }
    Ok(w.into_inner().map_err(|e| e.into_error())?)
}

/// Build and write `features.csv` and `labels.csv` into `dir`.
///
/// Returns `None` (after a warning) when the history is too short.
#[instrument(level = "info", skip(draws, dir), fields(dir = %dir.display(), draws = draws.len()))]
pub async fn write_features(
    draws: &[LooseDraw],
    window: usize,
    dir: &Path,
) -> Result<Option<(PathBuf, PathBuf)>, Box<dyn Error>> {
    let Some((features, labels)) = build(draws, window) else {
        warn!(window, "Not enough draws to build features");
        return Ok(None);
    };

    ensure_writable_dir(dir).await?;
    let features_path = dir.join("features.csv");
    let labels_path = dir.join("labels.csv");
    fs::write(&features_path, features_csv(&features)?).await?;
    fs::write(&labels_path, labels_csv(&labels)?).await?;
    info!(rows = features.len(), "Wrote features and labels");
    Ok(Some((features_path, labels_path)))
}
