//! Raw JSON dump of draws.
//!
//! The file is a pretty-printed array written to `{dir}/{prefix}_raw.json`.
//! Nothing is filtered: future-dated draws stay in.

use crate::models::LooseDraw;
use crate::utils::ensure_writable_dir;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub fn raw_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{prefix}_raw.json"))
}

/// Serialize `items` to `{dir}/{prefix}_raw.json`.
#[instrument(level = "info", skip(items, dir), fields(dir = %dir.display(), count = items.len()))]
pub async fn write_raw<T: Serialize>(items: &[T], dir: &Path, prefix: &str) -> Result<PathBuf, Box<dyn Error>> {
    ensure_writable_dir(dir).await?;
    let json = serde_json::to_string_pretty(items)?;
    let path = raw_path(dir, prefix);
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote raw JSON");
    Ok(path)
}

/// Read a raw JSON dump back as loosely typed draws.
pub async fn read_raw(path: &Path) -> Result<Vec<LooseDraw>, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}
