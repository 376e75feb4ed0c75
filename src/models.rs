//! Data models for draw results and their stored representations.
//!
//! - [`DrawRecord`]: a canonical draw extracted from a spreadsheet row
//! - [`LooseDraw`]: a draw read back from local files, fields possibly missing
//! - [`DrawDocument`]: the document written to the store, keyed by `_id`
//! - [`UpsertSummary`]: outcome of one batch upsert

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Games published by the default spreadsheet sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Game {
    Primitiva,
    Bonoloto,
}

impl Game {
    pub fn as_str(&self) -> &'static str {
        match self {
            Game::Primitiva => "primitiva",
            Game::Bonoloto => "bonoloto",
        }
    }

    /// Game behind a numeric source alias; anything other than `"2"` is Primitiva.
    pub fn from_alias(alias: &str) -> Self {
        if alias.trim() == "2" {
            Game::Bonoloto
        } else {
            Game::Primitiva
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a draw: its date plus the numbers in extraction order.
pub type DrawIdentity = (NaiveDate, [u32; 6]);

/// A canonical draw result.
///
/// Built only by the row parser once a real calendar date and six integers
/// have been found, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    /// Game name or output prefix stamped by the caller.
    pub game: String,
    /// Draw date, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// The six drawn numbers, in the order they appeared in the source.
    pub numbers: [u32; 6],
    /// The *complementario*, when the source carries one.
    pub bonus_number: Option<u32>,
    /// The *reintegro*, when the source carries one.
    pub reseed_number: Option<u32>,
    /// URL of the payload the row was read from.
    pub source: Option<String>,
}

impl DrawRecord {
    pub fn identity(&self) -> DrawIdentity {
        (self.date, self.numbers)
    }

    /// Canonical `YYYY-MM-DD` form of the draw date.
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// A draw as found in local files, where any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LooseDraw {
    pub game: String,
    pub date: Option<String>,
    pub numbers: Vec<u32>,
    pub bonus_number: Option<u32>,
    pub reseed_number: Option<u32>,
    pub source: Option<String>,
}

impl From<&DrawRecord> for LooseDraw {
    fn from(record: &DrawRecord) -> Self {
        LooseDraw {
            game: record.game.clone(),
            date: Some(record.date_key()),
            numbers: record.numbers.to_vec(),
            bonus_number: record.bonus_number,
            reseed_number: record.reseed_number,
            source: record.source.clone(),
        }
    }
}

impl From<&DrawDocument> for LooseDraw {
    fn from(doc: &DrawDocument) -> Self {
        LooseDraw {
            game: doc.game.clone(),
            date: doc.date.clone(),
            numbers: doc.numbers.clone(),
            bonus_number: doc.bonus_number,
            reseed_number: doc.reseed_number,
            source: (!doc.source.is_empty()).then(|| doc.source.clone()),
        }
    }
}

/// Storage document for one draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawDocument {
    /// `"{date}:{n1,n2,...}"`, or the `no_fecha` / `no_nums` placeholders.
    #[serde(rename = "_id")]
    pub id: String,
    pub game: String,
    pub date: Option<String>,
    pub numbers: Vec<u32>,
    pub bonus_number: Option<u32>,
    pub reseed_number: Option<u32>,
    pub source: String,
    pub inserted_at: DateTime<Utc>,
}

impl DrawDocument {
    /// Documents built without a date or without numbers share placeholder ids.
    pub fn is_low_confidence(&self) -> bool {
        self.id.starts_with("no_fecha") || self.id.ends_with("no_nums")
    }
}

/// A single failed operation inside a batch upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub index: usize,
    pub id: String,
    pub message: String,
}

/// Counters returned by a batch upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub n_ops: usize,
    pub matched: u64,
    pub modified: u64,
    pub upserted: u64,
    pub write_errors: Vec<WriteFailure>,
}

impl UpsertSummary {
    pub fn ok(&self) -> bool {
        self.n_ops > 0 && self.write_errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DrawRecord {
        DrawRecord {
            game: "primitiva".to_string(),
            date: NaiveDate::from_ymd_opt(2013, 8, 14).unwrap(),
            numbers: [3, 15, 23, 26, 34, 38],
            bonus_number: Some(7),
            reseed_number: None,
            source: None,
        }
    }

    #[test]
    fn test_draw_record_serializes_canonical_date() {
        let json = serde_json::to_string(&record()).unwrap();
        assert!(json.contains(r#""date":"2013-08-14""#));
        assert!(json.contains(r#""numbers":[3,15,23,26,34,38]"#));
        assert!(json.contains(r#""reseed_number":null"#));
    }

    #[test]
    fn test_identity_keeps_extraction_order() {
        let a = record();
        let mut b = record();
        b.numbers = [15, 3, 23, 26, 34, 38];
        assert_ne!(a.identity(), b.identity());
        assert_eq!(a.date_key(), "2013-08-14");
    }

    #[test]
    fn test_loose_draw_from_partial_json() {
        let loose: LooseDraw = serde_json::from_str(r#"{"game": "bonoloto", "numbers": [1, 2]}"#).unwrap();
        assert_eq!(loose.game, "bonoloto");
        assert_eq!(loose.date, None);
        assert_eq!(loose.numbers, vec![1, 2]);
    }

    #[test]
    fn test_game_from_alias() {
        assert_eq!(Game::from_alias("2"), Game::Bonoloto);
        assert_eq!(Game::from_alias(" 1 "), Game::Primitiva);
        assert_eq!(Game::from_alias("https://example.com"), Game::Primitiva);
        assert_eq!(Game::Bonoloto.to_string(), "bonoloto");
    }

    #[test]
    fn test_document_id_field_renamed() {
        let doc = DrawDocument {
            id: "no_fecha:1,2,3,4,5,6".to_string(),
            game: "primitiva".to_string(),
            date: None,
            numbers: vec![1, 2, 3, 4, 5, 6],
            bonus_number: None,
            reseed_number: None,
            source: String::new(),
            inserted_at: Utc::now(),
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains(r#""_id":"no_fecha:1,2,3,4,5,6""#));
        assert!(doc.is_low_confidence());
    }
}
