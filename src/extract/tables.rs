//! Readers that flatten a fetched payload into rows of text cells.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static TABLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("table").unwrap());
static ROW_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static CELL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").unwrap());

/// Rows read from one payload, consumed once by the row parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    /// URL the payload was fetched from.
    pub origin: String,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn from_csv(origin: &str, text: &str) -> Self {
        RawTable {
            origin: origin.to_string(),
            rows: csv_rows(text),
        }
    }

    pub fn from_html(origin: &str, html: &str) -> Self {
        RawTable {
            origin: origin.to_string(),
            rows: html_rows(html),
        }
    }
}

/// Split CSV text into rows.
///
/// The first line is kept: a header row is rejected later by the row parser
/// like any other non-draw row. Ragged rows are allowed and malformed
/// records are dropped.
pub fn csv_rows(text: &str) -> Vec<Vec<String>> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(sniff_delimiter(text))
        .from_reader(text.as_bytes());

    reader
        .records()
        .filter_map(Result::ok)
        .map(|record| record.iter().map(str::to_string).collect())
        .collect()
}

/// Pick the most frequent of `,`, `;` and tab on the first non-empty line.
fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let mut best = (0, b',');
    for delimiter in [b',', b';', b'\t'] {
        let count = first_line.bytes().filter(|b| *b == delimiter).count();
        if count > best.0 {
            best = (count, delimiter);
        }
    }
    best.1
}

/// Every `<tr>` of every `<table>` in the document, cells from `td` and `th`.
pub fn html_rows(html: &str) -> Vec<Vec<String>> {
    let document = Html::parse_document(html);
    document
        .select(&TABLE_SELECTOR)
        .flat_map(|table| table.select(&ROW_SELECTOR))
        .map(|row| row.select(&CELL_SELECTOR).map(cell_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Text nodes of a cell, trimmed and joined by single spaces.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
