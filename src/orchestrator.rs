//! Extraction across one or more sheet URLs.
//!
//! Each source is fetched with every retrieval strategy, every row of every
//! payload goes through the row parser, and the candidates are collapsed by
//! draw identity. The same collapse runs again over the merged output of all
//! sources. The final list is ordered newest first.

use crate::config::{Settings, SourceSpec};
use crate::extract::{RawTable, parse_row};
use crate::models::DrawRecord;
use crate::scrapers::http::FetchText;
use crate::scrapers::sheets::{FetchError, fetch_payloads};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

/// Parse every row of `table`, stamping records with the table's origin.
pub fn records_from_table(table: &RawTable, game: &str) -> Vec<DrawRecord> {
    table
        .rows
        .iter()
        .filter_map(|row| parse_row(row, game))
        .map(|record| DrawRecord {
            source: Some(table.origin.clone()),
            ..record
        })
        .collect()
}

/// Keep the first record of each identity, newest date first.
///
/// Earlier payloads win over later ones, so a CSV copy with bonus values
/// beats the HTML copy of the same draw.
///
/// The sort is stable, so draws sharing a date keep their discovery order.
pub fn dedup_and_sort(records: Vec<DrawRecord>) -> Vec<DrawRecord> {
    let mut unique: Vec<DrawRecord> = records.into_iter().unique_by(DrawRecord::identity).collect();
    unique.sort_by(|a, b| b.date.cmp(&a.date));
    unique
}

/// Most recent draw of an extraction result.
pub fn latest_draw(records: &[DrawRecord]) -> Option<&DrawRecord> {
    records.first()
}

/// Drives the sheet fetcher and row parser over configured sources.
#[derive(Debug)]
pub struct Extractor<F> {
    http: F,
    settings: Settings,
}

impl<F: FetchText> Extractor<F> {
    pub fn new(http: F, settings: Settings) -> Self {
        Self { http, settings }
    }

    /// Deduplicated draws from a single source.
    #[instrument(level = "info", skip_all, fields(url = %source.url, game = %source.game))]
    pub async fn extract_source(&self, source: &SourceSpec) -> Result<Vec<DrawRecord>, FetchError> {
        let payloads = fetch_payloads(&self.http, &self.settings, &source.url).await?;

        let mut candidates = Vec::new();
        for payload in payloads {
            let table = payload.into_table();
            let found = records_from_table(&table, &source.game);
            debug!(origin = %table.origin, rows = table.rows.len(), draws = found.len(), "Parsed table");
            candidates.extend(found);
        }

        let total = candidates.len();
        let records = dedup_and_sort(candidates);
        debug!(candidates = total, unique = records.len(), "Collapsed duplicate draws");
        Ok(records)
    }

    /// Deduplicated draws from all sources, newest first.
    ///
    /// # Arguments
    ///
    /// * `sources` - Resolved sheet URLs with the game label for their rows
    ///
    /// # Returns
    ///
    /// Every distinct draw found, ordered by date descending. A source that
    /// fails or yields nothing is logged and skipped, so the result may be
    /// empty.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn extract(&self, sources: &[SourceSpec]) -> Vec<DrawRecord> {
        let per_source: Vec<Vec<DrawRecord>> = stream::iter(sources)
            .then(|source| async move {
                match self.extract_source(source).await {
                    Ok(records) if records.is_empty() => {
                        warn!(url = %source.url, "No draws found in any retrieval strategy");
                        records
                    }
                    Ok(records) => {
                        info!(url = %source.url, count = records.len(), "Extracted draws");
                        records
                    }
                    Err(e) => {
                        warn!(url = %source.url, error = %e, "Source failed; skipping");
                        Vec::new()
                    }
                }
            })
            .collect()
            .await;

        let merged = dedup_and_sort(per_source.into_iter().flatten().collect());
        info!(count = merged.len(), "Extraction complete");
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::http::fake::FakeWeb;
    use chrono::NaiveDate;

    const SHEET_A: &str = "https://sheets.test/spreadsheets/d/sheetA/pubhtml?output=html";
    const SHEET_B: &str = "https://sheets.test/spreadsheets/d/sheetB/pubhtml?output=html";

    const PUBHTML: &str = r#"<html><body><table>
        <tr><th></th><th>A</th><th>B</th><th>C</th><th>D</th></tr>
        <tr><th>1</th><td>FECHA</td><td>COMBINACIÓN GANADORA</td><td>C</td><td>R</td></tr>
        <tr><th>2</th><td>14/08/2013</td><td>3 15 23 26 34 38</td><td>7</td><td>2</td></tr>
        <tr><th>3</th><td>jueves 15 agosto 2013</td><td>1 2 3 4 5 6</td><td>9</td><td>0</td></tr>
    </table></body></html>"#;

    fn settings() -> Settings {
        Settings {
            export_base: "https://sheets.test/spreadsheets/d".to_string(),
            ..Settings::default()
        }
    }

    fn source(url: &str) -> SourceSpec {
        SourceSpec {
            url: url.to_string(),
            game: "primitiva".to_string(),
        }
    }

    fn record(date: &str, numbers: [u32; 6], source: &str) -> DrawRecord {
        DrawRecord {
            game: "primitiva".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            numbers,
            bonus_number: None,
            reseed_number: None,
            source: Some(source.to_string()),
        }
    }

    #[test]
    fn test_orders_newest_first() {
        let records = vec![
            record("2020-01-01", [1, 2, 3, 4, 5, 6], "a"),
            record("2021-06-15", [1, 2, 3, 4, 5, 6], "a"),
            record("2019-12-31", [1, 2, 3, 4, 5, 6], "a"),
        ];
        let dates: Vec<String> = dedup_and_sort(records).iter().map(DrawRecord::date_key).collect();
        assert_eq!(dates, vec!["2021-06-15", "2020-01-01", "2019-12-31"]);
    }

    #[test]
    fn test_dedup_ignores_source() {
        let records = vec![
            record("2020-01-01", [1, 2, 3, 4, 5, 6], "csv"),
            record("2020-01-01", [1, 2, 3, 4, 5, 6], "html"),
            record("2020-01-01", [6, 5, 4, 3, 2, 1], "html"),
        ];
        let out = dedup_and_sort(records);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].source.as_deref(), Some("csv"));
        assert_eq!(latest_draw(&out).map(|r| r.numbers), Some([1, 2, 3, 4, 5, 6]));
    }

    #[test]
    fn test_records_from_table_stamps_origin() {
        let table = RawTable::from_html("https://origin.test", PUBHTML);
        let records = records_from_table(&table, "bonoloto");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.source.as_deref() == Some("https://origin.test")));
        assert!(records.iter().all(|r| r.game == "bonoloto"));
    }

    #[tokio::test]
    async fn test_html_scan_survives_failed_csv_strategies() {
        // every CSV endpoint is unreachable; only the page itself answers
        let web = FakeWeb::new().with_page(SHEET_A, 200, PUBHTML);
        let extractor = Extractor::new(web, settings());

        let records = extractor.extract(&[source(SHEET_A)]).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date_key(), "2013-08-15");
        assert_eq!(records[1].numbers, [3, 15, 23, 26, 34, 38]);
        assert_eq!(records[1].bonus_number, None);
    }

    #[tokio::test]
    async fn test_csv_and_html_duplicates_collapse() {
        let web = FakeWeb::new()
            .with_page(SHEET_A, 200, PUBHTML)
            .with_page(
                "https://sheets.test/spreadsheets/d/sheetA/pub?output=csv",
                200,
                "FECHA,COMBINACION,C,R\n14/08/2013,3 15 23 26 34 38 7 2,,\n01/01/2012,10 11 12 13 14 15,,\n",
            );
        let extractor = Extractor::new(web, settings());

        let records = extractor.extract_source(&source(SHEET_A)).await.unwrap();
        let dates: Vec<String> = records.iter().map(DrawRecord::date_key).collect();
        assert_eq!(dates, vec!["2013-08-15", "2013-08-14", "2012-01-01"]);
        // the CSV copy of 2013-08-14 came first and carries the bonus numbers
        assert_eq!(records[1].bonus_number, Some(7));
        assert_eq!(
            records[1].source.as_deref(),
            Some("https://sheets.test/spreadsheets/d/sheetA/pub?output=csv")
        );
    }

    #[tokio::test]
    async fn test_failed_sources_do_not_abort() {
        let web = FakeWeb::new().with_page(SHEET_B, 200, PUBHTML);
        let extractor = Extractor::new(web, settings());
        let sources = [source("not a url"), source(SHEET_A), source(SHEET_B)];

        let records = extractor.extract(&sources).await;
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_cross_source_merge() {
        let web = FakeWeb::new()
            .with_page(SHEET_A, 200, PUBHTML)
            .with_page(SHEET_B, 200, PUBHTML);
        let extractor = Extractor::new(web, settings());

        let records = extractor.extract(&[source(SHEET_A), source(SHEET_B)]).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source.as_deref(), Some(SHEET_A));
    }

    #[tokio::test]
    async fn test_nothing_found_is_empty() {
        let extractor = Extractor::new(FakeWeb::new(), settings());
        assert!(extractor.extract(&[source(SHEET_A)]).await.is_empty());
        assert!(extractor.extract(&[]).await.is_empty());
    }
}
