//! Turning one row of spreadsheet cells into a draw.
//!
//! Published sheets disagree on layout: some keep the whole combination in
//! one cell (`3 15 23 26 34 38`), some spread it over one column per number,
//! and HTML renders prepend a row-number column. Instead of per-source
//! configuration the parser locates the date first and then tries a short
//! cascade of number layouts, keeping the first that yields six integers.

use crate::extract::dates::parse_date;
use crate::models::DrawRecord;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Cells that are row indices rather than dates (`12`, `999.0`).
static INDEX_CELL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.0+)?$").unwrap());

static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Only the first cells of a row are considered as date candidates.
const DATE_SCAN_CELLS: usize = 3;
/// How many cells after the date the spread-out layout looks at.
const FOLLOWING_CELLS: usize = 10;
/// Six numbers plus bonus plus reseed.
const FULL_DRAW_LEN: usize = 8;

type NumberStrategy = fn(&[String], usize) -> Option<Vec<u32>>;

const NUMBER_STRATEGIES: [NumberStrategy; 3] = [next_cell, following_cells, fixed_positions];

/// Every run of ASCII digits in `text`, in order of appearance.
///
/// Runs too large for a `u32` are dropped.
pub fn extract_ints(text: &str) -> Vec<u32> {
    INT_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Parse a row of cells into a draw stamped with `game`.
///
/// Returns `None` when the row has no recognisable date or fewer than six
/// integers under every layout.
pub fn parse_row<S: AsRef<str>>(cells: &[S], game: &str) -> Option<DrawRecord> {
    if cells.len() < 2 {
        return None;
    }
    let cols: Vec<String> = cells.iter().map(|c| c.as_ref().trim().to_string()).collect();

    let (date_idx, date) = locate_date(&cols)?;

    let ints = NUMBER_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(&cols, date_idx))?;

    let numbers: [u32; 6] = ints.get(..6)?.try_into().ok()?;
    Some(DrawRecord {
        game: game.to_string(),
        date,
        numbers,
        bonus_number: ints.get(6).copied(),
        reseed_number: ints.get(7).copied(),
        source: None,
    })
}

fn locate_date(cols: &[String]) -> Option<(usize, NaiveDate)> {
    cols.iter()
        .take(DATE_SCAN_CELLS)
        .enumerate()
        .filter(|(_, cell)| !INDEX_CELL_RE.is_match(cell))
        .find_map(|(idx, cell)| parse_date(cell).map(|date| (idx, date)))
        // a lone serial date in the first column looks like an index
        .or_else(|| parse_date(cols.first()?).map(|date| (0, date)))
}

fn at_least_six(ints: Vec<u32>) -> Option<Vec<u32>> {
    (ints.len() >= 6).then_some(ints)
}

/// Whole combination in the cell right after the date.
fn next_cell(cols: &[String], date_idx: usize) -> Option<Vec<u32>> {
    at_least_six(extract_ints(cols.get(date_idx + 1)?))
}

/// One number per cell after the date.
fn following_cells(cols: &[String], date_idx: usize) -> Option<Vec<u32>> {
    let mut ints = Vec::new();
    for cell in cols.iter().skip(date_idx + 1).take(FOLLOWING_CELLS) {
        ints.extend(extract_ints(cell));
        if ints.len() >= FULL_DRAW_LEN {
            break;
        }
    }
    at_least_six(ints)
}

/// Wide rows laid out as `date, n1..n6, bonus, reseed` regardless of where the date was found.
fn fixed_positions(cols: &[String], _date_idx: usize) -> Option<Vec<u32>> {
    if cols.len() < 9 {
        return None;
    }
    at_least_six(cols[1..8].iter().flat_map(|cell| extract_ints(cell)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extract_ints() {
        assert_eq!(extract_ints("3 15 23 26 34 38"), vec![3, 15, 23, 26, 34, 38]);
        assert_eq!(extract_ints("C(7) R(2)"), vec![7, 2]);
        assert_eq!(extract_ints("7.0"), vec![7, 0]);
        assert!(extract_ints("").is_empty());
        assert_eq!(extract_ints("99999999999 4"), vec![4]);
    }

    #[test]
    fn test_combination_in_single_cell() {
        let draw = parse_row(&["14/08/2013", "3 15 23 26 34 38 7 2"], "primitiva").unwrap();
        assert_eq!(draw.game, "primitiva");
        assert_eq!(draw.date, date(2013, 8, 14));
        assert_eq!(draw.numbers, [3, 15, 23, 26, 34, 38]);
        assert_eq!(draw.bonus_number, Some(7));
        assert_eq!(draw.reseed_number, Some(2));
        assert_eq!(draw.source, None);
    }

    #[test]
    fn test_single_cell_wins_even_without_bonus() {
        let row = ["1", "14/08/2013", "3 15 23 26 34 38", "7", "2"];
        let draw = parse_row(&row, "bonoloto").unwrap();
        assert_eq!(draw.date, date(2013, 8, 14));
        assert_eq!(draw.numbers, [3, 15, 23, 26, 34, 38]);
        assert_eq!(draw.bonus_number, None);
        assert_eq!(draw.reseed_number, None);
    }

    #[test]
    fn test_one_number_per_cell() {
        let row = ["jueves 14 agosto 2013", "3", "15", "23", "26", "34", "38", "7", "2", "99"];
        let draw = parse_row(&row, "primitiva").unwrap();
        assert_eq!(draw.numbers, [3, 15, 23, 26, 34, 38]);
        assert_eq!(draw.bonus_number, Some(7));
        assert_eq!(draw.reseed_number, Some(2));
    }

    #[test]
    fn test_index_column_is_skipped() {
        let row = ["999.0", " 14/08/2013 ", "3 15 23 26 34 38"];
        let draw = parse_row(&row, "primitiva").unwrap();
        assert_eq!(draw.date, date(2013, 8, 14));
    }

    #[test]
    fn test_serial_date_in_first_column() {
        let draw = parse_row(&["41500", "3 15 23 26 34 38 1"], "primitiva").unwrap();
        assert_eq!(draw.date, date(2013, 8, 14));
        assert_eq!(draw.bonus_number, Some(1));
    }

    #[test]
    fn test_fixed_positions_requires_wide_row() {
        let wide: Vec<String> = ["x", "3", "15", "23", "26", "34", "38", "7", "2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(fixed_positions(&wide, 0), Some(vec![3, 15, 23, 26, 34, 38, 7]));
        assert_eq!(fixed_positions(&wide[..8], 0), None);
    }

    #[test]
    fn test_rejects_rows_with_too_few_numbers() {
        assert!(parse_row(&["14/08/2013", "3 15 23", "26"], "primitiva").is_none());
        assert!(parse_row(&["14/08/2013", "", "", ""], "primitiva").is_none());
    }

    #[test]
    fn test_rejects_rows_without_date() {
        assert!(parse_row(&["FECHA", "COMB. GANADORA", "COMP.", "R."], "primitiva").is_none());
        assert!(parse_row(&["sin fecha", "3 15 23 26 34 38"], "primitiva").is_none());
    }

    #[test]
    fn test_rejects_short_rows() {
        assert!(parse_row(&["14/08/2013"], "primitiva").is_none());
        assert!(parse_row::<&str>(&[], "primitiva").is_none());
    }
}
