//! Date normalization for spreadsheet cells.
//!
//! Published result sheets mix numeric dates (`14/08/2013`), Spanish text
//! (`jueves 14 agosto 2013`) and raw spreadsheet serials (`41500`). Every
//! representation is reduced to a [`NaiveDate`], rendered as `YYYY-MM-DD`.
//!
//! Strategies run in a fixed order and the first one that yields a real
//! calendar date wins:
//!
//! 1. exact numeric formats
//! 2. `<day> <month-name> <year>` token triples
//! 3. spreadsheet serial dates (days since 1899-12-30)
//! 4. an embedded `<day> … <month-name> … <year>` anywhere in the text

use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

const EXACT_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d.%m.%Y"];

static SERIAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4,5}$").unwrap());

static EMBEDDED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d{1,2})\D+(enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre)\D+(\d{4})",
    )
    .unwrap()
});

type DateStrategy = fn(&str) -> Option<NaiveDate>;

const STRATEGIES: [DateStrategy; 4] = [
    parse_exact,
    parse_month_tokens,
    parse_spreadsheet_serial,
    parse_embedded,
];

/// Spreadsheet serial dates count days from this epoch.
fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Map a lowercase Spanish month name to its number.
fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse a date cell, returning `None` when no strategy recognises it.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.replace('\u{a0}', " ").replace(',', " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    STRATEGIES.iter().find_map(|strategy| strategy(cleaned))
}

/// Canonical `YYYY-MM-DD` form of a date cell.
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

fn parse_exact(s: &str) -> Option<NaiveDate> {
    EXACT_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        // chrono accepts short years; a published draw date always has four digits
        .find(|d| (1000..=9999).contains(&d.year()))
}

fn parse_month_tokens(s: &str) -> Option<NaiveDate> {
    let lowered = s.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();
    tokens.windows(3).find_map(|triple| {
        let day_token = triple[0];
        if !day_token.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let day: u32 = day_token.parse().ok()?;
        let month = month_number(triple[1])?;
        let year_digits: String = triple[2].chars().filter(char::is_ascii_digit).collect();
        let year: i32 = year_digits.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

fn parse_spreadsheet_serial(s: &str) -> Option<NaiveDate> {
    if !SERIAL_RE.is_match(s) {
        return None;
    }
    let days: i64 = s.parse().ok()?;
    serial_epoch()?.checked_add_signed(Duration::days(days))
}

fn parse_embedded(s: &str) -> Option<NaiveDate> {
    let caps = EMBEDDED_RE.captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2].to_lowercase())?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
