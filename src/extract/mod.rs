//! Extraction of draw records from loosely structured tables.
//!
//! - [`dates`]: date cell normalization
//! - [`rows`]: one row of cells to a [`crate::models::DrawRecord`]
//! - [`tables`]: CSV and HTML payloads to rows of cells

pub mod dates;
pub mod rows;
pub mod tables;

pub use dates::{normalize_date, parse_date};
pub use rows::parse_row;
pub use tables::RawTable;
