//! Retrieval of raw result tables from published spreadsheets.
//!
//! | Module | Role |
//! |--------|------|
//! | [`http`] | [`http::FetchText`] seam and the `reqwest`-backed client |
//! | [`sheets`] | the three retrieval strategies for one sheet URL |
//!
//! Requests are issued one at a time; a failed request only removes its own
//! strategy's contribution.

pub mod http;
pub mod sheets;
