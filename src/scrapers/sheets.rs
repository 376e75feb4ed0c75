//! Fetcher for published spreadsheets.
//!
//! A published sheet can be read three ways, and each one can surface tabs
//! the others miss, so all of them run and all of them contribute:
//!
//! 1. **Direct CSV export** of the default view, trying URL rewrites in
//!    order until one answers with usable CSV
//! 2. **Per-sheet CSV export** for every sheet index (`gid`) mentioned in the
//!    page source, or `0` and `1` when none is mentioned
//! 3. **HTML table scan** of the page itself
//!
//! A failing strategy only logs at debug level and contributes nothing.

use crate::config::Settings;
use crate::extract::RawTable;
use crate::scrapers::http::{FetchText, Fetched};
use crate::utils::truncate_for_log;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

static SHEET_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").unwrap());

/// Places a sheet index shows up in page source: hrefs, export links and embedded JSON.
static GID_RES: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"gid=(\d+)").unwrap(),
        Regex::new(r"export\?format=csv&gid=(\d+)").unwrap(),
        Regex::new(r#""gid":\s*"?(\d+)"?"#).unwrap(),
    ]
});

/// Sheet indices tried by the direct export strategy.
const DIRECT_EXPORT_GIDS: u64 = 8;
/// Sheet indices tried when the page mentions none.
const FALLBACK_GIDS: [u64; 2] = [0, 1];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid source url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Csv,
    Html,
}

/// One successfully retrieved body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub kind: PayloadKind,
    /// URL the body was fetched from.
    pub origin: String,
    pub body: String,
}

impl Payload {
    fn csv(origin: &str, fetched: Fetched) -> Self {
        Payload {
            kind: PayloadKind::Csv,
            origin: origin.to_string(),
            body: fetched.body,
        }
    }

    pub fn into_table(self) -> RawTable {
        match self.kind {
            PayloadKind::Csv => RawTable::from_csv(&self.origin, &self.body),
            PayloadKind::Html => RawTable::from_html(&self.origin, &self.body),
        }
    }
}

/// Spreadsheet id from a `/d/<id>/...` path.
pub fn sheet_id(url: &str) -> Option<String> {
    SHEET_ID_RE.captures(url).map(|caps| caps[1].to_string())
}

fn export_url(settings: &Settings, sheet_id: &str, gid: Option<u64>) -> String {
    let base = settings.export_base.trim_end_matches('/');
    match gid {
        Some(gid) => format!("{base}/{sheet_id}/export?format=csv&gid={gid}"),
        None => format!("{base}/{sheet_id}/export?format=csv"),
    }
}

/// CSV export URLs derived from a published sheet URL, most specific first.
pub fn direct_csv_candidates(settings: &Settings, url: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    if url.contains("pubhtml") {
        candidates.push(url.replace("pubhtml?output=html", "pub?output=csv"));
        candidates.push(url.replace("pubhtml?output=html", "pub?output=csv&single=true"));
    }
    if url.contains("/pub") && url.contains("output=html") {
        candidates.push(url.replace("output=html", "output=csv"));
    }
    if let Some(id) = sheet_id(url) {
        candidates.push(export_url(settings, &id, None));
        candidates.extend((0..DIRECT_EXPORT_GIDS).map(|gid| export_url(settings, &id, Some(gid))));
    }
    // an unchanged rewrite would just fetch the HTML page again
    candidates
        .into_iter()
        .filter(|candidate| candidate != url)
        .unique()
        .collect()
}

/// Sheet indices mentioned anywhere in the page source, ascending.
pub fn discover_gids(html: &str) -> Vec<u64> {
    let gids: BTreeSet<u64> = GID_RES
        .iter()
        .flat_map(|re| re.captures_iter(html))
        .filter_map(|caps| caps[1].parse().ok())
        .collect();
    gids.into_iter().collect()
}

/// Run every retrieval strategy against `url`.
///
/// # Arguments
///
/// * `http` - Client used for every request, one at a time
/// * `settings` - Export base and request timeouts
/// * `url` - Published sheet URL
///
/// # Returns
///
/// CSV payloads from the direct and per-sheet exports followed by the HTML
/// of the page itself. An empty vector means every strategy came back empty.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] if `url` is not an absolute
/// `http`/`https` URL. Failed requests are not errors.
#[instrument(level = "info", skip(http, settings))]
pub async fn fetch_payloads<F: FetchText>(
    http: &F,
    settings: &Settings,
    url: &str,
) -> Result<Vec<Payload>, FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }

    let main_html = fetch_main_page(http, settings.page_timeout(), url).await;
    let mut payloads = Vec::new();

    if let Some(payload) = direct_csv(http, settings, url).await {
        payloads.push(payload);
    }

    if let (Some(html), Some(id)) = (main_html.as_deref(), sheet_id(url)) {
        payloads.extend(sheet_csvs(http, settings, &id, html).await);
    }

    if let Some(html) = main_html {
        payloads.push(Payload {
            kind: PayloadKind::Html,
            origin: url.to_string(),
            body: html,
        });
    }

    info!(count = payloads.len(), "Collected sheet payloads");
    Ok(payloads)
}

async fn fetch_main_page<F: FetchText>(http: &F, timeout: Duration, url: &str) -> Option<String> {
    match http.fetch(url, timeout).await {
        Ok(fetched) if fetched.is_success() => Some(fetched.body),
        Ok(fetched) => {
            debug!(status = fetched.status, "Main page returned an error status");
            None
        }
        Err(e) => {
            debug!(error = %e, "Main page fetch failed");
            None
        }
    }
}

/// GET `url` and keep the body only if it looks like CSV.
async fn fetch_csv<F: FetchText>(http: &F, timeout: Duration, url: &str) -> Option<Payload> {
    match http.fetch(url, timeout).await {
        Ok(fetched) if fetched.is_usable_csv() => Some(Payload::csv(url, fetched)),
        Ok(fetched) => {
            debug!(
                %url,
                status = fetched.status,
                preview = %truncate_for_log(&fetched.body, 120),
                "Response is not usable CSV"
            );
            None
        }
        Err(e) => {
            debug!(%url, error = %e, "CSV fetch failed");
            None
        }
    }
}

async fn direct_csv<F: FetchText>(http: &F, settings: &Settings, url: &str) -> Option<Payload> {
    for candidate in direct_csv_candidates(settings, url) {
        if let Some(payload) = fetch_csv(http, settings.page_timeout(), &candidate).await {
            debug!(url = %candidate, "Direct CSV export succeeded");
            return Some(payload);
        }
    }
    None
}

async fn sheet_csvs<F: FetchText>(
    http: &F,
    settings: &Settings,
    sheet_id: &str,
    html: &str,
) -> Vec<Payload> {
    let mut gids = discover_gids(html);
    if gids.is_empty() {
        gids = FALLBACK_GIDS.to_vec();
    }
    debug!(?gids, "Sheet indices to export");

    let mut payloads = Vec::new();
    for gid in gids {
        let url = export_url(settings, sheet_id, Some(gid));
        if let Some(payload) = fetch_csv(http, settings.sheet_timeout(), &url).await {
            payloads.push(payload);
        }
    }
    payloads
}
