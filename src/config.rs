//! Runtime settings.
//!
//! Values come from built-in defaults, then an optional YAML file, then
//! command-line flags and environment variables (see [`crate::cli`]). The
//! resulting [`Settings`] is passed explicitly to every component.

use crate::models::Game;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument};

/// Published Primitiva results sheet.
pub const DEFAULT_URL_1: &str = "https://docs.google.com/spreadsheets/u/0/d/1MVwwP3fsPK6Mcc3F0Fv1W6t92-PiTvfXjnZx0BAJOu0/pub?output=html&widget=true";
/// Published Bonoloto results sheet.
pub const DEFAULT_URL_2: &str = "https://docs.google.com/spreadsheets/u/0/d/175SqVQ3E7PFZ0ebwr2o98Kb6YEAwSUykGFh6ascEfI0/pub?output=html&widget=true";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0 Safari/537.36";

/// All tunables of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Sheet behind source alias `1`.
    pub url_1: String,
    /// Sheet behind source alias `2`.
    pub url_2: String,
    pub user_agent: String,
    /// Prefix of per-sheet CSV export URLs, followed by `/<sheet id>/export?...`.
    pub export_base: String,
    /// Timeout for the main page and direct CSV export requests.
    pub page_timeout_secs: u64,
    /// Timeout for per-sheet CSV export requests.
    pub sheet_timeout_secs: u64,
    /// Root of `raw/`, `processed/` and `store/`.
    pub data_dir: String,
    /// IANA zone deciding what "today" is for the processed output.
    pub timezone: String,
    /// MongoDB connection string; the file store is used when absent.
    pub mongo_uri: Option<String>,
    pub mongo_db: String,
    /// Collections are named `{collection_base}_{prefix}`.
    pub collection_base: String,
    pub server_selection_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            url_1: DEFAULT_URL_1.to_string(),
            url_2: DEFAULT_URL_2.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            export_base: "https://docs.google.com/spreadsheets/d".to_string(),
            page_timeout_secs: 15,
            sheet_timeout_secs: 12,
            data_dir: "data".to_string(),
            timezone: "Europe/Madrid".to_string(),
            mongo_uri: None,
            mongo_db: "loterias".to_string(),
            collection_base: "resultados_loterias".to_string(),
            server_selection_timeout_secs: 5,
        }
    }
}

/// One spreadsheet URL and the game label stamped on its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub url: String,
    pub game: String,
}

impl Settings {
    /// Defaults, overlaid with the YAML file at `path` when given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        let text = tokio::fs::read_to_string(path).await?;
        let settings = Self::from_yaml(&text)?;
        info!(path, "Loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn sheet_timeout(&self) -> Duration {
        Duration::from_secs(self.sheet_timeout_secs)
    }

    #[cfg(feature = "mongo")]
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_secs(self.server_selection_timeout_secs)
    }

    pub fn reference_tz(&self) -> Result<Tz, Box<dyn Error>> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| format!("unknown timezone '{}'", self.timezone).into())
    }

    pub fn raw_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("processed")
    }

    pub fn store_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("store")
    }

    pub fn collection_name(&self, prefix: &str) -> String {
        format!("{}_{}", self.collection_base, prefix)
    }

    /// Expand a source argument into concrete URLs.
    ///
    /// `arg` is `1`, `2`, a literal URL, or several of those joined by `+`.
    /// Without an explicit `game`, alias `2` is labelled Bonoloto and
    /// everything else Primitiva.
    pub fn resolve_sources(&self, arg: &str, game: Option<&str>) -> Vec<SourceSpec> {
        arg.split('+')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                let url = match part {
                    "1" => self.url_1.clone(),
                    "2" => self.url_2.clone(),
                    literal => literal.to_string(),
                };
                let game = game
                    .map(str::to_string)
                    .unwrap_or_else(|| Game::from_alias(part).to_string());
                SourceSpec { url, game }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.page_timeout(), Duration::from_secs(15));
        assert_eq!(s.sheet_timeout(), Duration::from_secs(12));
        assert_eq!(s.collection_name("bonoloto"), "resultados_loterias_bonoloto");
        assert_eq!(s.raw_dir(), PathBuf::from("data").join("raw"));
        assert!(s.mongo_uri.is_none());
        assert_eq!(s.reference_tz().unwrap(), chrono_tz::Europe::Madrid);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "url_1: https://example.com/sheet\nmongo_db: pruebas\npage_timeout_secs: 3\n";
        let s = Settings::from_yaml(yaml).unwrap();
        assert_eq!(s.url_1, "https://example.com/sheet");
        assert_eq!(s.mongo_db, "pruebas");
        assert_eq!(s.page_timeout_secs, 3);
        assert_eq!(s.url_2, DEFAULT_URL_2);
        assert_eq!(s.collection_base, "resultados_loterias");
    }

    #[test]
    fn test_unknown_timezone() {
        let s = Settings {
            timezone: "Mars/Olympus".to_string(),
            ..Settings::default()
        };
        assert!(s.reference_tz().is_err());
    }

    #[test]
    fn test_resolve_aliases() {
        let s = Settings::default();
        let sources = s.resolve_sources("1+ 2 +", None);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].url, DEFAULT_URL_1);
        assert_eq!(sources[0].game, "primitiva");
        assert_eq!(sources[1].url, DEFAULT_URL_2);
        assert_eq!(sources[1].game, "bonoloto");
    }

    #[test]
    fn test_resolve_literal_with_game_override() {
        let s = Settings::default();
        let sources = s.resolve_sources("https://example.com/a+2", Some("historico"));
        assert_eq!(sources[0].url, "https://example.com/a");
        assert_eq!(sources[0].game, "historico");
        assert_eq!(sources[1].game, "historico");
    }

    #[tokio::test]
    async fn test_load_without_path() {
        let s = Settings::load(None).await.unwrap();
        assert_eq!(s, Settings::default());
    }
}
