//! Command-line interface definitions for lottery_sheets.
//!
//! Global options override values from the optional YAML settings file and
//! can also come from environment variables (or a `.env` file).

use crate::config::Settings;
use crate::features::DEFAULT_WINDOW;
use crate::models::Game;
use clap::{Args, Parser, Subcommand};

/// Scrape published lottery result sheets into files and a document store.
///
/// # Examples
///
/// ```sh
/// # Primitiva sheet into the store, plus raw JSON and processed CSV
/// lottery_sheets scrape --which 1 --save
///
/// # Both default sheets under one prefix, files only
/// lottery_sheets scrape --url "1+2" --name historico --no-store --save
///
/// # Feature matrix from the processed Bonoloto CSV
/// lottery_sheets features --prefix bonoloto --window 10
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a settings YAML file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Sheet behind source alias `1`
    #[arg(long, env = "URL_SHEET_1", global = true)]
    pub url_1: Option<String>,

    /// Sheet behind source alias `2`
    #[arg(long, env = "URL_SHEET_2", global = true)]
    pub url_2: Option<String>,

    /// MongoDB connection string (requires the `mongo` feature)
    #[arg(long, env = "MONGO_URI", global = true)]
    pub mongo_uri: Option<String>,

    /// Database name
    #[arg(long, env = "MONGO_DB", global = true)]
    pub mongo_db: Option<String>,

    /// Collection name prefix; collections are `{base}_{prefix}`
    #[arg(long, env = "MONGO_COLL_BASE", global = true)]
    pub collection_base: Option<String>,

    /// Root directory for raw, processed and store files
    #[arg(long, env = "LOTTERY_DATA_DIR", global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract draws from sheets, then store and/or save them
    Scrape(ScrapeArgs),
    /// Load saved files into the store
    Import(ImportArgs),
    /// Write a stored collection back out to files
    Export(ExportArgs),
    /// Build window features and labels from a processed CSV
    Features(FeaturesArgs),
}

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Source alias: `1`, `2`, or `1+2`
    #[arg(short, long, default_value = "1")]
    pub which: String,

    /// Literal sheet URL(s), `+`-separated; takes precedence over --which
    #[arg(short, long, conflicts_with = "which")]
    pub url: Option<String>,

    /// Output prefix and game label; defaults to the first source's game
    #[arg(short, long)]
    pub name: Option<String>,

    /// Skip the store upsert
    #[arg(long)]
    pub no_store: bool,

    /// Write raw JSON and processed CSV
    #[arg(long)]
    pub save: bool,

    /// Stop the upsert at the first failed operation
    #[arg(long)]
    pub ordered: bool,
}

impl ScrapeArgs {
    pub fn source_arg(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.which)
    }
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    #[arg(short, long, value_enum, default_value_t = Game::Primitiva)]
    pub game: Game,

    /// File and collection prefix; defaults to the game name
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Stop the upsert at the first failed operation
    #[arg(long)]
    pub ordered: bool,
}

impl ImportArgs {
    pub fn prefix(&self) -> String {
        self.prefix.clone().unwrap_or_else(|| self.game.to_string())
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(short, long, value_enum, default_value_t = Game::Primitiva)]
    pub game: Game,

    /// File and collection prefix; defaults to the game name
    #[arg(short, long)]
    pub prefix: Option<String>,
}

impl ExportArgs {
    pub fn prefix(&self) -> String {
        self.prefix.clone().unwrap_or_else(|| self.game.to_string())
    }
}

#[derive(Args, Debug)]
pub struct FeaturesArgs {
    /// Prefix of the processed CSV to read
    #[arg(short, long, default_value = "primitiva")]
    pub prefix: String,

    /// Number of previous draws counted per row
    #[arg(short = 'k', long, default_value_t = DEFAULT_WINDOW)]
    pub window: usize,
}

impl Cli {
    /// Overlay the global options that were given onto `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.url_1 {
            settings.url_1 = url.clone();
        }
        if let Some(url) = &self.url_2 {
            settings.url_2 = url.clone();
        }
        if let Some(uri) = &self.mongo_uri {
            settings.mongo_uri = Some(uri.clone());
        }
        if let Some(db) = &self.mongo_db {
            settings.mongo_db = db.clone();
        }
        if let Some(base) = &self.collection_base {
            settings.collection_base = base.clone();
        }
        if let Some(dir) = &self.data_dir {
            settings.data_dir = dir.clone();
        }
    }
}
