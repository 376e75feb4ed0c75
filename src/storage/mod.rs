//! Persistence of draws as documents keyed by a deterministic `_id`.
//!
//! The `_id` of a draw is `"{date}:{n1,n2,n3,n4,n5,n6}"`, so re-running an
//! extraction replaces the same documents instead of adding new ones.
//! Draws read back from files may lack a date or numbers; those get the
//! `no_fecha` / `no_nums` placeholders and collide with each other.
//!
//! # Backends
//!
//! | Backend | Module | Selected when |
//! |---------|--------|---------------|
//! | JSON files | [`file`] | no `mongo_uri` is configured |
//! | MongoDB | `mongo` | `mongo_uri` is set; builds without the `mongo` feature refuse it |

use crate::config::Settings;
use crate::extract::normalize_date;
use crate::models::{DrawDocument, DrawRecord, LooseDraw, UpsertSummary};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use thiserror::Error;
use tracing::{info, instrument, warn};

pub mod file;
#[cfg(feature = "mongo")]
pub mod mongo;

pub use file::FileStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached at all; fatal for the caller.
    #[error("store unreachable: {0}")]
    Connection(String),
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for document stores that can upsert draws by `_id`.
pub trait DrawStore {
    /// Replace-or-insert every document by `_id`.
    ///
    /// With `ordered == false` a failed operation is recorded in the summary
    /// and the rest of the batch still runs; with `ordered == true` the
    /// batch stops at the first failure.
    async fn upsert_documents(
        &self,
        collection: &str,
        docs: Vec<DrawDocument>,
        ordered: bool,
    ) -> Result<UpsertSummary, StoreError>;

    /// Every document currently in `collection`.
    async fn load_documents(&self, collection: &str) -> Result<Vec<DrawDocument>, StoreError>;
}

/// `_id` for a date and numbers, with placeholders for missing parts.
pub fn document_id(date: Option<&str>, numbers: &[u32]) -> String {
    let date = date.unwrap_or("no_fecha");
    if numbers.is_empty() {
        format!("{date}:no_nums")
    } else {
        format!("{date}:{}", numbers.iter().join(","))
    }
}

/// Storage document for a loosely typed draw.
///
/// The date is normalized again and numbers beyond the sixth are dropped.
pub fn make_document(draw: &LooseDraw, inserted_at: DateTime<Utc>) -> DrawDocument {
    let date = draw.date.as_deref().and_then(normalize_date);
    let numbers: Vec<u32> = draw.numbers.iter().copied().take(6).collect();
    DrawDocument {
        id: document_id(date.as_deref(), &numbers),
        game: draw.game.clone(),
        date,
        numbers,
        bonus_number: draw.bonus_number,
        reseed_number: draw.reseed_number,
        source: draw.source.clone().unwrap_or_default(),
        inserted_at,
    }
}

pub fn record_document(record: &DrawRecord, inserted_at: DateTime<Utc>) -> DrawDocument {
    make_document(&LooseDraw::from(record), inserted_at)
}

/// Upsert extracted draws into `collection`.
///
/// # Arguments
///
/// * `store` - Backend receiving the documents
/// * `collection` - Target collection, usually [`Settings::collection_name`]
/// * `records` - Canonical draws; each becomes one document keyed by `_id`
/// * `ordered` - Stop at the first failed operation instead of continuing
///
/// # Returns
///
/// Matched, modified and upserted counts plus per-operation failures. An
/// empty `records` slice is not submitted and yields an empty summary.
///
/// # Errors
///
/// Returns [`StoreError`] if the store is unreachable or its files cannot be
/// read or written.
#[instrument(level = "info", skip(store, records), fields(count = records.len()))]
pub async fn upsert_records<S: DrawStore>(
    store: &S,
    collection: &str,
    records: &[DrawRecord],
    ordered: bool,
) -> Result<UpsertSummary, StoreError> {
    let now = Utc::now();
    let docs = records.iter().map(|r| record_document(r, now)).collect();
    submit(store, collection, docs, ordered).await
}

/// Upsert draws read back from local files into `collection`.
#[instrument(level = "info", skip(store, draws), fields(count = draws.len()))]
pub async fn upsert_loose<S: DrawStore>(
    store: &S,
    collection: &str,
    draws: &[LooseDraw],
    ordered: bool,
) -> Result<UpsertSummary, StoreError> {
    let now = Utc::now();
    let docs = draws.iter().map(|d| make_document(d, now)).collect();
    submit(store, collection, docs, ordered).await
}

async fn submit<S: DrawStore>(
    store: &S,
    collection: &str,
    docs: Vec<DrawDocument>,
    ordered: bool,
) -> Result<UpsertSummary, StoreError> {
    if docs.is_empty() {
        warn!(collection, "No documents to upsert");
        return Ok(UpsertSummary::default());
    }
    let low_confidence = docs.iter().filter(|d| d.is_low_confidence()).count();
    if low_confidence > 0 {
        warn!(collection, low_confidence, "Some documents lack a date or numbers");
    }

    let summary = store.upsert_documents(collection, docs, ordered).await?;
    info!(
        collection,
        n_ops = summary.n_ops,
        matched = summary.matched,
        modified = summary.modified,
        upserted = summary.upserted,
        failed = summary.write_errors.len(),
        "Upsert finished"
    );
    Ok(summary)
}

/// The store selected by the settings.
#[derive(Debug)]
pub enum Backend {
    File(FileStore),
    #[cfg(feature = "mongo")]
    Mongo(mongo::MongoStore),
}

impl Backend {
    pub async fn open(settings: &Settings) -> Result<Self, StoreError> {
        match &settings.mongo_uri {
            #[cfg(feature = "mongo")]
            Some(uri) => {
                let store = mongo::MongoStore::connect(
                    uri,
                    &settings.mongo_db,
                    settings.server_selection_timeout(),
                )
                .await?;
                Ok(Backend::Mongo(store))
            }
            #[cfg(not(feature = "mongo"))]
            Some(_) => Err(StoreError::Connection(
                "mongo_uri is set but this build lacks the `mongo` feature".to_string(),
            )),
            None => Ok(Backend::File(FileStore::new(settings.store_dir()))),
        }
    }
}

impl DrawStore for Backend {
    async fn upsert_documents(
        &self,
        collection: &str,
        docs: Vec<DrawDocument>,
        ordered: bool,
    ) -> Result<UpsertSummary, StoreError> {
        match self {
            Backend::File(store) => store.upsert_documents(collection, docs, ordered).await,
            #[cfg(feature = "mongo")]
            Backend::Mongo(store) => store.upsert_documents(collection, docs, ordered).await,
        }
    }

    async fn load_documents(&self, collection: &str) -> Result<Vec<DrawDocument>, StoreError> {
        match self {
            Backend::File(store) => store.load_documents(collection).await,
            #[cfg(feature = "mongo")]
            Backend::Mongo(store) => store.load_documents(collection).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(date: (i32, u32, u32), numbers: [u32; 6], source: &str) -> DrawRecord {
        DrawRecord {
            game: "primitiva".to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            numbers,
            bonus_number: Some(7),
            reseed_number: Some(2),
            source: Some(source.to_string()),
        }
    }

    #[test]
    fn test_document_id() {
        assert_eq!(document_id(Some("2013-08-14"), &[3, 15, 23, 26, 34, 38]), "2013-08-14:3,15,23,26,34,38");
        assert_eq!(document_id(None, &[1, 2]), "no_fecha:1,2");
        assert_eq!(document_id(Some("2013-08-14"), &[]), "2013-08-14:no_nums");
    }

    #[test]
    fn test_record_document_fields() {
        let now = Utc::now();
        let doc = record_document(&record((2013, 8, 14), [3, 15, 23, 26, 34, 38], "https://s.test"), now);
        assert_eq!(doc.id, "2013-08-14:3,15,23,26,34,38");
        assert_eq!(doc.date.as_deref(), Some("2013-08-14"));
        assert_eq!(doc.numbers, vec![3, 15, 23, 26, 34, 38]);
        assert_eq!(doc.bonus_number, Some(7));
        assert_eq!(doc.source, "https://s.test");
        assert_eq!(doc.inserted_at, now);
        assert!(!doc.is_low_confidence());
    }

    #[test]
    fn test_make_document_normalizes_loose_fields() {
        let draw = LooseDraw {
            game: "bonoloto".to_string(),
            date: Some("14/08/2013".to_string()),
            numbers: vec![1, 2, 3, 4, 5, 6, 7, 8],
            ..LooseDraw::default()
        };
        let doc = make_document(&draw, Utc::now());
        assert_eq!(doc.id, "2013-08-14:1,2,3,4,5,6");
        assert_eq!(doc.source, "");

        let undated = LooseDraw {
            date: Some("mañana".to_string()),
            ..LooseDraw::default()
        };
        let doc = make_document(&undated, Utc::now());
        assert_eq!(doc.id, "no_fecha:no_nums");
        assert_eq!(doc.date, None);
        assert!(doc.is_low_confidence());
    }

    #[tokio::test]
    async fn test_upserts_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let records = vec![
            record((2013, 8, 14), [3, 15, 23, 26, 34, 38], "csv"),
            record((2013, 8, 15), [1, 2, 3, 4, 5, 6], "html"),
        ];

        let first = upsert_records(&store, "resultados_primitiva", &records, false).await.unwrap();
        assert_eq!(first.n_ops, 2);
        assert_eq!(first.upserted, 2);
        assert_eq!(first.matched, 0);
        assert!(first.ok());

        let second = upsert_records(&store, "resultados_primitiva", &records, false).await.unwrap();
        assert_eq!(second.upserted, 0);
        assert_eq!(second.matched, 2);

        let stored = store.load_documents("resultados_primitiva").await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_submitted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store"));
        let summary = upsert_records(&store, "resultados_primitiva", &[], false).await.unwrap();
        assert_eq!(summary, UpsertSummary::default());
        assert!(!summary.ok());
        assert!(!dir.path().join("store").exists());
    }

    #[tokio::test]
    async fn test_backend_defaults_to_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().to_string_lossy().into_owned(),
            ..Settings::default()
        };
        let backend = Backend::open(&settings).await.unwrap();
        assert!(matches!(backend, Backend::File(_)));
        let draws = [LooseDraw {
            game: "primitiva".to_string(),
            date: Some("2013-08-14".to_string()),
            numbers: vec![3, 15, 23, 26, 34, 38],
            ..LooseDraw::default()
        }];
        let summary = upsert_loose(&backend, "resultados_primitiva", &draws, true).await.unwrap();
        assert_eq!(summary.upserted, 1);
        assert!(settings.store_dir().join("resultados_primitiva.json").exists());
    }

    #[cfg(not(feature = "mongo"))]
    #[tokio::test]
    async fn test_mongo_uri_without_mongo_support_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().to_string_lossy().into_owned(),
            mongo_uri: Some("mongodb://localhost:27017".to_string()),
            ..Settings::default()
        };
        let err = Backend::open(&settings).await.unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
        assert!(!settings.store_dir().exists());
    }
}
