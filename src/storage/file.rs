//! JSON-file document store.
//!
//! Each collection is one file, `{dir}/{collection}.json`, holding an object
//! that maps `_id` to document. Writes go to a sibling temp file first and
//! are renamed into place.

use super::{DrawStore, StoreError};
use crate::models::{DrawDocument, UpsertSummary};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, instrument};

type Collection = BTreeMap<String, DrawDocument>;

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{collection}.json"))
    }

    async fn read_collection(&self, collection: &str) -> Result<Collection, StoreError> {
        match tokio::fs::read_to_string(self.collection_path(collection)).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Collection::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_collection(&self, collection: &str, docs: &Collection) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.collection_path(collection);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(docs)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

impl DrawStore for FileStore {
    /// File writes either persist the whole batch or fail it, so `ordered`
    /// makes no difference here.
    #[instrument(level = "debug", skip(self, docs), fields(docs = docs.len()))]
    async fn upsert_documents(
        &self,
        collection: &str,
        docs: Vec<DrawDocument>,
        _ordered: bool,
    ) -> Result<UpsertSummary, StoreError> {
        let mut stored = self.read_collection(collection).await?;
        let mut summary = UpsertSummary {
            n_ops: docs.len(),
            ..UpsertSummary::default()
        };

        for doc in docs {
            match stored.get(&doc.id) {
                Some(existing) => {
                    summary.matched += 1;
                    if existing != &doc {
                        summary.modified += 1;
                    }
                }
                None => summary.upserted += 1,
            }
            stored.insert(doc.id.clone(), doc);
        }

        self.write_collection(collection, &stored).await?;
        debug!(total = stored.len(), "Collection written");
        Ok(summary)
    }

    async fn load_documents(&self, collection: &str) -> Result<Vec<DrawDocument>, StoreError> {
        Ok(self.read_collection(collection).await?.into_values().collect())
    }
}
