//! MongoDB document store, enabled with the `mongo` feature.

use super::{DrawStore, StoreError};
use crate::models::{DrawDocument, UpsertSummary, WriteFailure};
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    database: String,
}

fn is_connectivity(e: &MongoError) -> bool {
    matches!(*e.kind, ErrorKind::ServerSelection { .. } | ErrorKind::Io(_))
}

impl MongoStore {
    /// Connect and ping; an unreachable server is a [`StoreError::Connection`].
    #[instrument(level = "info", skip(uri))]
    pub async fn connect(uri: &str, database: &str, server_selection_timeout: Duration) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        options.server_selection_timeout = Some(server_selection_timeout);
        let client = Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;

        client
            .database(database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        info!(database, "Connected to MongoDB");

        Ok(Self {
            client,
            database: database.to_string(),
        })
    }

    fn collection(&self, name: &str) -> Collection<DrawDocument> {
        self.client.database(&self.database).collection(name)
    }
}

impl DrawStore for MongoStore {
    #[instrument(level = "debug", skip(self, docs), fields(docs = docs.len()))]
    async fn upsert_documents(
        &self,
        collection: &str,
        docs: Vec<DrawDocument>,
        ordered: bool,
    ) -> Result<UpsertSummary, StoreError> {
        let coll = self.collection(collection);
        let mut summary = UpsertSummary {
            n_ops: docs.len(),
            ..UpsertSummary::default()
        };

        for (index, d) in docs.iter().enumerate() {
            match coll.replace_one(doc! { "_id": d.id.as_str() }, d).upsert(true).await {
                Ok(result) => {
                    summary.matched += result.matched_count;
                    summary.modified += result.modified_count;
                    if result.upserted_id.is_some() {
                        summary.upserted += 1;
                    }
                }
                Err(e) if is_connectivity(&e) => return Err(StoreError::Connection(e.to_string())),
                Err(e) => {
                    warn!(index, id = %d.id, error = %e, "Upsert operation failed");
                    summary.write_errors.push(WriteFailure {
                        index,
                        id: d.id.clone(),
                        message: e.to_string(),
                    });
                    if ordered {
                        break;
                    }
                }
            }
        }
        Ok(summary)
    }

    async fn load_documents(&self, collection: &str) -> Result<Vec<DrawDocument>, StoreError> {
        let cursor = self
            .collection(collection)
            .find(doc! {})
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}
