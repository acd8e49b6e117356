use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::ClientOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::{
    snapshot_store::SnapshotStore,
    storage::{StorageError, StorageResult},
};

const DEFAULT_DB_NAME: &str = "quiz_royale";
const COLLECTION_NAME: &str = "snapshots";

/// Document stored per logical key. The JSON payload is kept as text so the
/// store stays a plain key to blob mapping without a bson round-trip.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    #[serde(rename = "_id")]
    key: String,
    data: String,
}

/// MongoDB-backed implementation of [`SnapshotStore`].
#[derive(Clone)]
pub struct MongoSnapshotStore {
    database: Database,
}

impl MongoSnapshotStore {
    fn collection(&self) -> Collection<SnapshotDocument> {
        self.database.collection(COLLECTION_NAME)
    }
}

/// Connect to MongoDB and wrap the target database as a snapshot store.
pub async fn connect(uri: &str, db_name: Option<&str>) -> StorageResult<MongoSnapshotStore> {
    let options = ClientOptions::parse(uri)
        .await
        .map_err(|err| StorageError::unavailable("invalid MongoDB URI".into(), err))?;
    let client = Client::with_options(options)
        .map_err(|err| StorageError::unavailable("failed to build MongoDB client".into(), err))?;
    let database = client.database(db_name.unwrap_or(DEFAULT_DB_NAME));

    database
        .run_command(doc! {"ping": 1})
        .await
        .map_err(|err| StorageError::unavailable("MongoDB ping failed".into(), err))?;

    Ok(MongoSnapshotStore { database })
}

impl SnapshotStore for MongoSnapshotStore {
    fn put(&self, key: String, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        let collection = self.collection();
        Box::pin(async move {
            let document = SnapshotDocument {
                key: key.clone(),
                data: value.to_string(),
            };
            collection
                .replace_one(doc! {"_id": &key}, &document)
                .upsert(true)
                .await
                .map_err(|err| {
                    StorageError::unavailable(format!("failed to write key `{key}`"), err)
                })?;
            Ok(())
        })
    }

    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let collection = self.collection();
        Box::pin(async move {
            let found = collection
                .find_one(doc! {"_id": &key})
                .await
                .map_err(|err| {
                    StorageError::unavailable(format!("failed to read key `{key}`"), err)
                })?;
            match found {
                Some(document) => {
                    let value = serde_json::from_str(&document.data)
                        .map_err(|err| StorageError::corrupt(key, err))?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        })
    }

    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<()>> {
        let collection = self.collection();
        Box::pin(async move {
            collection
                .delete_one(doc! {"_id": &key})
                .await
                .map_err(|err| {
                    StorageError::unavailable(format!("failed to delete key `{key}`"), err)
                })?;
            Ok(())
        })
    }

    fn list_keys(&self, prefix: String) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let collection = self.collection();
        Box::pin(async move {
            // The snapshot collection stays small (a handful of editions and
            // backups), so filtering client-side avoids regex-escaping keys.
            let mut cursor = collection
                .find(doc! {})
                .await
                .map_err(|err| StorageError::unavailable("failed to list keys".into(), err))?;

            let mut keys = Vec::new();
            while let Some(document) = cursor
                .try_next()
                .await
                .map_err(|err| StorageError::unavailable("failed to iterate keys".into(), err))?
            {
                if document.key.starts_with(&prefix) {
                    keys.push(document.key);
                }
            }
            keys.sort();
            Ok(keys)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let database = self.database.clone();
        Box::pin(async move {
            database
                .run_command(doc! {"ping": 1})
                .await
                .map_err(|err| StorageError::unavailable("MongoDB ping failed".into(), err))?;
            Ok(())
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        // The driver pools and re-establishes connections internally; a ping
        // both validates and warms the pool.
        self.health_check()
    }
}
