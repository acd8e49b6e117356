use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::Arc;

use crate::dao::{snapshot_store::SnapshotStore, storage::StorageResult};

/// In-memory key/value store.
///
/// Backs tests and `--no-default-features` builds where no real database is
/// configured; contents live for the process lifetime only.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn put(&self, key: String, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            entries.insert(key, value);
            Ok(())
        })
    }

    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let entries = self.entries.clone();
        Box::pin(async move { Ok(entries.get(&key).map(|entry| entry.value().clone())) })
    }

    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<()>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            entries.remove(&key);
            Ok(())
        })
    }

    fn list_keys(&self, prefix: String) -> BoxFuture<'static, StorageResult<Vec<String>>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            let mut keys: Vec<String> = entries
                .iter()
                .map(|entry| entry.key().clone())
                .filter(|key| key.starts_with(&prefix))
                .collect();
            keys.sort();
            Ok(keys)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = MemoryStore::new();
        assert!(store.get("absent".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_is_an_upsert() {
        let store = MemoryStore::new();
        store.put("k".into(), json!(1)).await.unwrap();
        store.put("k".into(), json!(2)).await.unwrap();
        assert_eq!(store.get("k".into()).await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn list_keys_filters_by_prefix() {
        let store = MemoryStore::new();
        store.put("edition_alpha".into(), json!({})).await.unwrap();
        store.put("edition_beta".into(), json!({})).await.unwrap();
        store.put("backup_1".into(), json!({})).await.unwrap();

        let keys = store.list_keys("edition_".into()).await.unwrap();
        assert_eq!(keys, vec!["edition_alpha", "edition_beta"]);
    }

    #[tokio::test]
    async fn deleting_an_absent_key_succeeds() {
        let store = MemoryStore::new();
        store.delete("ghost".into()).await.unwrap();
    }
}
