use futures::future::BoxFuture;
use serde_json::Value;

use crate::dao::storage::StorageResult;

/// Logical key holding the used-question id set.
pub const USED_QUESTIONS_KEY: &str = "used_questions";
/// Key prefix for full game snapshots ("editions").
pub const EDITION_PREFIX: &str = "edition_";
/// Key prefix for timestamped named backups.
pub const BACKUP_PREFIX: &str = "backup_";
/// Logical key holding the shared-access secret.
pub const GAME_PASSWORD_KEY: &str = "game_password";
/// Logical key holding the password gate settings.
pub const PASSWORD_SETTINGS_KEY: &str = "password_settings";

/// Abstraction over the persistence layer, used purely as a key to JSON-blob
/// store. Writes are upserts; a missing key is a valid "not yet initialized"
/// state, not an error.
pub trait SnapshotStore: Send + Sync {
    /// Upsert `value` under `key`.
    fn put(&self, key: String, value: Value) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch the value under `key`, `None` when absent.
    fn get(&self, key: String) -> BoxFuture<'static, StorageResult<Option<Value>>>;
    /// Remove the value under `key`. Removing an absent key succeeds.
    fn delete(&self, key: String) -> BoxFuture<'static, StorageResult<()>>;
    /// List all keys starting with `prefix`.
    fn list_keys(&self, prefix: String) -> BoxFuture<'static, StorageResult<Vec<String>>>;
    /// Cheap liveness probe used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a dropped backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
