//! The key-value storage contract shared by every backend.

use std::future::Future;

use serde_json::{Map, Value};

use crate::types::errors::StorageError;

/// A set of stored items, keyed by top-level storage key.
pub type StorageMap = Map<String, Value>;

/// An asynchronous key-value store holding JSON values under string keys.
///
/// Each call is atomic on its own; there is no transaction spanning several calls,
/// so a read followed by a write can interleave with another writer.
pub trait StorageArea: Send + Sync {
    /// Returns the items stored under `keys`. Absent keys are omitted from the result.
    fn get(&self, keys: &[&str]) -> impl Future<Output = Result<StorageMap, StorageError>> + Send;

    /// Returns every stored item.
    fn get_all(&self) -> impl Future<Output = Result<StorageMap, StorageError>> + Send;

    /// Writes all `items` in one operation, replacing existing values.
    fn set(&self, items: StorageMap) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Deletes the given keys. Missing keys are ignored.
    fn remove(&self, keys: &[&str]) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Deletes every stored item.
    fn clear(&self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Reports whether the runtime hosting a storage namespace can currently be reached.
pub trait ContextProbe: Send + Sync {
    fn is_reachable(&self) -> bool;
}
