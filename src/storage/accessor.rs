//! Shared handle to a storage backend.
//!
//! Mirrors the host storage API: every call completes asynchronously and the
//! outcome of the most recent call stays observable through [`StorageAccessor::last_error`].
//!
//! Clones share one write lock. Every read-modify-write in a context holds it,
//! so the stores, the maintenance engine and data transfer never interleave
//! their writes. Accessors built separately over the same backend model
//! separate contexts and do not share it.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use super::area::{ContextProbe, StorageArea, StorageMap};
use crate::types::errors::StorageError;

/// Cloneable handle to a [`StorageArea`] that tracks the last error.
pub struct StorageAccessor<S> {
    area: Arc<S>,
    last_error: Arc<Mutex<Option<StorageError>>>,
    write_lock: Arc<AsyncMutex<()>>,
}

impl<S> Clone for StorageAccessor<S> {
    fn clone(&self) -> Self {
        Self {
            area: Arc::clone(&self.area),
            last_error: Arc::clone(&self.last_error),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

impl<S: StorageArea> StorageAccessor<S> {
    pub fn new(area: S) -> Self {
        Self::from_arc(Arc::new(area))
    }

    pub fn from_arc(area: Arc<S>) -> Self {
        Self {
            area,
            last_error: Arc::new(Mutex::new(None)),
            write_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    /// The backend behind this accessor.
    pub fn area(&self) -> &Arc<S> {
        &self.area
    }

    /// Waits for exclusive write access to the namespace within this context.
    pub async fn lock_writes(&self) -> AsyncMutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Error reported by the most recent call, cleared by the next successful one.
    pub fn last_error(&self) -> Option<StorageError> {
        self.last_error.lock().ok().and_then(|e| e.clone())
    }

    fn record<T>(&self, result: Result<T, StorageError>) -> Result<T, StorageError> {
        if let Ok(mut slot) = self.last_error.lock() {
            *slot = result.as_ref().err().cloned();
        }
        result
    }

    pub async fn get(&self, keys: &[&str]) -> Result<StorageMap, StorageError> {
        let result = self.area.get(keys).await;
        self.record(result)
    }

    pub async fn get_all(&self) -> Result<StorageMap, StorageError> {
        let result = self.area.get_all().await;
        self.record(result)
    }

    pub async fn set(&self, items: StorageMap) -> Result<(), StorageError> {
        let result = self.area.set(items).await;
        self.record(result)
    }

    pub async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let result = self.area.remove(keys).await;
        self.record(result)
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let result = self.area.clear().await;
        self.record(result)
    }

    /// Reads one key and decodes it. A missing key yields `None`.
    pub async fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let mut items = self.get(&[key]).await?;
        match items.remove(key) {
            Some(Value::Null) | None => Ok(None),
            Some(value) => {
                let decoded = serde_json::from_value(value)
                    .map_err(|e| StorageError::Serialization(format!("'{}': {}", key, e)));
                self.record(decoded.map(Some))
            }
        }
    }

    /// Encodes `value` and writes it under `key`.
    pub async fn set_typed<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = serde_json::to_value(value)?;
        let mut items = StorageMap::new();
        items.insert(key.to_string(), encoded);
        self.set(items).await
    }
}

impl<S: ContextProbe> ContextProbe for StorageAccessor<S> {
    fn is_reachable(&self) -> bool {
        self.area.is_reachable()
    }
}
