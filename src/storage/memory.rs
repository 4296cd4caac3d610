//! In-process storage backend.
//!
//! Besides holding data, `MemoryStorage` can simulate a host that misbehaves:
//! an unreachable runtime, a fixed failure on every call, or slow calls. The
//! availability guard and the stores are exercised against these conditions.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use super::area::{ContextProbe, StorageArea, StorageMap};
use crate::types::errors::StorageError;

#[derive(Default)]
struct Behaviour {
    fault: Option<StorageError>,
    latency: Option<Duration>,
}

/// Key-value storage held in memory.
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, Value>>,
    behaviour: Mutex<Behaviour>,
    reachable: AtomicBool,
    operations: AtomicUsize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            behaviour: Mutex::new(Behaviour::default()),
            reachable: AtomicBool::new(true),
            operations: AtomicUsize::new(0),
        }
    }

    /// Creates a store pre-populated with `items`.
    pub fn with_items(items: StorageMap) -> Self {
        let storage = Self::new();
        if let Ok(mut map) = storage.items.lock() {
            map.extend(items);
        }
        storage
    }

    /// Makes every subsequent call fail with `fault` until cleared with `None`.
    pub fn set_fault(&self, fault: Option<StorageError>) {
        if let Ok(mut b) = self.behaviour.lock() {
            b.fault = fault;
        }
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut b) = self.behaviour.lock() {
            b.latency = latency;
        }
    }

    /// Controls what [`ContextProbe::is_reachable`] reports.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of storage calls that reached this backend.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Counts the call, waits out any configured latency, then surfaces any configured fault.
    async fn begin(&self) -> Result<(), StorageError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        let (fault, latency) = match self.behaviour.lock() {
            Ok(b) => (b.fault.clone(), b.latency),
            Err(e) => return Err(StorageError::Backend(e.to_string())),
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match fault {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn lock_items(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Value>>, StorageError> {
        self.items
            .lock()
            .map_err(|e| StorageError::Backend(e.to_string()))
    }
}

impl StorageArea for MemoryStorage {
    async fn get(&self, keys: &[&str]) -> Result<StorageMap, StorageError> {
        self.begin().await?;
        let items = self.lock_items()?;
        let mut result = StorageMap::new();
        for key in keys {
            if let Some(value) = items.get(*key) {
                result.insert((*key).to_string(), value.clone());
            }
        }
        Ok(result)
    }

    async fn get_all(&self) -> Result<StorageMap, StorageError> {
        self.begin().await?;
        let items = self.lock_items()?;
        Ok(items.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    async fn set(&self, new_items: StorageMap) -> Result<(), StorageError> {
        self.begin().await?;
        let mut items = self.lock_items()?;
        items.extend(new_items);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.begin().await?;
        let mut items = self.lock_items()?;
        for key in keys {
            items.remove(*key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.begin().await?;
        self.lock_items()?.clear();
        Ok(())
    }
}

impl ContextProbe for MemoryStorage {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}
