//! vidmark storage layer.
//!
//! A single key-value namespace holding JSON values, reachable through the
//! [`StorageArea`] trait. Two backends are provided:
//!
//! - [`MemoryStorage`]: process-local, used by tests and short-lived contexts.
//! - [`SqliteStorage`]: durable, one row per key in a SQLite table.
//!
//! Components never talk to a backend directly; they go through a
//! [`StorageAccessor`], which records the outcome of the most recent call.
//!
//! # Usage
//!
//! ```no_run
//! use vidmark::storage::{SqliteStorage, StorageAccessor};
//!
//! let area = SqliteStorage::open("vidmark.db").expect("failed to open storage");
//! let storage = StorageAccessor::new(area);
//! ```

pub mod accessor;
pub mod area;
pub mod memory;
pub mod migrations;
pub mod sqlite;

pub use accessor::StorageAccessor;
pub use area::{ContextProbe, StorageArea, StorageMap};
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Top-level keys of the persisted namespace.
pub mod keys {
    /// Video id → ordered array of bookmark records.
    pub const BOOKMARKS: &str = "bookmarks";
    /// Video id → playback settings record.
    pub const VIDEO_SETTINGS: &str = "videoSettings";
    /// Global flag controlling the settings prompt.
    pub const PROMPT_ENABLED: &str = "promptEnabled";
    /// Explicit version of the stored data layout.
    pub const SCHEMA_VERSION: &str = "schemaVersion";
    /// Pre-2.0 settings mapping without timestamps.
    pub const LEGACY_SETTINGS: &str = "settings";
}
