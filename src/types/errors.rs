use std::fmt;

/// Message fragment hosts use when the runtime backing a context has gone away.
pub const CONTEXT_INVALIDATED_MARKER: &str = "context invalidated";

// === StorageError ===

/// Errors raised by the key-value storage layer and its availability guard.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The runtime hosting the storage namespace was reloaded or removed.
    ContextInvalidated(String),
    /// The runtime context is in degraded mode; the call was not attempted.
    Unavailable,
    /// The operation did not complete within the guard's deadline.
    Timeout(u64),
    /// The backend reported a failure (quota, I/O, transient error).
    Backend(String),
    /// A stored value could not be encoded or decoded.
    Serialization(String),
}

impl StorageError {
    /// Returns true when the error means the hosting context itself is gone,
    /// either explicitly or through a backend message saying so.
    pub fn is_context_invalidation(&self) -> bool {
        match self {
            StorageError::ContextInvalidated(_) => true,
            StorageError::Backend(msg) => msg.to_lowercase().contains(CONTEXT_INVALIDATED_MARKER),
            _ => false,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ContextInvalidated(msg) => {
                write!(f, "Extension context invalidated: {}", msg)
            }
            StorageError::Unavailable => write!(f, "Storage unavailable: context is not valid"),
            StorageError::Timeout(ms) => {
                write!(f, "Storage operation timed out after {} ms", ms)
            }
            StorageError::Backend(msg) => write!(f, "Storage backend error: {}", msg),
            StorageError::Serialization(msg) => {
                write!(f, "Storage serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

// === BookmarkError ===

/// Errors related to bookmark store operations.
#[derive(Debug, Clone, PartialEq)]
pub enum BookmarkError {
    /// No video identifier was available for the current page.
    MissingVideoId,
    /// The playback position could not be turned into whole seconds.
    InvalidTime(String),
    /// The note exceeds the maximum length.
    NoteTooLong(usize),
    /// No bookmark exists at the given position for the video.
    NotFound { video_id: String, index: usize },
    /// The underlying storage call failed.
    Storage(StorageError),
}

impl fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkError::MissingVideoId => write!(f, "Video ID not available"),
            BookmarkError::InvalidTime(msg) => write!(f, "Invalid bookmark time: {}", msg),
            BookmarkError::NoteTooLong(len) => write!(
                f,
                "Bookmark note too long: {} characters (max {})",
                len,
                crate::types::bookmark::MAX_NOTE_CHARS
            ),
            BookmarkError::NotFound { video_id, index } => {
                write!(f, "Bookmark not found: {} at index {}", video_id, index)
            }
            BookmarkError::Storage(e) => write!(f, "Bookmark storage error: {}", e),
        }
    }
}

impl std::error::Error for BookmarkError {}

impl From<StorageError> for BookmarkError {
    fn from(e: StorageError) -> Self {
        BookmarkError::Storage(e)
    }
}

// === SettingsError ===

/// Errors related to per-video settings and the global prompt flag.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// No video identifier was available for the current page.
    MissingVideoId,
    /// A value is outside the range a media element accepts.
    InvalidValue(String),
    /// The underlying storage call failed.
    Storage(StorageError),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::MissingVideoId => write!(f, "Video ID not available"),
            SettingsError::InvalidValue(msg) => write!(f, "Invalid settings value: {}", msg),
            SettingsError::Storage(e) => write!(f, "Settings storage error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<StorageError> for SettingsError {
    fn from(e: StorageError) -> Self {
        SettingsError::Storage(e)
    }
}

// === MaintenanceError ===

/// Errors raised while migrating or cleaning up stored data.
#[derive(Debug, Clone, PartialEq)]
pub enum MaintenanceError {
    /// The underlying storage call failed.
    Storage(StorageError),
    /// A stored value has a shape no migration step understands.
    CorruptData(String),
}

impl fmt::Display for MaintenanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceError::Storage(e) => write!(f, "Maintenance storage error: {}", e),
            MaintenanceError::CorruptData(msg) => write!(f, "Corrupt stored data: {}", msg),
        }
    }
}

impl std::error::Error for MaintenanceError {}

impl From<StorageError> for MaintenanceError {
    fn from(e: StorageError) -> Self {
        MaintenanceError::Storage(e)
    }
}

// === TransferError ===

/// Errors related to exporting and importing data.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferError {
    /// The import document is not a recognised export file.
    InvalidFormat(String),
    /// The underlying storage call failed.
    Storage(StorageError),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::InvalidFormat(msg) => write!(f, "Invalid file format: {}", msg),
            TransferError::Storage(e) => write!(f, "Transfer storage error: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<StorageError> for TransferError {
    fn from(e: StorageError) -> Self {
        TransferError::Storage(e)
    }
}

// === ConfigError ===

/// Errors related to loading the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the config file.
    IoError(String),
    /// The config file is not valid JSON for the expected shape.
    SerializationError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::SerializationError(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
