use vidmark::types::errors::*;

// === StorageError Tests ===

#[test]
fn storage_error_display_variants() {
    assert_eq!(
        StorageError::ContextInvalidated("reload".to_string()).to_string(),
        "Extension context invalidated: reload"
    );
    assert_eq!(
        StorageError::Unavailable.to_string(),
        "Storage unavailable: context is not valid"
    );
    assert_eq!(
        StorageError::Timeout(5000).to_string(),
        "Storage operation timed out after 5000 ms"
    );
    assert_eq!(
        StorageError::Backend("quota".to_string()).to_string(),
        "Storage backend error: quota"
    );
}

#[test]
fn storage_error_detects_invalidation_in_backend_message() {
    assert!(StorageError::ContextInvalidated(String::new()).is_context_invalidation());
    assert!(StorageError::Backend("Extension context invalidated.".to_string()).is_context_invalidation());
    assert!(!StorageError::Backend("QUOTA_BYTES exceeded".to_string()).is_context_invalidation());
    assert!(!StorageError::Timeout(1).is_context_invalidation());
    assert!(!StorageError::Unavailable.is_context_invalidation());
}

#[test]
fn storage_error_from_serde_json() {
    let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: StorageError = parse_err.into();
    assert!(matches!(err, StorageError::Serialization(_)));
}

#[test]
fn storage_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(StorageError::Unavailable);
    assert!(err.source().is_none());
}

// === BookmarkError Tests ===

#[test]
fn bookmark_error_display_variants() {
    assert_eq!(BookmarkError::MissingVideoId.to_string(), "Video ID not available");
    assert_eq!(
        BookmarkError::NotFound {
            video_id: "abc".to_string(),
            index: 3
        }
        .to_string(),
        "Bookmark not found: abc at index 3"
    );
    assert_eq!(
        BookmarkError::NoteTooLong(501).to_string(),
        "Bookmark note too long: 501 characters (max 500)"
    );
}

#[test]
fn bookmark_error_wraps_storage_error() {
    let err: BookmarkError = StorageError::Unavailable.into();
    assert_eq!(err, BookmarkError::Storage(StorageError::Unavailable));
    assert!(err.to_string().starts_with("Bookmark storage error"));
}

// === SettingsError / MaintenanceError / TransferError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::InvalidValue("volume 2 outside [0, 1]".to_string()).to_string(),
        "Invalid settings value: volume 2 outside [0, 1]"
    );
    let err: SettingsError = StorageError::Timeout(10).into();
    assert!(matches!(err, SettingsError::Storage(StorageError::Timeout(10))));
}

#[test]
fn maintenance_error_display_variants() {
    assert_eq!(
        MaintenanceError::CorruptData("bad".to_string()).to_string(),
        "Corrupt stored data: bad"
    );
}

#[test]
fn transfer_error_display_variants() {
    assert_eq!(
        TransferError::InvalidFormat("missing bookmarks and videoSettings".to_string()).to_string(),
        "Invalid file format: missing bookmarks and videoSettings"
    );
}

#[test]
fn config_error_display_variants() {
    assert_eq!(
        ConfigError::IoError("denied".to_string()).to_string(),
        "Config I/O error: denied"
    );
}
