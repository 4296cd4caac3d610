//! Unit tests for install seeding, schema migration and age-based cleanup.

use std::sync::Arc;

use serde_json::{json, Value};

use vidmark::app::App;
use vidmark::config::VidmarkConfig;
use vidmark::services::clock::DAY_MS;
use vidmark::services::maintenance::{InstallReason, CURRENT_DATA_VERSION};
use vidmark::services::notifier::QueuedNotifier;
use vidmark::storage::{keys, MemoryStorage, StorageMap};
use vidmark::types::errors::StorageError;

const NOW: i64 = 1_700_000_000_000;

fn items(value: Value) -> StorageMap {
    value.as_object().cloned().expect("object literal")
}

fn app_with(stored: Value) -> App<MemoryStorage> {
    App::with_storage(
        MemoryStorage::with_items(items(stored)),
        VidmarkConfig::default(),
        Arc::new(QueuedNotifier::new()),
    )
}

async fn snapshot(app: &App<MemoryStorage>) -> StorageMap {
    app.storage.get_all().await.unwrap()
}

fn legacy_store() -> Value {
    json!({
        "settings": {
            "abc": {"playbackRate": 1.5, "volume": 0.7, "muted": false}
        },
        "bookmarks": {
            "abc": [{"time": 10, "formattedTime": "0:10", "note": "old"}]
        }
    })
}

#[tokio::test]
async fn test_install_seeds_defaults() {
    let app = app_with(json!({}));
    app.maintenance.on_installed(InstallReason::Install).await.unwrap();

    let stored = snapshot(&app).await;
    assert_eq!(stored[keys::PROMPT_ENABLED], json!(true));
    assert_eq!(stored[keys::BOOKMARKS], json!({}));
    assert_eq!(stored[keys::VIDEO_SETTINGS], json!({}));
    assert_eq!(stored[keys::SCHEMA_VERSION], json!(CURRENT_DATA_VERSION));
}

#[tokio::test]
async fn test_startup_on_empty_store_installs() {
    let app = app_with(json!({}));
    assert_eq!(app.startup().await.unwrap(), InstallReason::Install);
    assert_eq!(snapshot(&app).await.len(), 4);
}

#[tokio::test]
async fn test_migrates_legacy_layout() {
    let app = app_with(legacy_store());
    assert_eq!(app.startup().await.unwrap(), InstallReason::Update);

    let stored = snapshot(&app).await;
    assert!(!stored.contains_key(keys::LEGACY_SETTINGS));
    assert_eq!(stored[keys::SCHEMA_VERSION], json!(2));
    assert_eq!(stored[keys::PROMPT_ENABLED], json!(true));

    let settings = app.settings.load("abc").await.unwrap().unwrap();
    assert_eq!(settings.playback_rate, 1.5);
    assert!(settings.timestamp > 0);

    let bookmark = &app.bookmarks.list("abc").await.unwrap()[0];
    assert_eq!(bookmark.video_title, "Unknown Video");
    assert!(bookmark.timestamp > 0);
    assert_eq!(bookmark.note, "old");
}

/// Running the migration twice leaves the same state as running it once.
#[tokio::test]
async fn test_migration_is_idempotent() {
    let app = app_with(legacy_store());
    let first = app.maintenance.migrate().await.unwrap();
    assert!(first.changed());
    assert_eq!(first.from_version, 1);
    let after_first = snapshot(&app).await;

    let second = app.maintenance.migrate().await.unwrap();
    assert!(!second.changed());
    assert_eq!(second.from_version, 2);
    assert_eq!(snapshot(&app).await, after_first);
}

#[tokio::test]
async fn test_migration_keeps_explicit_prompt_flag() {
    let app = app_with(json!({"promptEnabled": false, "bookmarks": {}}));
    let report = app.maintenance.migrate().await.unwrap();
    assert!(!report.prompt_defaulted);
    assert!(!app.settings.prompt_enabled().await.unwrap());
}

#[tokio::test]
async fn test_cleanup_purges_stale_records() {
    let app = app_with(json!({
        "bookmarks": {
            "old": [{"time": 1, "formattedTime": "0:01", "timestamp": NOW - 91 * DAY_MS}],
            "mixed": [
                {"time": 2, "formattedTime": "0:02", "timestamp": NOW - 100 * DAY_MS},
                {"time": 3, "formattedTime": "0:03", "timestamp": NOW - DAY_MS}
            ],
            "unstamped": [{"time": 4, "formattedTime": "0:04"}]
        },
        "videoSettings": {
            "stale": {"playbackRate": 1.0, "volume": 1.0, "muted": false, "timestamp": NOW - 31 * DAY_MS},
            "fresh": {"playbackRate": 1.0, "volume": 1.0, "muted": false, "timestamp": NOW - DAY_MS},
            "never": {"playbackRate": 1.0, "volume": 1.0, "muted": false}
        }
    }));

    let report = app.maintenance.cleanup_old_data_at(NOW).await.unwrap();
    assert_eq!(report.bookmarks_removed, 3);
    assert_eq!(report.videos_removed, 2);
    assert_eq!(report.settings_removed, 1);

    let bookmarks = app.bookmarks.all().await.unwrap();
    assert_eq!(bookmarks.keys().collect::<Vec<_>>(), vec!["mixed"]);
    assert_eq!(bookmarks["mixed"][0].time, 3);

    let settings = app.settings.all().await.unwrap();
    assert!(settings.contains_key("fresh"));
    assert!(settings.contains_key("never"));
    assert!(!settings.contains_key("stale"));
}

#[tokio::test]
async fn test_cleanup_without_changes_does_not_write() {
    let app = app_with(json!({
        "bookmarks": {"v": [{"time": 1, "formattedTime": "0:01", "timestamp": NOW}]},
        "videoSettings": {}
    }));
    let before = app.storage.area().operation_count();
    let report = app.maintenance.cleanup_old_data_at(NOW).await.unwrap();
    assert!(!report.changed());
    // One read, no write.
    assert_eq!(app.storage.area().operation_count(), before + 1);
}

#[tokio::test]
async fn test_run_cleanup_swallows_failures() {
    let app = app_with(json!({}));
    app.storage
        .area()
        .set_fault(Some(StorageError::Backend("io".to_string())));
    assert!(app.maintenance.run_cleanup().await.is_none());
}

#[tokio::test]
async fn test_cleanup_schedule_waits_for_first_delay() {
    let mut config = VidmarkConfig::default();
    config.cleanup.first_run_delay_minutes = 60;
    let app = App::in_memory(config, Arc::new(QueuedNotifier::new()));

    let handle = app.spawn_cleanup();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(app.storage.area().operation_count(), 0);
    handle.abort();
}

/// A partial legacy record is filled with defaults instead of breaking reads.
#[tokio::test]
async fn test_partial_legacy_record_is_normalized() {
    let app = app_with(json!({
        "settings": {
            "a": {"playbackRate": 1.5},
            "b": {"playbackRate": 2.0, "volume": 0.5, "muted": true}
        }
    }));
    app.maintenance.migrate().await.unwrap();

    let a = app.settings.load("a").await.unwrap().expect("migrated");
    assert_eq!(a.playback_rate, 1.5);
    assert_eq!(a.volume, 1.0);
    assert!(!a.muted);
    let b = app.settings.load("b").await.unwrap().expect("migrated");
    assert_eq!(b.volume, 0.5);

    let reply = app.router.handle(&json!({"action": "getSettings"})).await;
    assert_eq!(reply["videoSettings"].as_object().map(|m| m.len()), Some(2));
    assert!(app.maintenance.cleanup_old_data_at(NOW).await.is_ok());
}

/// A bookmark added while cleanup is in flight survives it.
#[tokio::test]
async fn test_add_during_cleanup_is_not_lost() {
    let app = app_with(json!({
        "bookmarks": {
            "stale": [{"time": 1, "formattedTime": "0:01", "timestamp": NOW - 100 * DAY_MS}]
        }
    }));
    app.storage
        .area()
        .set_latency(Some(std::time::Duration::from_millis(20)));

    let (added, cleaned) = tokio::join!(
        app.bookmarks.add("vid", 12.0, "kept", "Video"),
        app.maintenance.cleanup_old_data_at(NOW)
    );
    added.unwrap();
    assert_eq!(cleaned.unwrap().bookmarks_removed, 1);

    let bookmarks = app.bookmarks.all().await.unwrap();
    assert_eq!(bookmarks.keys().collect::<Vec<_>>(), vec!["vid"]);
    assert_eq!(bookmarks["vid"][0].note, "kept");
}
