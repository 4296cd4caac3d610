//! Unit tests for the message router, covering every action through the same
//! dispatch path the `vidmark-rpc` binary uses, on a temporary SQLite database.

use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use vidmark::app::App;
use vidmark::config::VidmarkConfig;
use vidmark::rpc_handler::ACTIONS;
use vidmark::services::notifier::QueuedNotifier;
use vidmark::storage::{MemoryStorage, SqliteStorage};
use vidmark::types::errors::StorageError;

/// Create a fresh App backed by a temp directory DB.
fn setup() -> (App<SqliteStorage>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let config = VidmarkConfig {
        storage_path: Some(tmp.path().join("test.db")),
        ..VidmarkConfig::default()
    };
    let app = App::open(config).expect("Failed to init App");
    (app, tmp)
}

fn bookmark(time: u64, note: &str) -> Value {
    json!({
        "time": time,
        "formattedTime": format!("0:{:02}", time),
        "note": note,
        "timestamp": 1_700_000_000_000_i64,
        "videoTitle": "Video"
    })
}

// ─── Dispatch ───

#[tokio::test]
async fn test_unknown_action_replies_immediately() {
    let (app, _tmp) = setup();
    let request = json!({"action": "launchRockets"});
    let dispatch = app.router.dispatch(&request);
    assert!(!dispatch.will_reply_async());
    assert_eq!(dispatch.reply().await, json!({"error": "Unknown action"}));

    let missing = json!({"videoId": "abc"});
    assert_eq!(app.router.handle(&missing).await, json!({"error": "Unknown action"}));
}

#[tokio::test]
async fn test_storage_actions_are_deferred() {
    let (app, _tmp) = setup();
    for action in ["getBookmarks", "getSettings", "exportData", "clearAllData", "togglePrompt"] {
        let request = json!({"action": action});
        assert!(app.router.dispatch(&request).will_reply_async(), "{} should be deferred", action);
    }
}

#[tokio::test]
async fn test_every_action_is_known() {
    let (app, _tmp) = setup();
    for action in ACTIONS {
        let reply = app.router.handle(&json!({"action": action})).await;
        assert_ne!(reply, json!({"error": "Unknown action"}), "{}", action);
    }
}

// ─── Bookmarks ───

#[tokio::test]
async fn test_save_get_update_delete_bookmark() {
    let (app, _tmp) = setup();

    let res = app
        .router
        .handle(&json!({"action": "saveBookmark", "videoId": "abc", "bookmark": bookmark(5, "first")}))
        .await;
    assert_eq!(res, json!({"success": true}));

    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res["bookmarks"]["abc"][0]["note"], "first");

    let res = app
        .router
        .handle(&json!({"action": "updateBookmark", "videoId": "abc", "index": 0, "bookmark": bookmark(9, "edited")}))
        .await;
    assert_eq!(res, json!({"success": true}));
    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res["bookmarks"]["abc"][0]["time"], 9);

    let res = app
        .router
        .handle(&json!({"action": "deleteBookmark", "videoId": "abc", "index": 0}))
        .await;
    assert_eq!(res, json!({"success": true}));
    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res, json!({"bookmarks": {}}));
}

#[tokio::test]
async fn test_delete_missing_bookmark() {
    let (app, _tmp) = setup();
    let res = app
        .router
        .handle(&json!({"action": "deleteBookmark", "videoId": "abc", "index": 3}))
        .await;
    assert_eq!(res, json!({"success": false, "error": "Bookmark not found"}));

    let res = app
        .router
        .handle(&json!({"action": "deleteBookmark", "videoId": "abc", "index": -1}))
        .await;
    assert_eq!(res, json!({"success": false, "error": "Bookmark not found"}));
}

#[tokio::test]
async fn test_malformed_bookmark_payload_rejected_immediately() {
    let (app, _tmp) = setup();
    let request = json!({"action": "saveBookmark", "videoId": "abc", "bookmark": {"note": "no time"}});
    let dispatch = app.router.dispatch(&request);
    assert!(!dispatch.will_reply_async());
    assert_eq!(dispatch.reply().await, json!({"success": false, "error": "Invalid bookmark"}));

    let res = app
        .router
        .handle(&json!({"action": "saveBookmark", "bookmark": bookmark(1, "")}))
        .await;
    assert_eq!(res["success"], false);
}

#[tokio::test]
async fn test_overlong_note_is_rejected_on_save_and_update() {
    let (app, _tmp) = setup();
    let long_note = "x".repeat(501);

    let res = app
        .router
        .handle(&json!({"action": "saveBookmark", "videoId": "abc", "bookmark": bookmark(5, &long_note)}))
        .await;
    assert_eq!(res, json!({"success": false, "error": "Invalid bookmark"}));
    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res, json!({"bookmarks": {}}));

    app.router
        .handle(&json!({"action": "saveBookmark", "videoId": "abc", "bookmark": bookmark(5, "short")}))
        .await;
    let res = app
        .router
        .handle(&json!({"action": "updateBookmark", "videoId": "abc", "index": 0, "bookmark": bookmark(6, &long_note)}))
        .await;
    assert_eq!(res, json!({"success": false, "error": "Invalid bookmark"}));
    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res["bookmarks"]["abc"][0]["note"], "short");
}

#[tokio::test]
async fn test_import_with_overlong_note_rejected() {
    let (app, _tmp) = setup();
    let data = json!({"bookmarks": {"abc": [bookmark(5, &"x".repeat(501))]}});
    let res = app.router.handle(&json!({"action": "importData", "data": data})).await;
    assert_eq!(res["success"], false);
    assert!(res["error"].as_str().unwrap().starts_with("Invalid file format"));

    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res, json!({"bookmarks": {}}));
}

#[tokio::test]
async fn test_video_id_taken_from_page_url() {
    let (app, _tmp) = setup();
    let res = app
        .router
        .handle(&json!({
            "action": "saveBookmark",
            "url": "https://www.youtube.com/watch?v=abc123&t=42",
            "bookmark": bookmark(5, "from url")
        }))
        .await;
    assert_eq!(res, json!({"success": true}));
    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res["bookmarks"]["abc123"][0]["note"], "from url");

    let res = app
        .router
        .handle(&json!({"action": "saveBookmark", "url": "https://example.com/watch?v=x", "bookmark": bookmark(1, "")}))
        .await;
    assert_eq!(res, json!({"success": false, "error": "Video ID not available"}));
}

// ─── Settings ───

#[tokio::test]
async fn test_save_and_get_settings() {
    let (app, _tmp) = setup();
    let res = app
        .router
        .handle(&json!({
            "action": "saveVideoSettings",
            "videoId": "abc",
            "videoSettings": {"playbackRate": 1.5, "volume": 0.4, "muted": true}
        }))
        .await;
    assert_eq!(res, json!({"success": true}));

    let res = app.router.handle(&json!({"action": "getSettings"})).await;
    assert_eq!(res["promptEnabled"], true);
    assert_eq!(res["videoSettings"]["abc"]["playbackRate"], 1.5);
    assert!(res["videoSettings"]["abc"]["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_toggle_prompt() {
    let (app, _tmp) = setup();
    let res = app.router.handle(&json!({"action": "togglePrompt"})).await;
    assert_eq!(res, json!({"promptEnabled": false}));
    let res = app.router.handle(&json!({"action": "getSettings"})).await;
    assert_eq!(res["promptEnabled"], false);
}

// ─── Data ───

#[tokio::test]
async fn test_export_import_clear() {
    let (app, _tmp) = setup();
    app.router
        .handle(&json!({"action": "saveBookmark", "videoId": "v1", "bookmark": bookmark(1, "one")}))
        .await;

    let exported = app.router.handle(&json!({"action": "exportData"})).await;
    assert_eq!(exported["data"]["version"], "2.0");
    assert_eq!(exported["data"]["bookmarks"]["v1"][0]["note"], "one");

    let res = app.router.handle(&json!({"action": "clearAllData"})).await;
    assert_eq!(res, json!({"success": true}));
    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res, json!({"bookmarks": {}}));

    let res = app
        .router
        .handle(&json!({"action": "importData", "data": exported["data"]}))
        .await;
    assert_eq!(res, json!({"success": true}));
    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res["bookmarks"]["v1"][0]["note"], "one");
}

#[tokio::test]
async fn test_import_invalid_format() {
    let (app, _tmp) = setup();
    let res = app
        .router
        .handle(&json!({"action": "importData", "data": {"promptEnabled": true}}))
        .await;
    assert_eq!(res["success"], false);
    assert!(res["error"].as_str().unwrap().starts_with("Invalid file format"));

    let res = app.router.handle(&json!({"action": "importData"})).await;
    assert_eq!(res["success"], false);
}

// ─── Failures ───

#[tokio::test]
async fn test_storage_failures_use_reply_shapes() {
    let app = App::in_memory(VidmarkConfig::default(), Arc::new(QueuedNotifier::new()));
    app.storage
        .area()
        .set_fault(Some(StorageError::Backend("quota exceeded".to_string())));

    let res = app.router.handle(&json!({"action": "getBookmarks"})).await;
    assert_eq!(res, json!({"error": "Failed to get bookmarks"}));

    let res = app.router.handle(&json!({"action": "getSettings"})).await;
    assert_eq!(res, json!({"error": "Failed to get settings"}));

    let res = app
        .router
        .handle(&json!({"action": "saveBookmark", "videoId": "abc", "bookmark": bookmark(1, "")}))
        .await;
    assert_eq!(res, json!({"success": false, "error": "Failed to save bookmark"}));

    let res = app.router.handle(&json!({"action": "clearAllData"})).await;
    assert_eq!(res, json!({"success": false, "error": "Failed to clear data"}));
}

#[tokio::test]
async fn test_degraded_context_still_replies() {
    let app: App<MemoryStorage> = App::in_memory(VidmarkConfig::default(), Arc::new(QueuedNotifier::new()));
    app.context.invalidate();
    let res = app.router.handle(&json!({"action": "exportData"})).await;
    assert_eq!(res, json!({"error": "Failed to export data"}));
}
