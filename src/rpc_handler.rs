//! Cross-context message router.
//!
//! Requests are JSON objects keyed by `action`; every request gets exactly one
//! reply object. Actions that touch storage are deferred: [`MessageRouter::dispatch`]
//! hands back a future and the caller reports "will reply asynchronously".
//! Malformed and unknown requests are answered immediately.
//!
//! Reads answer `{error}` on failure, mutations `{success: false, error}`.
//! Requests naming a video carry either `videoId` or the page `url`.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::managers::bookmark_manager::BookmarkStore;
use crate::managers::settings_manager::SettingsStore;
use crate::services::data_transfer::DataTransfer;
use crate::services::video_url::{extract_video_id, is_supported_video_url};
use crate::storage::StorageArea;
use crate::types::bookmark::Bookmark;
use crate::types::errors::{BookmarkError, SettingsError, TransferError};
use crate::types::settings::PlaybackSettings;

/// Actions the router understands.
pub const ACTIONS: [&str; 10] = [
    "getBookmarks",
    "getSettings",
    "saveBookmark",
    "deleteBookmark",
    "updateBookmark",
    "saveVideoSettings",
    "exportData",
    "importData",
    "clearAllData",
    "togglePrompt",
];

/// How a request will be answered.
pub enum Dispatch<'a> {
    /// The reply is already known.
    Immediate(Value),
    /// The reply arrives once the storage work completes.
    Deferred(Pin<Box<dyn Future<Output = Value> + 'a>>),
}

impl<'a> Dispatch<'a> {
    pub fn will_reply_async(&self) -> bool {
        matches!(self, Dispatch::Deferred(_))
    }

    pub async fn reply(self) -> Value {
        match self {
            Dispatch::Immediate(value) => value,
            Dispatch::Deferred(pending) => pending.await,
        }
    }
}

fn deferred<'a, F>(work: F) -> Dispatch<'a>
where
    F: Future<Output = Value> + 'a,
{
    Dispatch::Deferred(Box::pin(work))
}

fn read_reply(result: Result<Value, String>) -> Value {
    result.unwrap_or_else(|error| json!({ "error": error }))
}

fn mutation_reply(result: Result<(), String>) -> Value {
    match result {
        Ok(()) => json!({ "success": true }),
        Err(error) => json!({ "success": false, "error": error }),
    }
}

fn rejected<'a>(error: &str) -> Dispatch<'a> {
    Dispatch::Immediate(json!({ "success": false, "error": error }))
}

fn param_str<'v>(request: &'v Value, key: &str) -> Option<&'v str> {
    request
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// `videoId`, or failing that the id in a supported page `url`.
fn request_video_id(request: &Value) -> Option<String> {
    if let Some(id) = param_str(request, "videoId") {
        return Some(id.to_string());
    }
    param_str(request, "url")
        .filter(|url| is_supported_video_url(url))
        .and_then(extract_video_id)
}

fn param_index(request: &Value) -> Option<usize> {
    request
        .get("index")
        .and_then(Value::as_u64)
        .and_then(|i| usize::try_from(i).ok())
}

fn bookmark_failure(action: &str, e: &BookmarkError) -> String {
    match e {
        BookmarkError::NotFound { .. } => "Bookmark not found".to_string(),
        BookmarkError::NoteTooLong(_) | BookmarkError::InvalidTime(_) => "Invalid bookmark".to_string(),
        other => {
            warn!(error = %other, "{} failed", action);
            format!("Failed to {}", action)
        }
    }
}

/// Exposes the stores to other contexts.
pub struct MessageRouter<S> {
    bookmarks: BookmarkStore<S>,
    settings: SettingsStore<S>,
    transfer: Arc<DataTransfer<S>>,
}

impl<S: StorageArea> MessageRouter<S> {
    pub fn new(bookmarks: BookmarkStore<S>, settings: SettingsStore<S>, transfer: Arc<DataTransfer<S>>) -> Self {
        Self {
            bookmarks,
            settings,
            transfer,
        }
    }

    async fn read_settings(&self) -> Result<Value, SettingsError> {
        let video_settings = self.settings.all().await?;
        let prompt_enabled = self.settings.prompt_enabled().await?;
        Ok(json!({ "videoSettings": video_settings, "promptEnabled": prompt_enabled }))
    }

    /// Answers `request` to completion.
    pub async fn handle(&self, request: &Value) -> Value {
        self.dispatch(request).reply().await
    }

    /// Routes `request` by its `action`.
    pub fn dispatch<'a>(&'a self, request: &'a Value) -> Dispatch<'a> {
        let Some(action) = request.get("action").and_then(Value::as_str) else {
            warn!("message without action");
            return Dispatch::Immediate(json!({ "error": "Unknown action" }));
        };
        debug!(action, "message received");

        match action {
            "getBookmarks" => deferred(async move {
                read_reply(
                    self.bookmarks
                        .all()
                        .await
                        .map(|bookmarks| json!({ "bookmarks": bookmarks }))
                        .map_err(|e| {
                            warn!(error = %e, "failed to get bookmarks");
                            "Failed to get bookmarks".to_string()
                        }),
                )
            }),

            "getSettings" => deferred(async move {
                read_reply(self.read_settings().await.map_err(|e| {
                    warn!(error = %e, "failed to get settings");
                    "Failed to get settings".to_string()
                }))
            }),

            "saveBookmark" => {
                let Some(video_id) = request_video_id(request) else {
                    return rejected("Video ID not available");
                };
                let bookmark: Bookmark = match request.get("bookmark").cloned().map(serde_json::from_value) {
                    Some(Ok(bookmark)) => bookmark,
                    _ => return rejected("Invalid bookmark"),
                };
                deferred(async move {
                    mutation_reply(
                        self.bookmarks
                            .append(&video_id, bookmark)
                            .await
                            .map_err(|e| bookmark_failure("save bookmark", &e)),
                    )
                })
            }

            "deleteBookmark" => {
                let Some(video_id) = request_video_id(request) else {
                    return rejected("Video ID not available");
                };
                let Some(index) = param_index(request) else {
                    return rejected("Bookmark not found");
                };
                deferred(async move {
                    mutation_reply(
                        self.bookmarks
                            .delete_at(&video_id, index)
                            .await
                            .map(|_| ())
                            .map_err(|e| bookmark_failure("delete bookmark", &e)),
                    )
                })
            }

            "updateBookmark" => {
                let Some(video_id) = request_video_id(request) else {
                    return rejected("Video ID not available");
                };
                let Some(index) = param_index(request) else {
                    return rejected("Bookmark not found");
                };
                let bookmark: Bookmark = match request.get("bookmark").cloned().map(serde_json::from_value) {
                    Some(Ok(bookmark)) => bookmark,
                    _ => return rejected("Invalid bookmark"),
                };
                deferred(async move {
                    mutation_reply(
                        self.bookmarks
                            .update_at(&video_id, index, bookmark)
                            .await
                            .map(|_| ())
                            .map_err(|e| bookmark_failure("update bookmark", &e)),
                    )
                })
            }

            "saveVideoSettings" => {
                let Some(video_id) = request_video_id(request) else {
                    return rejected("Video ID not available");
                };
                let settings: PlaybackSettings =
                    match request.get("videoSettings").cloned().map(serde_json::from_value) {
                        Some(Ok(settings)) => settings,
                        _ => return rejected("Invalid video settings"),
                    };
                deferred(async move {
                    mutation_reply(self.settings.save(&video_id, settings).await.map(|_| ()).map_err(|e| {
                        warn!(error = %e, "failed to save video settings");
                        "Failed to save video settings".to_string()
                    }))
                })
            }

            "exportData" => deferred(async move {
                read_reply(
                    self.transfer
                        .export()
                        .await
                        .map(|data| json!({ "data": data }))
                        .map_err(|e| {
                            warn!(error = %e, "failed to export data");
                            "Failed to export data".to_string()
                        }),
                )
            }),

            "importData" => {
                let Some(data) = request.get("data") else {
                    return rejected("Invalid file format: missing data");
                };
                deferred(async move {
                    mutation_reply(self.transfer.import(data).await.map_err(|e| match e {
                        TransferError::InvalidFormat(_) => e.to_string(),
                        TransferError::Storage(_) => {
                            warn!(error = %e, "failed to import data");
                            "Failed to import data".to_string()
                        }
                    }))
                })
            }

            "clearAllData" => deferred(async move {
                mutation_reply(self.transfer.clear_all().await.map_err(|e| {
                    warn!(error = %e, "failed to clear data");
                    "Failed to clear data".to_string()
                }))
            }),

            "togglePrompt" => deferred(async move {
                match self.settings.toggle_prompt().await {
                    Ok(enabled) => json!({ "promptEnabled": enabled }),
                    Err(e) => {
                        warn!(error = %e, "failed to toggle settings prompt");
                        json!({ "success": false, "error": "Failed to toggle settings prompt" })
                    }
                }
            }),

            other => {
                warn!(action = other, "unknown message action");
                Dispatch::Immediate(json!({ "error": "Unknown action" }))
            }
        }
    }
}
