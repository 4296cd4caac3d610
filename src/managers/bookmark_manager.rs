//! Bookmark store for vidmark.
//!
//! Bookmarks live in one mapping under the `bookmarks` key: video id → list in
//! insertion order. Every mutation reads the whole mapping, changes it with one
//! of the pure functions below and writes the whole mapping back. Writes are
//! serialized with every other writer sharing the same storage accessor;
//! writers in other contexts are not, and the last write wins.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::services::clock;
use crate::services::notifier::{NotificationKind, Notifier};
use crate::services::runtime_context::RuntimeContext;
use crate::services::video_url::format_time;
use crate::storage::{keys, StorageAccessor, StorageArea};
use crate::types::bookmark::{Bookmark, BookmarkCollection, MAX_NOTE_CHARS, UNKNOWN_VIDEO_TITLE};
use crate::types::errors::BookmarkError;

/// Builds a bookmark record for a playback position.
///
/// The position is floored to whole seconds. A blank title is recorded as
/// "Unknown Video".
pub fn build_bookmark(time: f64, note: &str, video_title: &str, now: i64) -> Result<Bookmark, BookmarkError> {
    if !time.is_finite() || time < 0.0 {
        return Err(BookmarkError::InvalidTime(time.to_string()));
    }
    check_note(note)?;

    let seconds = time.floor() as u64;
    let title = video_title.trim();
    Ok(Bookmark {
        time: seconds,
        formatted_time: format_time(seconds),
        note: note.to_string(),
        timestamp: now,
        video_title: if title.is_empty() {
            UNKNOWN_VIDEO_TITLE.to_string()
        } else {
            title.to_string()
        },
    })
}

fn check_note(note: &str) -> Result<(), BookmarkError> {
    let note_len = note.chars().count();
    if note_len > MAX_NOTE_CHARS {
        return Err(BookmarkError::NoteTooLong(note_len));
    }
    Ok(())
}

/// Checks a record built elsewhere before it enters the store.
pub fn validate_bookmark(bookmark: &Bookmark) -> Result<(), BookmarkError> {
    check_note(&bookmark.note)
}

/// Appends `bookmark` to the list for `video_id`, creating the list if needed.
pub fn insert_bookmark(collection: &mut BookmarkCollection, video_id: &str, bookmark: Bookmark) {
    collection.entry(video_id.to_string()).or_default().push(bookmark);
}

/// Removes the bookmark at `index`, dropping the video's key once its list is empty.
pub fn remove_bookmark_at(
    collection: &mut BookmarkCollection,
    video_id: &str,
    index: usize,
) -> Result<Bookmark, BookmarkError> {
    let list = collection
        .get_mut(video_id)
        .filter(|list| index < list.len())
        .ok_or_else(|| BookmarkError::NotFound {
            video_id: video_id.to_string(),
            index,
        })?;

    let removed = list.remove(index);
    if list.is_empty() {
        collection.remove(video_id);
    }
    Ok(removed)
}

/// Overwrites the bookmark at `index`, returning the previous record.
pub fn replace_bookmark_at(
    collection: &mut BookmarkCollection,
    video_id: &str,
    index: usize,
    bookmark: Bookmark,
) -> Result<Bookmark, BookmarkError> {
    let slot = collection
        .get_mut(video_id)
        .and_then(|list| list.get_mut(index))
        .ok_or_else(|| BookmarkError::NotFound {
            video_id: video_id.to_string(),
            index,
        })?;
    Ok(std::mem::replace(slot, bookmark))
}

/// Display order: ascending by time, ties kept in insertion order.
pub fn sorted_by_time(bookmarks: &[Bookmark]) -> Vec<Bookmark> {
    let mut sorted = bookmarks.to_vec();
    sorted.sort_by_key(|b| b.time);
    sorted
}

fn require_video_id(video_id: &str) -> Result<(), BookmarkError> {
    if video_id.trim().is_empty() {
        return Err(BookmarkError::MissingVideoId);
    }
    Ok(())
}

/// Bookmark CRUD over the shared storage namespace.
pub struct BookmarkStore<S> {
    storage: StorageAccessor<S>,
    context: RuntimeContext,
    notifier: Arc<dyn Notifier>,
}

impl<S> Clone for BookmarkStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            context: self.context.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: StorageArea> BookmarkStore<S> {
    pub fn new(storage: StorageAccessor<S>, context: RuntimeContext, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            storage,
            context,
            notifier,
        }
    }

    /// Records a bookmark at `time` seconds for `video_id` and tells the user the outcome.
    pub async fn add(
        &self,
        video_id: &str,
        time: f64,
        note: &str,
        video_title: &str,
    ) -> Result<Bookmark, BookmarkError> {
        let result = self.try_add(video_id, time, note, video_title).await;
        match &result {
            Ok(bookmark) => {
                info!(video_id, time = bookmark.time, "bookmark saved");
                self.notifier.notify(
                    &format!("Bookmark saved at {}", bookmark.formatted_time),
                    NotificationKind::Success,
                );
            }
            Err(e) => self.report_failure("Could not save bookmark", e),
        }
        result
    }

    async fn try_add(
        &self,
        video_id: &str,
        time: f64,
        note: &str,
        video_title: &str,
    ) -> Result<Bookmark, BookmarkError> {
        require_video_id(video_id)?;
        let bookmark = build_bookmark(time, note, video_title, clock::now_millis())?;
        let saved = bookmark.clone();
        self.mutate(move |collection| {
            insert_bookmark(collection, video_id, bookmark);
            Ok(())
        })
        .await?;
        Ok(saved)
    }

    /// Appends an already-built record without notifying the user.
    pub async fn append(&self, video_id: &str, bookmark: Bookmark) -> Result<(), BookmarkError> {
        require_video_id(video_id)?;
        validate_bookmark(&bookmark)?;
        self.mutate(move |collection| {
            insert_bookmark(collection, video_id, bookmark);
            Ok(())
        })
        .await
    }

    /// Bookmarks for `video_id`, ascending by time. Never changes the stored order.
    pub async fn list(&self, video_id: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        let collection = self.load().await?;
        Ok(collection
            .get(video_id)
            .map(|list| sorted_by_time(list))
            .unwrap_or_default())
    }

    /// The whole mapping, lists in stored order.
    pub async fn all(&self) -> Result<BookmarkCollection, BookmarkError> {
        self.load().await
    }

    /// Deletes the bookmark at stored position `index`.
    pub async fn delete_at(&self, video_id: &str, index: usize) -> Result<Bookmark, BookmarkError> {
        let result = self
            .mutate(move |collection| remove_bookmark_at(collection, video_id, index))
            .await;
        match &result {
            Ok(_) => debug!(video_id, index, "bookmark deleted"),
            Err(e) => self.report_failure("Could not delete bookmark", e),
        }
        result
    }

    /// Overwrites the bookmark at stored position `index` with `bookmark`.
    pub async fn update_at(
        &self,
        video_id: &str,
        index: usize,
        bookmark: Bookmark,
    ) -> Result<Bookmark, BookmarkError> {
        let result = match validate_bookmark(&bookmark) {
            Ok(()) => {
                self.mutate(move |collection| replace_bookmark_at(collection, video_id, index, bookmark))
                    .await
            }
            Err(e) => Err(e),
        };
        match &result {
            Ok(_) => debug!(video_id, index, "bookmark updated"),
            Err(e) => self.report_failure("Could not update bookmark", e),
        }
        result
    }

    async fn load(&self) -> Result<BookmarkCollection, BookmarkError> {
        let stored = self
            .context
            .execute(self.storage.get_typed::<BookmarkCollection>(keys::BOOKMARKS))
            .await?;
        Ok(stored.unwrap_or_default())
    }

    async fn persist(&self, collection: &BookmarkCollection) -> Result<(), BookmarkError> {
        self.context
            .execute(self.storage.set_typed(keys::BOOKMARKS, collection))
            .await?;
        Ok(())
    }

    /// Read-modify-write of the whole mapping under the namespace write lock.
    /// Nothing is written when `change` fails.
    async fn mutate<T, F>(&self, change: F) -> Result<T, BookmarkError>
    where
        F: FnOnce(&mut BookmarkCollection) -> Result<T, BookmarkError>,
    {
        let _guard = self.storage.lock_writes().await;
        let mut collection = self.load().await?;
        let outcome = change(&mut collection)?;
        self.persist(&collection).await?;
        Ok(outcome)
    }

    fn report_failure(&self, action: &str, error: &BookmarkError) {
        warn!(error = %error, "{}", action);
        let message = match error {
            BookmarkError::Storage(_) => format!("{} - storage unavailable", action),
            other => format!("{}: {}", action, other),
        };
        self.notifier.notify(&message, NotificationKind::Error);
    }
}
