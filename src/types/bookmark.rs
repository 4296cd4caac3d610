use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum length of a bookmark note, in characters.
pub const MAX_NOTE_CHARS: usize = 500;

/// Title recorded when the page title could not be determined.
pub const UNKNOWN_VIDEO_TITLE: &str = "Unknown Video";

/// A saved moment in a video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Position in the video, whole seconds.
    pub time: u64,
    pub formatted_time: String,
    #[serde(default)]
    pub note: String,
    /// Creation instant in epoch milliseconds. Zero when a legacy record never had one.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub video_title: String,
}

/// All bookmarks, keyed by video identifier, each list in insertion order.
pub type BookmarkCollection = BTreeMap<String, Vec<Bookmark>>;
