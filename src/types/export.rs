use serde::{Deserialize, Serialize};

use super::bookmark::BookmarkCollection;
use super::settings::VideoSettingsMap;

/// Format version written into every export file.
pub const EXPORT_FORMAT_VERSION: &str = "2.0";

/// A full backup of the stored data, as written to an export file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub bookmarks: BookmarkCollection,
    pub video_settings: VideoSettingsMap,
    pub prompt_enabled: bool,
    /// RFC 3339 instant the export was produced.
    pub export_date: String,
    pub version: String,
}

/// The parts of an export file honoured on import. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    #[serde(default)]
    pub bookmarks: Option<BookmarkCollection>,
    #[serde(default)]
    pub video_settings: Option<VideoSettingsMap>,
    #[serde(default)]
    pub prompt_enabled: Option<bool>,
}
