// vidmark stores
// Stores own the persisted mappings: bookmarks per video, and playback settings plus the prompt flag.

pub mod bookmark_manager;
pub mod settings_manager;
