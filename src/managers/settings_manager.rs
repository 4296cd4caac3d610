use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::services::clock;
use crate::services::notifier::{NotificationKind, Notifier};
use crate::services::runtime_context::RuntimeContext;
use crate::storage::{keys, StorageAccessor, StorageArea};
use crate::types::errors::{SettingsError, StorageError};
use crate::types::settings::{PlaybackSettings, VideoSettings, VideoSettingsMap};

/// Prompt flag value assumed when none is stored.
pub const DEFAULT_PROMPT_ENABLED: bool = true;

/// Decodes the stored `videoSettings` mapping one record at a time.
///
/// A record that does not decode is logged and left out, so one bad entry
/// cannot hide the others. Only a mapping that is not an object fails.
pub fn decode_settings_map(value: Value) -> Result<VideoSettingsMap, StorageError> {
    let entries = match value {
        Value::Null => return Ok(VideoSettingsMap::new()),
        Value::Object(entries) => entries,
        _ => {
            return Err(StorageError::Serialization(format!(
                "'{}': expected an object",
                keys::VIDEO_SETTINGS
            )))
        }
    };

    let mut map = VideoSettingsMap::new();
    for (video_id, record) in entries {
        match serde_json::from_value::<VideoSettings>(record) {
            Ok(settings) => {
                map.insert(video_id, settings);
            }
            Err(e) => warn!(video_id = %video_id, error = %e, "skipping unreadable settings record"),
        }
    }
    Ok(map)
}

/// Per-video playback settings plus the global settings-prompt flag.
pub struct SettingsStore<S> {
    storage: StorageAccessor<S>,
    context: RuntimeContext,
    notifier: Arc<dyn Notifier>,
}

impl<S> Clone for SettingsStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            context: self.context.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: StorageArea> SettingsStore<S> {
    pub fn new(storage: StorageAccessor<S>, context: RuntimeContext, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            storage,
            context,
            notifier,
        }
    }

    /// Stores `settings` for `video_id`, stamped with the current time.
    ///
    /// Values are stored as given; range checks happen on apply.
    pub async fn save(&self, video_id: &str, settings: PlaybackSettings) -> Result<VideoSettings, SettingsError> {
        self.save_at(video_id, settings, clock::now_millis()).await
    }

    /// Like [`SettingsStore::save`] with an explicit write instant.
    pub async fn save_at(
        &self,
        video_id: &str,
        settings: PlaybackSettings,
        now: i64,
    ) -> Result<VideoSettings, SettingsError> {
        if video_id.trim().is_empty() {
            return Err(SettingsError::MissingVideoId);
        }

        let record = settings.stamped(now);
        let _guard = self.storage.lock_writes().await;
        let mut all = self.load_map().await?;
        all.insert(video_id.to_string(), record);
        self.context
            .execute(self.storage.set_typed(keys::VIDEO_SETTINGS, &all))
            .await?;

        debug!(video_id, rate = record.playback_rate, volume = record.volume, "video settings saved");
        Ok(record)
    }

    /// Stored settings for `video_id`, if any.
    pub async fn load(&self, video_id: &str) -> Result<Option<VideoSettings>, SettingsError> {
        Ok(self.load_map().await?.remove(video_id))
    }

    pub async fn all(&self) -> Result<VideoSettingsMap, SettingsError> {
        self.load_map().await
    }

    /// Stored settings for `video_id` that are safe to push into a media element.
    ///
    /// Out-of-range records are reported to the user and skipped.
    pub async fn load_for_apply(&self, video_id: &str) -> Result<Option<PlaybackSettings>, SettingsError> {
        let Some(record) = self.load(video_id).await? else {
            return Ok(None);
        };

        let playback = record.playback();
        match playback.validate_for_apply() {
            Ok(()) => Ok(Some(playback)),
            Err(e) => {
                warn!(video_id, error = %e, "stored settings rejected");
                self.notifier
                    .notify("Stored video settings are invalid and were not applied", NotificationKind::Warning);
                Ok(None)
            }
        }
    }

    /// The global prompt flag. Absent means enabled.
    pub async fn prompt_enabled(&self) -> Result<bool, SettingsError> {
        let stored = self
            .context
            .execute(self.storage.get_typed::<bool>(keys::PROMPT_ENABLED))
            .await?;
        Ok(stored.unwrap_or(DEFAULT_PROMPT_ENABLED))
    }

    pub async fn set_prompt_enabled(&self, enabled: bool) -> Result<(), SettingsError> {
        self.context
            .execute(self.storage.set_typed(keys::PROMPT_ENABLED, &enabled))
            .await?;
        Ok(())
    }

    /// Flips the prompt flag and returns the new value.
    pub async fn toggle_prompt(&self) -> Result<bool, SettingsError> {
        let _guard = self.storage.lock_writes().await;
        let enabled = !self.prompt_enabled().await?;
        self.set_prompt_enabled(enabled).await?;

        let message = if enabled {
            "Settings prompt enabled"
        } else {
            "Settings prompt disabled"
        };
        self.notifier.notify(message, NotificationKind::Info);
        Ok(enabled)
    }

    async fn load_map(&self) -> Result<VideoSettingsMap, SettingsError> {
        let mut items = self
            .context
            .execute(self.storage.get(&[keys::VIDEO_SETTINGS]))
            .await?;
        let stored = items.remove(keys::VIDEO_SETTINGS).unwrap_or(Value::Null);
        Ok(decode_settings_map(stored)?)
    }
}
