use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::errors::SettingsError;

/// Highest playback rate a media element accepts.
pub const MAX_PLAYBACK_RATE: f64 = 16.0;

/// Live playback values as read from (or applied to) a media element.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSettings {
    pub playback_rate: f64,
    pub volume: f64,
    pub muted: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            playback_rate: 1.0,
            volume: 1.0,
            muted: false,
        }
    }
}

impl PlaybackSettings {
    /// Checks the values before they are pushed into a media element.
    ///
    /// Saving never validates; a stored record may hold anything the element reported,
    /// so the apply side rejects rates outside `(0, 16]` and volumes outside `[0, 1]`.
    pub fn validate_for_apply(&self) -> Result<(), SettingsError> {
        if !self.playback_rate.is_finite()
            || self.playback_rate <= 0.0
            || self.playback_rate > MAX_PLAYBACK_RATE
        {
            return Err(SettingsError::InvalidValue(format!(
                "playback rate {} outside (0, {}]",
                self.playback_rate, MAX_PLAYBACK_RATE
            )));
        }
        if !self.volume.is_finite() || !(0.0..=1.0).contains(&self.volume) {
            return Err(SettingsError::InvalidValue(format!(
                "volume {} outside [0, 1]",
                self.volume
            )));
        }
        Ok(())
    }

    /// Stamps the values with a write instant, producing the persisted record.
    pub fn stamped(self, timestamp: i64) -> VideoSettings {
        VideoSettings {
            playback_rate: self.playback_rate,
            volume: self.volume,
            muted: self.muted,
            timestamp,
        }
    }
}

/// Persisted per-video playback settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSettings {
    pub playback_rate: f64,
    pub volume: f64,
    pub muted: bool,
    /// Last write instant in epoch milliseconds. Zero when never stamped.
    #[serde(default)]
    pub timestamp: i64,
}

impl VideoSettings {
    pub fn playback(&self) -> PlaybackSettings {
        PlaybackSettings {
            playback_rate: self.playback_rate,
            volume: self.volume,
            muted: self.muted,
        }
    }
}

/// All video settings, keyed by video identifier.
pub type VideoSettingsMap = BTreeMap<String, VideoSettings>;
