// vidmark configuration
// Tunables for the availability guard, the cleanup schedule and the playback
// persistence policy. Stored as a JSON file in the platform config directory;
// every field is optional and falls back to its default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform;
use crate::types::errors::ConfigError;

/// File name of the storage database inside the data directory.
pub const DATABASE_FILE: &str = "vidmark.db";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct VidmarkConfig {
    /// Explicit database path. Defaults to `<data dir>/vidmark.db`.
    pub storage_path: Option<PathBuf>,
    pub guard: GuardConfig,
    pub cleanup: CleanupConfig,
    pub playback: PlaybackConfig,
}

/// Availability guard tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuardConfig {
    /// How long a reachability probe result is reused.
    pub probe_cache_ms: u64,
    /// Deadline for a single guarded storage operation.
    pub operation_timeout_ms: u64,
    pub max_reconnect_attempts: u32,
    /// Reconnect attempt `n` waits `n * backoff_step_ms`.
    pub backoff_step_ms: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            probe_cache_ms: 1_000,
            operation_timeout_ms: 5_000,
            max_reconnect_attempts: 3,
            backoff_step_ms: 1_000,
        }
    }
}

impl GuardConfig {
    pub fn probe_cache(&self) -> Duration {
        Duration::from_millis(self.probe_cache_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_step_ms.saturating_mul(u64::from(attempt)))
    }
}

/// Age-based cleanup windows and schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanupConfig {
    pub bookmark_max_age_days: i64,
    pub settings_max_age_days: i64,
    pub first_run_delay_minutes: u64,
    pub period_minutes: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            bookmark_max_age_days: 90,
            settings_max_age_days: 30,
            first_run_delay_minutes: 60,
            period_minutes: 24 * 60,
        }
    }
}

impl CleanupConfig {
    pub fn first_run_delay(&self) -> Duration {
        Duration::from_secs(self.first_run_delay_minutes * 60)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_minutes * 60)
    }
}

/// Playback settings change detection and save triggers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    pub poll_interval_ms: u64,
    /// Minimum difference for a float field to count as changed.
    pub change_epsilon: f64,
    /// Idle time after a pause before settings are saved.
    pub idle_save_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            change_epsilon: 0.01,
            idle_save_ms: 5_000,
        }
    }
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_save(&self) -> Duration {
        Duration::from_millis(self.idle_save_ms)
    }
}

impl VidmarkConfig {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        platform::get_config_dir().join("config.json")
    }

    /// Loads the config file at `path`.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&content).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to parse config file: {}", e))
        })
    }

    /// Writes the config as pretty JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config file: {}", e)))
    }

    /// Resolved database path.
    pub fn storage_path(&self) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(|| platform::get_data_dir().join(DATABASE_FILE))
    }
}
