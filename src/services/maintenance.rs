//! Stored-data lifecycle: install seeding, schema migration and age-based cleanup.
//!
//! Migration and cleanup are planned by pure functions over the stored values;
//! [`MaintenanceEngine`] only reads the inputs and writes the plan back.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::CleanupConfig;
use crate::managers::settings_manager::decode_settings_map;
use crate::services::clock;
use crate::services::runtime_context::RuntimeContext;
use crate::storage::{keys, StorageAccessor, StorageArea, StorageMap};
use crate::types::bookmark::{BookmarkCollection, UNKNOWN_VIDEO_TITLE};
use crate::types::errors::{MaintenanceError, StorageError};
use crate::types::settings::{PlaybackSettings, VideoSettings, VideoSettingsMap};

/// Layout version written by this crate.
pub const CURRENT_DATA_VERSION: u64 = 2;

/// Why the lifecycle hook ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
}

/// What a migration run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u64,
    pub migrated_settings: usize,
    pub backfilled_bookmarks: usize,
    pub prompt_defaulted: bool,
    pub legacy_removed: bool,
    pub version_written: bool,
}

impl MigrationReport {
    pub fn changed(&self) -> bool {
        self.migrated_settings > 0
            || self.backfilled_bookmarks > 0
            || self.prompt_defaulted
            || self.legacy_removed
            || self.version_written
    }
}

/// Keys to write and keys to delete for one migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub report: MigrationReport,
    pub updates: StorageMap,
    pub removals: Vec<&'static str>,
}

/// What a cleanup run removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub bookmarks_removed: usize,
    pub videos_removed: usize,
    pub settings_removed: usize,
}

impl CleanupReport {
    pub fn changed(&self) -> bool {
        self.bookmarks_removed > 0 || self.settings_removed > 0
    }
}

/// Items written on first install.
pub fn install_defaults() -> StorageMap {
    let mut items = StorageMap::new();
    items.insert(keys::PROMPT_ENABLED.to_string(), Value::Bool(true));
    items.insert(keys::BOOKMARKS.to_string(), json!({}));
    items.insert(keys::VIDEO_SETTINGS.to_string(), json!({}));
    items.insert(keys::SCHEMA_VERSION.to_string(), json!(CURRENT_DATA_VERSION));
    items
}

/// Layout version of `items`.
///
/// Without an explicit marker, a legacy `settings` key means version 1 and
/// anything else is treated as current.
pub fn stored_version(items: &StorageMap) -> u64 {
    match items.get(keys::SCHEMA_VERSION).and_then(Value::as_u64) {
        Some(version) => version,
        None if items.contains_key(keys::LEGACY_SETTINGS) => 1,
        None => CURRENT_DATA_VERSION,
    }
}

fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Turns one legacy settings record into the current shape.
///
/// Missing or mistyped values fall back to the playback defaults. Returns
/// `None` when the record is not an object at all.
fn convert_legacy_record(record: &Value, now: i64) -> Option<VideoSettings> {
    let record = record.as_object()?;
    let defaults = PlaybackSettings::default();
    let playback = PlaybackSettings {
        playback_rate: record
            .get("playbackRate")
            .and_then(Value::as_f64)
            .unwrap_or(defaults.playback_rate),
        volume: record
            .get("volume")
            .and_then(Value::as_f64)
            .unwrap_or(defaults.volume),
        muted: record
            .get("muted")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.muted),
    };
    Some(playback.stamped(now))
}

/// Plans the upgrade of `items` to the current layout.
///
/// Applying the plan and planning again yields an empty plan.
pub fn plan_migration(items: &StorageMap, now: i64) -> Result<MigrationPlan, MaintenanceError> {
    let mut plan = MigrationPlan::default();
    let version = stored_version(items);
    plan.report.from_version = version;

    if let Some(legacy) = items.get(keys::LEGACY_SETTINGS) {
        if version < CURRENT_DATA_VERSION {
            let legacy = legacy.as_object().ok_or_else(|| {
                MaintenanceError::CorruptData("legacy settings is not an object".to_string())
            })?;
            let mut settings = match items.get(keys::VIDEO_SETTINGS) {
                Some(Value::Object(existing)) => existing.clone(),
                None | Some(Value::Null) => StorageMap::new(),
                Some(_) => {
                    return Err(MaintenanceError::CorruptData(
                        "videoSettings is not an object".to_string(),
                    ))
                }
            };

            for (video_id, record) in legacy {
                if settings.contains_key(video_id) {
                    continue;
                }
                let Some(converted) = convert_legacy_record(record, now) else {
                    warn!(video_id = %video_id, "skipping malformed legacy settings record");
                    continue;
                };
                let converted = serde_json::to_value(converted).map_err(StorageError::from)?;
                settings.insert(video_id.clone(), converted);
                plan.report.migrated_settings += 1;
            }
            plan.updates
                .insert(keys::VIDEO_SETTINGS.to_string(), Value::Object(settings));
        }
        plan.removals.push(keys::LEGACY_SETTINGS);
        plan.report.legacy_removed = true;
    }

    if let Some(Value::Object(bookmarks)) = items.get(keys::BOOKMARKS) {
        let mut bookmarks = bookmarks.clone();
        let mut backfilled = 0;
        for list in bookmarks.values_mut() {
            let Value::Array(list) = list else { continue };
            for entry in list.iter_mut().filter_map(Value::as_object_mut) {
                let mut touched = false;
                if is_unset(entry.get("timestamp")) {
                    entry.insert("timestamp".to_string(), json!(now));
                    touched = true;
                }
                if is_unset(entry.get("videoTitle")) {
                    entry.insert("videoTitle".to_string(), json!(UNKNOWN_VIDEO_TITLE));
                    touched = true;
                }
                if touched {
                    backfilled += 1;
                }
            }
        }
        if backfilled > 0 {
            plan.report.backfilled_bookmarks = backfilled;
            plan.updates
                .insert(keys::BOOKMARKS.to_string(), Value::Object(bookmarks));
        }
    }

    if matches!(items.get(keys::PROMPT_ENABLED), None | Some(Value::Null)) {
        plan.updates
            .insert(keys::PROMPT_ENABLED.to_string(), Value::Bool(true));
        plan.report.prompt_defaulted = true;
    }

    if items.get(keys::SCHEMA_VERSION).and_then(Value::as_u64) != Some(CURRENT_DATA_VERSION) {
        plan.updates
            .insert(keys::SCHEMA_VERSION.to_string(), json!(CURRENT_DATA_VERSION));
        plan.report.version_written = true;
    }

    Ok(plan)
}

/// Drops stale records in place.
///
/// A bookmark survives only with a timestamp strictly newer than the bookmark
/// window; a video whose list empties loses its key. A settings record is
/// dropped when it carries a timestamp older than the settings window.
pub fn purge_stale(
    bookmarks: &mut BookmarkCollection,
    settings: &mut VideoSettingsMap,
    now: i64,
    config: &CleanupConfig,
) -> CleanupReport {
    let bookmark_cutoff = clock::days_before(now, config.bookmark_max_age_days);
    let settings_cutoff = clock::days_before(now, config.settings_max_age_days);
    let mut report = CleanupReport::default();

    bookmarks.retain(|_, list| {
        let before = list.len();
        list.retain(|b| b.timestamp != 0 && b.timestamp > bookmark_cutoff);
        report.bookmarks_removed += before - list.len();
        if list.is_empty() && before > 0 {
            report.videos_removed += 1;
        }
        !list.is_empty()
    });

    let before = settings.len();
    settings.retain(|_, s| !(s.timestamp != 0 && s.timestamp < settings_cutoff));
    report.settings_removed = before - settings.len();

    report
}

fn decode<T: serde::de::DeserializeOwned + Default>(
    items: &mut StorageMap,
    key: &str,
) -> Result<T, StorageError> {
    match items.remove(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| StorageError::Serialization(format!("'{}': {}", key, e))),
    }
}

/// Runs migrations and cleanup against the shared storage.
pub struct MaintenanceEngine<S> {
    storage: StorageAccessor<S>,
    context: RuntimeContext,
    config: CleanupConfig,
}

impl<S: StorageArea> MaintenanceEngine<S> {
    pub fn new(storage: StorageAccessor<S>, context: RuntimeContext, config: CleanupConfig) -> Self {
        Self {
            storage,
            context,
            config,
        }
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Install seeds defaults; update migrates.
    pub async fn on_installed(&self, reason: InstallReason) -> Result<(), MaintenanceError> {
        match reason {
            InstallReason::Install => {
                self.seed_defaults().await?;
                info!("vidmark installed, defaults seeded");
            }
            InstallReason::Update => {
                let report = self.migrate().await?;
                info!(from_version = report.from_version, "vidmark updated");
            }
        }
        Ok(())
    }

    /// Startup hook for a host that cannot tell install from restart: an empty
    /// store is treated as a fresh install, anything else is migrated.
    pub async fn on_startup(&self) -> Result<InstallReason, MaintenanceError> {
        let items = self.context.execute(self.storage.get_all()).await?;
        let reason = if items.is_empty() {
            InstallReason::Install
        } else {
            InstallReason::Update
        };
        self.on_installed(reason).await?;
        Ok(reason)
    }

    /// Writes the install defaults over whatever is stored under those keys.
    pub async fn seed_defaults(&self) -> Result<(), MaintenanceError> {
        let _guard = self.storage.lock_writes().await;
        self.context.execute(self.storage.set(install_defaults())).await?;
        Ok(())
    }

    /// Upgrades the stored layout. Safe to run any number of times.
    pub async fn migrate(&self) -> Result<MigrationReport, MaintenanceError> {
        let _guard = self.storage.lock_writes().await;
        let items = self.context.execute(self.storage.get_all()).await?;
        let plan = plan_migration(&items, clock::now_millis())?;

        if !plan.updates.is_empty() {
            self.context.execute(self.storage.set(plan.updates)).await?;
        }
        if !plan.removals.is_empty() {
            self.context
                .execute(self.storage.remove(&plan.removals))
                .await?;
        }

        if plan.report.changed() {
            info!(
                from_version = plan.report.from_version,
                migrated_settings = plan.report.migrated_settings,
                backfilled_bookmarks = plan.report.backfilled_bookmarks,
                "data migration completed"
            );
        } else {
            debug!("no data migration needed");
        }
        Ok(plan.report)
    }

    pub async fn cleanup_old_data(&self) -> Result<CleanupReport, MaintenanceError> {
        self.cleanup_old_data_at(clock::now_millis()).await
    }

    /// Purges records stale at `now`, writing both mappings in one call if anything went.
    pub async fn cleanup_old_data_at(&self, now: i64) -> Result<CleanupReport, MaintenanceError> {
        let _guard = self.storage.lock_writes().await;
        let mut items = self
            .context
            .execute(self.storage.get(&[keys::BOOKMARKS, keys::VIDEO_SETTINGS]))
            .await?;
        let mut bookmarks: BookmarkCollection = decode(&mut items, keys::BOOKMARKS)?;
        let mut settings = decode_settings_map(items.remove(keys::VIDEO_SETTINGS).unwrap_or(Value::Null))?;

        let report = purge_stale(&mut bookmarks, &mut settings, now, &self.config);
        if !report.changed() {
            debug!("no old data to clean up");
            return Ok(report);
        }

        let mut updates = StorageMap::new();
        updates.insert(
            keys::BOOKMARKS.to_string(),
            serde_json::to_value(&bookmarks).map_err(StorageError::from)?,
        );
        updates.insert(
            keys::VIDEO_SETTINGS.to_string(),
            serde_json::to_value(&settings).map_err(StorageError::from)?,
        );
        self.context.execute(self.storage.set(updates)).await?;

        info!(
            bookmarks_removed = report.bookmarks_removed,
            videos_removed = report.videos_removed,
            settings_removed = report.settings_removed,
            "cleaned up old data"
        );
        Ok(report)
    }

    /// Best-effort cleanup: failures are logged and dropped.
    pub async fn run_cleanup(&self) -> Option<CleanupReport> {
        match self.cleanup_old_data().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "failed to clean up old data");
                None
            }
        }
    }
}

/// Runs cleanup after the configured first delay and then once per period.
pub fn spawn_cleanup_schedule<S>(engine: Arc<MaintenanceEngine<S>>) -> JoinHandle<()>
where
    S: StorageArea + 'static,
{
    let first = Instant::now() + engine.config.first_run_delay();
    let period = engine.config.period().max(Duration::from_secs(1));
    info!(
        first_run_secs = engine.config.first_run_delay().as_secs(),
        period_secs = period.as_secs(),
        "cleanup schedule created"
    );

    tokio::spawn(async move {
        let mut interval = interval_at(first, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            debug!("cleanup timer fired");
            engine.run_cleanup().await;
        }
    })
}
