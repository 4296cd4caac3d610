//! Playback settings persistence policy.
//!
//! Live values are polled into a snapshot but never written on change alone.
//! Writes happen on discrete events: a pause that stays idle long enough, the
//! page unloading, or navigation to another video. A write always takes the
//! element's values at that moment; the snapshot only drives change detection.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::PlaybackConfig;
use crate::managers::settings_manager::SettingsStore;
use crate::services::video_url::{extract_video_id, is_supported_video_url};
use crate::storage::StorageArea;
use crate::types::errors::SettingsError;
use crate::types::settings::{PlaybackSettings, VideoSettings};

/// Tracks the last observed playback values.
#[derive(Debug, Clone)]
pub struct SettingsMonitor {
    snapshot: PlaybackSettings,
    epsilon: f64,
}

impl SettingsMonitor {
    pub fn new(initial: PlaybackSettings, epsilon: f64) -> Self {
        Self {
            snapshot: initial,
            epsilon,
        }
    }

    /// Floats differ by more than epsilon, or `muted` differs at all.
    pub fn has_diverged(&self, live: &PlaybackSettings) -> bool {
        (live.playback_rate - self.snapshot.playback_rate).abs() > self.epsilon
            || (live.volume - self.snapshot.volume).abs() > self.epsilon
            || live.muted != self.snapshot.muted
    }

    /// Updates the snapshot from `live`. Returns true when it changed.
    pub fn poll(&mut self, live: PlaybackSettings) -> bool {
        if !self.has_diverged(&live) {
            return false;
        }
        debug!(
            rate = live.playback_rate,
            volume = live.volume,
            muted = live.muted,
            "playback settings changed"
        );
        self.snapshot = live;
        true
    }

    pub fn snapshot(&self) -> PlaybackSettings {
        self.snapshot
    }
}

/// Discrete media events that feed the save trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Pause,
    Play,
    BeforeUnload,
    NavigationAway,
}

/// Decides when the current settings should be persisted.
#[derive(Debug, Clone)]
pub struct SaveTrigger {
    pending_idle_since: Option<Instant>,
    idle: Duration,
}

impl SaveTrigger {
    pub fn new(idle: Duration) -> Self {
        Self {
            pending_idle_since: None,
            idle,
        }
    }

    /// Feeds one event. Returns true when a save is due right away.
    ///
    /// A pause only arms the idle timer; play disarms it.
    pub fn on_event(&mut self, event: PlaybackEvent, now: Instant) -> bool {
        match event {
            PlaybackEvent::Pause => {
                self.pending_idle_since = Some(now);
                false
            }
            PlaybackEvent::Play => {
                self.pending_idle_since = None;
                false
            }
            PlaybackEvent::BeforeUnload | PlaybackEvent::NavigationAway => {
                self.pending_idle_since = None;
                true
            }
        }
    }

    /// Returns true once, when a pause has stayed idle for the configured time.
    pub fn poll_idle(&mut self, now: Instant) -> bool {
        match self.pending_idle_since {
            Some(since) if now.saturating_duration_since(since) >= self.idle => {
                self.pending_idle_since = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending_idle_since.is_some()
    }
}

/// The media element a session reads from and applies to.
pub trait MediaElement {
    /// Current values, or `None` when no element is attached.
    fn current_settings(&self) -> Option<PlaybackSettings>;

    fn apply(&mut self, settings: PlaybackSettings);
}

/// Settings persistence for one video page.
pub struct PlaybackSession<S> {
    video_id: String,
    store: SettingsStore<S>,
    monitor: SettingsMonitor,
    trigger: SaveTrigger,
}

impl<S: StorageArea> PlaybackSession<S> {
    pub fn new(video_id: impl Into<String>, store: SettingsStore<S>, config: &PlaybackConfig) -> Self {
        Self {
            video_id: video_id.into(),
            store,
            monitor: SettingsMonitor::new(PlaybackSettings::default(), config.change_epsilon),
            trigger: SaveTrigger::new(config.idle_save()),
        }
    }

    /// A session for the video shown at `url`, or `None` on any other page.
    pub fn for_page(url: &str, store: SettingsStore<S>, config: &PlaybackConfig) -> Option<Self> {
        if !is_supported_video_url(url) {
            return None;
        }
        extract_video_id(url).map(|id| Self::new(id, store, config))
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn snapshot(&self) -> PlaybackSettings {
        self.monitor.snapshot()
    }

    /// Applies stored settings for this video to `media`, if any valid ones exist.
    pub async fn load_and_apply<M: MediaElement>(&mut self, media: &mut M) -> Result<bool, SettingsError> {
        match self.store.load_for_apply(&self.video_id).await? {
            Some(settings) => {
                media.apply(settings);
                self.monitor = SettingsMonitor::new(settings, self.monitor.epsilon);
                info!(video_id = %self.video_id, "applied saved settings");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Polls the live values into the snapshot.
    pub fn observe(&mut self, live: PlaybackSettings) -> bool {
        self.monitor.poll(live)
    }

    /// Handles a media event, saving the live values of `media` when it calls for it.
    pub async fn on_event<M: MediaElement>(
        &mut self,
        event: PlaybackEvent,
        now: Instant,
        media: &M,
    ) -> Result<Option<VideoSettings>, SettingsError> {
        if self.trigger.on_event(event, now) {
            return self.save(media).await;
        }
        Ok(None)
    }

    /// Saves when a pending pause has gone idle.
    pub async fn tick<M: MediaElement>(
        &mut self,
        now: Instant,
        media: &M,
    ) -> Result<Option<VideoSettings>, SettingsError> {
        if self.trigger.poll_idle(now) {
            return self.save(media).await;
        }
        Ok(None)
    }

    /// Nothing is written when no element is attached.
    async fn save<M: MediaElement>(&mut self, media: &M) -> Result<Option<VideoSettings>, SettingsError> {
        let Some(live) = media.current_settings() else {
            debug!(video_id = %self.video_id, "no media element, settings not saved");
            return Ok(None);
        };
        self.monitor.poll(live);
        self.store.save(&self.video_id, live).await.map(Some)
    }
}

/// Polls `media` every `poll_interval` until `shutdown` flips to true.
///
/// Each tick refreshes the snapshot and fires an idle save if one is due.
/// Storage failures are logged; the loop keeps running.
pub async fn run_settings_monitor<S, M>(
    session: &mut PlaybackSession<S>,
    media: &M,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    S: StorageArea,
    M: MediaElement,
{
    let mut interval = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(live) = media.current_settings() {
                    session.observe(live);
                }
                if let Err(e) = session.tick(Instant::now(), media).await {
                    warn!(video_id = %session.video_id(), error = %e, "idle save failed");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!(video_id = %session.video_id(), "settings monitor stopped");
                    break;
                }
            }
        }
    }
}
