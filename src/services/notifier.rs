//! User-visible notifications.
//!
//! Rendering is the host's job; components only describe what to show.

use std::sync::Mutex;

use tracing::{error, info, warn};

/// Severity of a notification, which the host maps to a colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

/// Receives messages meant for the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, kind: NotificationKind);
}

/// Writes notifications to the log. Used where no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) {
        match kind {
            NotificationKind::Info | NotificationKind::Success => info!(?kind, "{}", message),
            NotificationKind::Warning => warn!("{}", message),
            NotificationKind::Error => error!("{}", message),
        }
    }
}

/// Queues notifications until the host drains them.
#[derive(Debug, Default)]
pub struct QueuedNotifier {
    pending: Mutex<Vec<(String, NotificationKind)>>,
}

impl QueuedNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<(String, NotificationKind)> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => Vec::new(),
        }
    }
}

impl Notifier for QueuedNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push((message.to_string(), kind));
        }
    }
}
