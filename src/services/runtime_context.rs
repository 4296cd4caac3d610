//! Availability guard for storage calls.
//!
//! The runtime hosting the storage namespace can disappear while callers stay
//! alive (an extension reload leaves its pages open). [`RuntimeContext`] tracks
//! whether that runtime is currently usable, wraps storage calls in a deadline,
//! and schedules a bounded number of reconnection attempts after an
//! invalidation. Once the attempts are spent the context stays degraded until
//! it is recreated.
//!
//! Clones share state, so every component of one execution context sees the
//! same validity.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::GuardConfig;
use crate::services::notifier::{NotificationKind, Notifier};
use crate::storage::ContextProbe;
use crate::types::errors::StorageError;

/// Warning shown once reconnection has been given up.
pub const CONNECTION_LOST_MESSAGE: &str = "Extension connection lost - some features unavailable";

#[derive(Debug)]
struct ContextState {
    valid: bool,
    last_probe: Option<(Instant, bool)>,
    reconnect_attempts: u32,
    degraded: bool,
}

struct Inner {
    probe: Arc<dyn ContextProbe>,
    notifier: Arc<dyn Notifier>,
    config: GuardConfig,
    state: Mutex<ContextState>,
}

/// Shared validity state of one execution context.
#[derive(Clone)]
pub struct RuntimeContext {
    inner: Arc<Inner>,
}

impl RuntimeContext {
    /// Creates a context and probes the runtime once.
    pub fn new(probe: Arc<dyn ContextProbe>, notifier: Arc<dyn Notifier>, config: GuardConfig) -> Self {
        let reachable = probe.is_reachable();
        if reachable {
            debug!("runtime context available");
        } else {
            info!("runtime context unavailable, running in limited mode");
        }

        Self {
            inner: Arc::new(Inner {
                probe,
                notifier,
                config,
                state: Mutex::new(ContextState {
                    valid: reachable,
                    last_probe: Some((Instant::now(), reachable)),
                    reconnect_attempts: 0,
                    degraded: false,
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ContextState> {
        // A poisoned lock only means a panic elsewhere; the state itself is plain data.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether storage calls may currently be attempted.
    ///
    /// An explicit invalidation sticks until a reconnect succeeds. Otherwise the
    /// runtime is probed, reusing a probe result younger than the cache window.
    pub fn is_valid(&self) -> bool {
        let mut state = self.state();
        if !state.valid {
            return false;
        }

        let now = Instant::now();
        if let Some((at, reachable)) = state.last_probe {
            if now.duration_since(at) < self.inner.config.probe_cache() {
                if !reachable {
                    state.valid = false;
                }
                return reachable;
            }
        }

        let reachable = self.inner.probe.is_reachable();
        state.last_probe = Some((now, reachable));
        if !reachable {
            warn!("runtime context no longer reachable");
            state.valid = false;
        }
        reachable
    }

    /// Marks the context invalid without scheduling a reconnect.
    pub fn invalidate(&self) {
        let mut state = self.state();
        if state.valid {
            info!("runtime context invalidated");
        }
        state.valid = false;
    }

    /// Probes the runtime immediately and revalidates the context if it answers.
    ///
    /// A degraded context never revalidates.
    pub fn try_reconnect(&self) -> bool {
        let mut state = self.state();
        if state.degraded {
            return false;
        }

        let reachable = self.inner.probe.is_reachable();
        state.last_probe = Some((Instant::now(), reachable));
        if reachable {
            state.valid = true;
            state.reconnect_attempts = 0;
        }
        reachable
    }

    /// Reconnect attempts made since the last successful connection.
    pub fn reconnect_attempts(&self) -> u32 {
        self.state().reconnect_attempts
    }

    /// True once reconnection has been abandoned.
    pub fn is_degraded(&self) -> bool {
        self.state().degraded
    }

    /// Runs `op` under the guard and returns its result.
    ///
    /// The operation is not started when the context is invalid. A call that
    /// outlives the configured deadline fails with [`StorageError::Timeout`].
    /// Timeouts and invalidation errors invalidate the context and start the
    /// reconnect policy; other errors leave validity untouched.
    pub async fn execute<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        if !self.is_valid() {
            debug!("runtime context invalid, skipping storage operation");
            return Err(StorageError::Unavailable);
        }

        let deadline = self.inner.config.operation_timeout();
        match tokio::time::timeout(deadline, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if e.is_context_invalidation() {
                    warn!(error = %e, "storage operation hit an invalidated context");
                    self.handle_invalidation();
                } else {
                    warn!(error = %e, "storage operation failed");
                }
                Err(e)
            }
            Err(_) => {
                warn!(timeout_ms = self.inner.config.operation_timeout_ms, "storage operation timed out");
                self.handle_invalidation();
                Err(StorageError::Timeout(self.inner.config.operation_timeout_ms))
            }
        }
    }

    /// Runs `op` under the guard, swallowing every failure.
    ///
    /// Returns `None` and calls `on_unavailable` when the context is invalid or
    /// the operation fails for any reason.
    pub async fn guarded_operation<T, F, U>(&self, op: F, on_unavailable: Option<U>) -> Option<T>
    where
        F: Future<Output = Result<T, StorageError>>,
        U: FnOnce(),
    {
        match self.execute(op).await {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "guarded operation fell back");
                if let Some(fallback) = on_unavailable {
                    fallback();
                }
                None
            }
        }
    }

    /// Invalidates the context and either schedules the next reconnect attempt
    /// or, when attempts are exhausted, enters degraded mode and warns the user.
    fn handle_invalidation(&self) {
        let next_attempt = {
            let mut state = self.state();
            state.valid = false;
            if state.degraded {
                return;
            }
            if state.reconnect_attempts < self.inner.config.max_reconnect_attempts {
                state.reconnect_attempts += 1;
                Some(state.reconnect_attempts)
            } else {
                state.degraded = true;
                None
            }
        };

        match next_attempt {
            Some(attempt) => self.schedule_reconnect(attempt),
            None => {
                warn!("max reconnection attempts exceeded, staying in degraded mode");
                self.inner
                    .notifier
                    .notify(CONNECTION_LOST_MESSAGE, NotificationKind::Warning);
            }
        }
    }

    fn schedule_reconnect(&self, attempt: u32) {
        let delay = self.inner.config.backoff(attempt);
        let max = self.inner.config.max_reconnect_attempts;
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(attempt, "no async runtime, reconnect not scheduled");
                return;
            }
        };

        info!(attempt, max, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        let context = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if context.try_reconnect() {
                info!(attempt, "reconnected to runtime context");
            } else if !context.is_degraded() {
                debug!(attempt, "reconnect attempt failed");
                context.handle_invalidation();
            }
        });
    }
}
