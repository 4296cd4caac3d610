//! App core for vidmark.
//!
//! Central struct wiring one storage backend to the guard, stores, lifecycle
//! engine and message router that share it.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::config::VidmarkConfig;
use crate::managers::bookmark_manager::BookmarkStore;
use crate::managers::settings_manager::SettingsStore;
use crate::rpc_handler::MessageRouter;
use crate::services::data_transfer::DataTransfer;
use crate::services::maintenance::{self, InstallReason, MaintenanceEngine};
use crate::services::notifier::{LogNotifier, Notifier};
use crate::services::runtime_context::RuntimeContext;
use crate::storage::{ContextProbe, MemoryStorage, SqliteStorage, StorageAccessor, StorageArea};
use crate::types::errors::{MaintenanceError, StorageError};

/// Everything one execution context needs, built over a single backend.
pub struct App<S = SqliteStorage> {
    pub config: VidmarkConfig,
    pub storage: StorageAccessor<S>,
    pub context: RuntimeContext,
    pub notifier: Arc<dyn Notifier>,
    pub bookmarks: BookmarkStore<S>,
    pub settings: SettingsStore<S>,
    pub transfer: Arc<DataTransfer<S>>,
    pub maintenance: Arc<MaintenanceEngine<S>>,
    pub router: MessageRouter<S>,
}

impl App<SqliteStorage> {
    /// Opens the SQLite store at the configured path, creating its directory.
    pub fn open(config: VidmarkConfig) -> Result<Self, StorageError> {
        let path = config.storage_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Backend(format!("failed to create data directory: {}", e))
            })?;
        }
        info!(path = %path.display(), "opening storage");
        let area = SqliteStorage::open(&path)?;
        Ok(Self::with_storage(area, config, Arc::new(LogNotifier)))
    }
}

impl App<MemoryStorage> {
    /// An app over a fresh in-memory store.
    pub fn in_memory(config: VidmarkConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_storage(MemoryStorage::new(), config, notifier)
    }
}

impl<S> App<S>
where
    S: StorageArea + ContextProbe + 'static,
{
    pub fn with_storage(area: S, config: VidmarkConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self::from_arc(Arc::new(area), config, notifier)
    }

    /// Builds the app over a shared backend, so several apps can model
    /// separate contexts writing to one namespace.
    pub fn from_arc(area: Arc<S>, config: VidmarkConfig, notifier: Arc<dyn Notifier>) -> Self {
        let storage = StorageAccessor::from_arc(area);
        let context = RuntimeContext::new(
            Arc::new(storage.clone()),
            Arc::clone(&notifier),
            config.guard.clone(),
        );

        let bookmarks = BookmarkStore::new(storage.clone(), context.clone(), Arc::clone(&notifier));
        let settings = SettingsStore::new(storage.clone(), context.clone(), Arc::clone(&notifier));
        let transfer = Arc::new(DataTransfer::new(storage.clone(), context.clone()));
        let maintenance = Arc::new(MaintenanceEngine::new(
            storage.clone(),
            context.clone(),
            config.cleanup.clone(),
        ));
        let router = MessageRouter::new(bookmarks.clone(), settings.clone(), Arc::clone(&transfer));

        Self {
            config,
            storage,
            context,
            notifier,
            bookmarks,
            settings,
            transfer,
            maintenance,
            router,
        }
    }

    /// Startup sequence: seed an empty store or migrate an existing one.
    pub async fn startup(&self) -> Result<InstallReason, MaintenanceError> {
        let reason = self.maintenance.on_startup().await?;
        info!(?reason, version = maintenance::CURRENT_DATA_VERSION, "storage ready");
        Ok(reason)
    }

    /// Starts the periodic cleanup task. Must be called inside a tokio runtime.
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        maintenance::spawn_cleanup_schedule(Arc::clone(&self.maintenance))
    }
}
