//! Export, import and clear-all of the stored data.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::managers::bookmark_manager::validate_bookmark;
use crate::managers::settings_manager::{decode_settings_map, DEFAULT_PROMPT_ENABLED};
use crate::services::maintenance::install_defaults;
use crate::services::runtime_context::RuntimeContext;
use crate::storage::{keys, StorageAccessor, StorageArea, StorageMap};
use crate::types::bookmark::BookmarkCollection;
use crate::types::errors::{StorageError, TransferError};
use crate::types::export::{ExportDocument, ImportDocument, EXPORT_FORMAT_VERSION};
use crate::types::settings::VideoSettingsMap;

pub fn build_export(
    bookmarks: BookmarkCollection,
    video_settings: VideoSettingsMap,
    prompt_enabled: bool,
    at: DateTime<Utc>,
) -> ExportDocument {
    ExportDocument {
        bookmarks,
        video_settings,
        prompt_enabled,
        export_date: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        version: EXPORT_FORMAT_VERSION.to_string(),
    }
}

/// Validates an uploaded document. It must be an object carrying at least one
/// of `bookmarks` or `videoSettings`, each shaped like the stored mapping, and
/// every bookmark must pass the same checks as one saved directly.
pub fn parse_import(data: &Value) -> Result<ImportDocument, TransferError> {
    let object = data
        .as_object()
        .ok_or_else(|| TransferError::InvalidFormat("expected a JSON object".to_string()))?;

    let has_section = |key: &str| object.get(key).is_some_and(|v| !v.is_null());
    if !has_section(keys::BOOKMARKS) && !has_section(keys::VIDEO_SETTINGS) {
        return Err(TransferError::InvalidFormat(
            "missing bookmarks and videoSettings".to_string(),
        ));
    }

    let document: ImportDocument =
        serde_json::from_value(data.clone()).map_err(|e| TransferError::InvalidFormat(e.to_string()))?;

    for (video_id, list) in document.bookmarks.iter().flatten() {
        for bookmark in list {
            validate_bookmark(bookmark)
                .map_err(|e| TransferError::InvalidFormat(format!("bookmark for {}: {}", video_id, e)))?;
        }
    }
    Ok(document)
}

/// Merges `import` into the current data. Imported video ids replace existing
/// ones; every other id is kept.
pub fn merge_import(
    bookmarks: &mut BookmarkCollection,
    video_settings: &mut VideoSettingsMap,
    prompt_enabled: &mut bool,
    import: ImportDocument,
) {
    if let Some(imported) = import.bookmarks {
        bookmarks.extend(imported);
    }
    if let Some(imported) = import.video_settings {
        video_settings.extend(imported);
    }
    if let Some(enabled) = import.prompt_enabled {
        *prompt_enabled = enabled;
    }
}

/// Whole-namespace operations for backup and reset.
pub struct DataTransfer<S> {
    storage: StorageAccessor<S>,
    context: RuntimeContext,
}

impl<S: StorageArea> DataTransfer<S> {
    pub fn new(storage: StorageAccessor<S>, context: RuntimeContext) -> Self {
        Self { storage, context }
    }

    async fn read_current(&self) -> Result<(BookmarkCollection, VideoSettingsMap, bool), TransferError> {
        let mut items = self
            .context
            .execute(
                self.storage
                    .get(&[keys::BOOKMARKS, keys::VIDEO_SETTINGS, keys::PROMPT_ENABLED]),
            )
            .await?;

        let bookmarks = take_or_default(&mut items, keys::BOOKMARKS)?;
        let video_settings =
            decode_settings_map(items.remove(keys::VIDEO_SETTINGS).unwrap_or(Value::Null))?;
        let prompt_enabled = items
            .get(keys::PROMPT_ENABLED)
            .and_then(Value::as_bool)
            .unwrap_or(DEFAULT_PROMPT_ENABLED);
        Ok((bookmarks, video_settings, prompt_enabled))
    }

    pub async fn export(&self) -> Result<ExportDocument, TransferError> {
        let (bookmarks, video_settings, prompt_enabled) = self.read_current().await?;
        let document = build_export(bookmarks, video_settings, prompt_enabled, Utc::now());
        info!(
            videos = document.bookmarks.len(),
            settings = document.video_settings.len(),
            "data exported"
        );
        Ok(document)
    }

    /// Export rendered as pretty JSON, the content of a backup file.
    pub async fn export_json(&self) -> Result<String, TransferError> {
        let document = self.export().await?;
        serde_json::to_string_pretty(&document)
            .map_err(|e| TransferError::Storage(StorageError::from(e)))
    }

    /// Validates `data` and merges it into the stored state in one write.
    /// A rejected document leaves storage untouched.
    pub async fn import(&self, data: &Value) -> Result<(), TransferError> {
        let import = match parse_import(data) {
            Ok(import) => import,
            Err(e) => {
                warn!(error = %e, "import rejected");
                return Err(e);
            }
        };

        let _guard = self.storage.lock_writes().await;
        let (mut bookmarks, mut video_settings, mut prompt_enabled) = self.read_current().await?;
        merge_import(&mut bookmarks, &mut video_settings, &mut prompt_enabled, import);

        let mut items = StorageMap::new();
        items.insert(keys::BOOKMARKS.to_string(), to_value(&bookmarks)?);
        items.insert(keys::VIDEO_SETTINGS.to_string(), to_value(&video_settings)?);
        items.insert(keys::PROMPT_ENABLED.to_string(), Value::Bool(prompt_enabled));
        self.context.execute(self.storage.set(items)).await?;

        info!(videos = bookmarks.len(), settings = video_settings.len(), "data imported");
        Ok(())
    }

    /// Empties the namespace and re-seeds the install defaults.
    pub async fn clear_all(&self) -> Result<(), TransferError> {
        let _guard = self.storage.lock_writes().await;
        self.context.execute(self.storage.clear()).await?;
        self.context.execute(self.storage.set(install_defaults())).await?;
        info!("all data cleared");
        Ok(())
    }
}

fn take_or_default<T: serde::de::DeserializeOwned + Default>(
    items: &mut StorageMap,
    key: &str,
) -> Result<T, TransferError> {
    match items.remove(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value).map_err(|e| {
            TransferError::Storage(StorageError::Serialization(format!("'{}': {}", key, e)))
        }),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, TransferError> {
    serde_json::to_value(value).map_err(|e| TransferError::Storage(StorageError::from(e)))
}
