// src/file_manager.rs - Storage capability surface and local implementation
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// File storage and metadata lookup, provided by the host environment.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn folder_exists(&self, location: &str, path: &str) -> bool;

    async fn create_folder(&self, location: &str, path: &str) -> Result<(), StorageError>;

    /// Absolute on-disk path for a stored file or folder.
    fn resolve_disk_path(&self, location: &str, path: &str) -> PathBuf;

    /// Analysis metadata for a stored gcode file, when the host has any.
    /// Shape when present: `{"analysis": {"printingArea": ...}, ...}`.
    async fn get_metadata(&self, origin: &str, path: &str) -> Option<Value>;
}

/// Storage rooted at a local directory. Metadata comes from an optional
/// `<file>.meta.json` sidecar; hosts with a real analysis backend supply
/// their own [`Storage`] implementation instead.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn sidecar_path(&self, path: &str) -> PathBuf {
        let mut name = self.root.join(path).into_os_string();
        name.push(".meta.json");
        PathBuf::from(name)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn folder_exists(&self, _location: &str, path: &str) -> bool {
        fs::metadata(self.root.join(path))
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn create_folder(&self, _location: &str, path: &str) -> Result<(), StorageError> {
        fs::create_dir_all(self.root.join(path)).await?;
        Ok(())
    }

    fn resolve_disk_path(&self, _location: &str, path: &str) -> PathBuf {
        self.root.join(path)
    }

    async fn get_metadata(&self, _origin: &str, path: &str) -> Option<Value> {
        let raw = fs::read_to_string(self.sidecar_path(path)).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed metadata sidecar for {path}: {e}");
                None
            }
        }
    }
}

/// Ensures the configured gcode folder exists and returns its disk path.
pub async fn prepare_gcode_folder(
    storage: &dyn Storage,
    folder: &str,
) -> Result<PathBuf, StorageError> {
    if !storage.folder_exists("local", folder).await {
        storage.create_folder("local", folder).await?;
    }
    let path = storage.resolve_disk_path("local", folder);
    tracing::info!("gcode folder: {}", path.display());
    Ok(path)
}
