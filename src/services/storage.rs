use crate::models::StoredFile;
use crate::services::naming::NamingStrategy;
use crate::utils::validation::{ValidationError, original_extension, validate_name};
use futures::Stream;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions, ReadDir};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid name: {0}")]
    InvalidName(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A validated location for a new upload inside the storage root.
#[derive(Debug, Clone)]
pub struct Destination {
    pub name: String,
    pub path: PathBuf,
}

/// The flat directory holding every uploaded file.
pub struct LocalStorage {
    root: PathBuf,
    naming: Arc<dyn NamingStrategy>,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, naming: Arc<dyn NamingStrategy>) -> Self {
        Self {
            root: root.into(),
            naming,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the storage root if it is missing. Safe to call repeatedly.
    pub async fn ensure_directory(&self) -> Result<(), StorageError> {
        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StorageError::Unavailable(format!(
                "{} exists but is not a directory",
                self.root.display()
            ))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.root).await.map_err(|e| {
                    StorageError::Unavailable(format!(
                        "cannot create {}: {}",
                        self.root.display(),
                        e
                    ))
                })?;
                tracing::info!("📁 Created storage directory {}", self.root.display());
                Ok(())
            }
            Err(e) => Err(StorageError::Unavailable(format!(
                "cannot access {}: {}",
                self.root.display(),
                e
            ))),
        }
    }

    /// Maps an entry name to its path, refusing anything that would leave the root.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        let path = self.root.join(name);
        // Must resolve to a direct child of the root.
        if path.parent() != Some(self.root.as_path()) {
            return Err(StorageError::InvalidName(ValidationError {
                code: "PATH_TRAVERSAL",
                message: format!("{:?} does not resolve inside the storage root", name),
            }));
        }
        Ok(path)
    }

    /// Names a new upload `<field>-<disambiguator><.ext>` using the configured strategy.
    pub fn resolve_destination(
        &self,
        field_name: &str,
        original_name: &str,
    ) -> Result<Destination, StorageError> {
        let extension = original_extension(original_name)?;
        let name = self.naming.file_name(field_name, &extension);
        let path = self.path_for(&name)?;
        Ok(Destination { name, path })
    }

    /// Opens the destination for writing. Never truncates an existing entry.
    pub async fn create_destination(&self, dest: &Destination) -> Result<File, StorageError> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest.path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::Conflict(dest.name.clone()),
                ErrorKind::NotFound => StorageError::Unavailable(format!(
                    "storage directory {} is missing",
                    self.root.display()
                )),
                _ => StorageError::Io(e),
            })
    }

    /// Removes a partially written upload. Failures are logged, not returned.
    pub async fn discard(&self, name: &str) {
        let Ok(path) = self.path_for(name) else {
            return;
        };
        match fs::remove_file(&path).await {
            Ok(()) => tracing::info!("🧹 Removed partial upload {}", name),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove partial upload {}: {}", name, e),
        }
    }

    pub async fn stat(&self, name: &str) -> Result<StoredFile, StorageError> {
        let path = self.path_for(name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(StoredFile {
                name: name.to_string(),
                size: meta.len(),
            }),
            Ok(_) => Err(StorageError::NotFound(name.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Starts a fresh listing of the storage root in filesystem order.
    pub async fn list_entries(&self) -> Result<DirListing, StorageError> {
        let inner = fs::read_dir(&self.root).await.map_err(|e| {
            StorageError::Unavailable(format!("cannot list {}: {}", self.root.display(), e))
        })?;
        Ok(DirListing { inner })
    }
}

/// A one-shot, lazily evaluated listing of the regular files in the storage root.
///
/// Order is whatever the filesystem yields; a consumed listing cannot be restarted.
pub struct DirListing {
    inner: ReadDir,
}

impl DirListing {
    pub async fn next_entry(&mut self) -> Result<Option<StoredFile>, StorageError> {
        while let Some(entry) = self.inner.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => {
                    return Ok(Some(StoredFile {
                        name,
                        size: meta.len(),
                    }));
                }
                Err(raw) => tracing::warn!("Skipping non UTF-8 entry {:?}", raw),
            }
        }
        Ok(None)
    }

    pub fn into_stream(mut self) -> impl Stream<Item = Result<StoredFile, StorageError>> {
        async_stream::try_stream! {
            while let Some(file) = self.next_entry().await? {
                yield file;
            }
        }
    }
}
