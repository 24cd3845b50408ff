use crate::models::StoredFile;
use crate::services::storage::{LocalStorage, StorageError};
use futures::TryStreamExt;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs;

/// Listing, rename and delete over the storage root.
///
/// Every name passes the storage validation boundary before a filesystem call is made.
/// Concurrent operations on the same name are not serialized: the last writer wins.
pub struct FileService {
    storage: Arc<LocalStorage>,
}

impl FileService {
    pub fn new(storage: Arc<LocalStorage>) -> Self {
        Self { storage }
    }

    pub async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        self.storage
            .list_entries()
            .await?
            .into_stream()
            .try_collect()
            .await
    }

    pub async fn delete(&self, filename: &str) -> Result<(), StorageError> {
        let path = self.storage.path_for(filename)?;
        // Only regular files are addressable entries.
        self.storage.stat(filename).await?;

        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(filename.to_string()),
            _ => StorageError::Io(e),
        })?;

        tracing::info!("🗑️  Deleted {}", filename);
        Ok(())
    }

    /// Renames within the storage root. Refuses to replace an existing entry.
    pub async fn rename(&self, filename: &str, new_name: &str) -> Result<StoredFile, StorageError> {
        let from = self.storage.path_for(filename)?;
        let to = self.storage.path_for(new_name)?;

        let source = self.storage.stat(filename).await?;
        if filename == new_name {
            return Ok(source);
        }

        if fs::try_exists(&to).await? {
            tracing::warn!("Rename {} -> {} refused: target exists", filename, new_name);
            return Err(StorageError::Conflict(new_name.to_string()));
        }

        fs::rename(&from, &to).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(filename.to_string()),
            _ => StorageError::Io(e),
        })?;

        tracing::info!("✏️  Renamed {} -> {}", filename, new_name);
        Ok(StoredFile {
            name: new_name.to_string(),
            size: source.size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::naming::CounterNaming;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, Arc<LocalStorage>, FileService) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(
            dir.path().join("uploads"),
            Arc::new(CounterNaming::new()),
        ));
        storage.ensure_directory().await.unwrap();
        let service = FileService::new(storage.clone());
        (dir, storage, service)
    }

    fn names(files: &[StoredFile]) -> Vec<&str> {
        let mut names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let (_dir, storage, service) = setup().await;
        std::fs::write(storage.root().join("a.txt"), b"a").unwrap();
        std::fs::write(storage.root().join("b.txt"), b"b").unwrap();

        service.delete("a.txt").await.unwrap();
        assert_eq!(names(&service.list().await.unwrap()), vec!["b.txt"]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (_dir, _storage, service) = setup().await;
        assert!(matches!(
            service.delete("ghost.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_traversal_touches_nothing() {
        let (dir, _storage, service) = setup().await;
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"keep").unwrap();

        for name in ["../keep.txt", "/tmp/keep.txt", ".."] {
            assert!(matches!(
                service.delete(name).await,
                Err(StorageError::InvalidName(_))
            ));
        }
        assert!(outside.exists());
    }

    #[tokio::test]
    async fn test_rename_moves_content() {
        let (_dir, storage, service) = setup().await;
        std::fs::write(storage.root().join("photo-123.png"), b"pixels").unwrap();

        let renamed = service.rename("photo-123.png", "vacation.png").await.unwrap();
        assert_eq!(renamed.size, 6);
        assert_eq!(
            std::fs::read(storage.root().join("vacation.png")).unwrap(),
            b"pixels"
        );
        assert!(!storage.root().join("photo-123.png").exists());
    }

    #[tokio::test]
    async fn test_rename_conflict_leaves_both_untouched() {
        let (_dir, storage, service) = setup().await;
        std::fs::write(storage.root().join("photo-123.png"), b"new").unwrap();
        std::fs::write(storage.root().join("vacation.png"), b"old").unwrap();

        let err = service
            .rename("photo-123.png", "vacation.png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert_eq!(
            std::fs::read(storage.root().join("photo-123.png")).unwrap(),
            b"new"
        );
        assert_eq!(
            std::fs::read(storage.root().join("vacation.png")).unwrap(),
            b"old"
        );
    }

    #[tokio::test]
    async fn test_rename_rejects_escaping_names() {
        let (dir, storage, service) = setup().await;
        std::fs::write(storage.root().join("a.txt"), b"a").unwrap();

        assert!(matches!(
            service.rename("a.txt", "../escaped.txt").await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            service.rename("../a.txt", "b.txt").await,
            Err(StorageError::InvalidName(_))
        ));
        assert!(storage.root().join("a.txt").exists());
        assert!(!dir.path().join("escaped.txt").exists());
    }

    #[tokio::test]
    async fn test_rename_missing_source() {
        let (_dir, _storage, service) = setup().await;
        assert!(matches!(
            service.rename("nope.txt", "yes.txt").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
