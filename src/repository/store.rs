//! Whole-document persistence

use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use crate::{error::AppResult, models::LibraryDocument};

/// Whole-document read/write; there are no partial updates
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load(&self) -> AppResult<LibraryDocument>;
    async fn save(&self, document: &LibraryDocument) -> AppResult<()>;
}

/// JSON file on local disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load(&self) -> AppResult<LibraryDocument> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(LibraryDocument::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No library document at {}, starting empty", self.path.display());
                Ok(LibraryDocument::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, document: &LibraryDocument) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(document)?;

        // Write next to the target and rename so readers never see a torn file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::debug!("Saved library document ({} bytes) to {}", json.len(), self.path.display());
        Ok(())
    }
}

/// In-process store, used by tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<LibraryDocument>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new(document: LibraryDocument) -> Self {
        Self {
            document: Mutex::new(document),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> LibraryDocument {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self) -> AppResult<LibraryDocument> {
        Ok(self.current())
    }

    async fn save(&self, document: &LibraryDocument) -> AppResult<()> {
        *self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = document.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Folder;

    #[tokio::test]
    async fn test_missing_file_loads_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load().await.unwrap(), LibraryDocument::default());
    }

    #[tokio::test]
    async fn test_save_then_load_returns_same_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/library.json"));

        let mut document = LibraryDocument::default();
        document.folders.push(Folder {
            id: "f1".to_string(),
            name: "Leesboeken".to_string(),
            description: String::new(),
            color: "#ffcc00".to_string(),
            exam_list: true,
        });
        store.save(&document).await.unwrap();

        assert_eq!(store.load().await.unwrap(), document);
        assert!(!dir.path().join("nested/library.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, crate::error::AppError::Storage(_)));
    }
}
