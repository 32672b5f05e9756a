//! Domain store: the library document and its single-writer transaction boundary

pub mod books;
pub mod classes;
pub mod history;
pub mod loans;
pub mod people;
pub mod store;

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{error::AppResult, models::LibraryDocument};

pub use store::{DocumentStore, JsonFileStore, MemoryStore};

/// Main repository: the document store behind a process-wide writer lock
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    lock: Arc<Mutex<()>>,
}

impl Repository {
    /// Create a new repository over the given store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load the document for mutation. Other writers wait until the
    /// transaction is committed or dropped.
    pub async fn begin(&self) -> AppResult<Transaction> {
        let guard = self.lock.clone().lock_owned().await;
        let document = self.store.load().await?;
        Ok(Transaction {
            _guard: guard,
            store: self.store.clone(),
            document,
        })
    }

    /// Read-only copy of the last committed document. Does not wait for an
    /// open transaction; stores replace the document atomically on save.
    pub async fn snapshot(&self) -> AppResult<LibraryDocument> {
        self.store.load().await
    }
}

/// Load-mutate-save critical section.
///
/// Nothing is persisted unless [`Transaction::commit`] is called; dropping the
/// transaction discards every change.
pub struct Transaction {
    _guard: OwnedMutexGuard<()>,
    store: Arc<dyn DocumentStore>,
    document: LibraryDocument,
}

impl Transaction {
    pub fn doc(&self) -> &LibraryDocument {
        &self.document
    }

    pub fn doc_mut(&mut self) -> &mut LibraryDocument {
        &mut self.document
    }

    /// Persist the whole document and release the writer lock
    pub async fn commit(self) -> AppResult<LibraryDocument> {
        self.store.save(&self.document).await?;
        Ok(self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Folder;
    use std::time::Duration;

    fn folder(id: &str) -> Folder {
        Folder {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            color: String::new(),
            exam_list: false,
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_persists_nothing() {
        let store = Arc::new(MemoryStore::default());
        let repository = Repository::new(store.clone());

        {
            let mut tx = repository.begin().await.unwrap();
            tx.doc_mut().folders.push(folder("a"));
        }

        assert!(repository.snapshot().await.unwrap().folders.is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_does_not_wait_for_open_transaction() {
        let store = Arc::new(MemoryStore::default());
        let repository = Repository::new(store.clone());

        let mut tx = repository.begin().await.unwrap();
        tx.doc_mut().folders.push(folder("pending"));

        let read = tokio::time::timeout(Duration::from_millis(200), repository.snapshot())
            .await
            .expect("snapshot blocked behind the writer")
            .unwrap();
        assert!(read.folders.is_empty());

        tx.commit().await.unwrap();
        assert_eq!(repository.snapshot().await.unwrap().folders.len(), 1);
    }

    #[tokio::test]
    async fn test_transactions_are_serialized() {
        let store = Arc::new(MemoryStore::default());
        let repository = Repository::new(store.clone());

        let mut handles = Vec::new();
        for i in 0..20 {
            let repository = repository.clone();
            handles.push(tokio::spawn(async move {
                let mut tx = repository.begin().await.unwrap();
                tokio::task::yield_now().await;
                tx.doc_mut().folders.push(folder(&i.to_string()));
                tx.commit().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.current().folders.len(), 20);
        assert_eq!(store.save_count(), 20);
    }
}
