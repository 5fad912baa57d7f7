use crate::keys::{generate_report_key, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process storage backend.
///
/// Used by tests and by development setups with `STORAGE_BACKEND=memory`.
/// Contents are lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.files.read().await.keys().cloned().collect()
    }

    fn check_key(storage_key: &str) -> StorageResult<()> {
        if !validate_key(storage_key) {
            return Err(StorageError::InvalidKey(storage_key.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn upload(
        &self,
        entity_id: i64,
        filename: &str,
        _content_type: &str,
        data: Bytes,
    ) -> StorageResult<String> {
        let key = generate_report_key(entity_id, filename);
        self.files.write().await.insert(key.clone(), data);
        Ok(key)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        Self::check_key(storage_key)?;
        self.files
            .read()
            .await
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        Self::check_key(storage_key)?;
        self.files.write().await.remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Self::check_key(storage_key)?;
        Ok(self.files.read().await.contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
