//! Process-local [`ObjectStore`] for development setups without a cloud
//! account, and for tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::naming::new_object_key;
use crate::store::ObjectStore;

const SCHEME: &str = "memory://";

#[derive(Default)]
pub struct InMemoryStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Seed an object directly, returning its URL.
    pub async fn insert(&self, key: &str, bytes: Vec<u8>) -> String {
        self.objects.write().await.insert(key.to_string(), bytes);
        format!("{SCHEME}{key}")
    }

    fn key_of(object_url: &str) -> Result<&str, StorageError> {
        object_url
            .strip_prefix(SCHEME)
            .map(|rest| rest.split('?').next().unwrap_or(rest))
            .ok_or_else(|| StorageError::InvalidUrl(object_url.to_string()))
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upload(
        &self,
        project: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let key = new_object_key(project, file_name);
        Ok(self.insert(&key, bytes).await)
    }

    async fn download(&self, object_url: &str) -> Result<Vec<u8>, StorageError> {
        let key = Self::key_of(object_url)?;
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn presigned_url(
        &self,
        object_url: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let key = Self::key_of(object_url)?;
        Ok(format!("{SCHEME}{key}?expires={}", expires_in.as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn upload_then_download() {
        let store = InMemoryStore::new();
        let url = store.upload("acme", "fax.pdf", b"%PDF".to_vec()).await.unwrap();
        assert!(url.starts_with("memory://acme/acme-"));
        assert!(url.ends_with("/fax.pdf"));
        assert_eq!(store.download(&url).await.unwrap(), b"%PDF");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn repeated_uploads_of_one_name_do_not_overwrite() {
        let store = InMemoryStore::new();
        let first = store.upload("acme", "fax.pdf", b"FIRST".to_vec()).await.unwrap();
        let second = store.upload("acme", "fax.pdf", b"SECOND".to_vec()).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.download(&first).await.unwrap(), b"FIRST");
        assert_eq!(store.download(&second).await.unwrap(), b"SECOND");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let store = InMemoryStore::new();
        assert_matches!(
            store.download("memory://acme/none.pdf").await,
            Err(StorageError::NotFound(_))
        );
        assert_matches!(
            store.download("https://elsewhere/none.pdf").await,
            Err(StorageError::InvalidUrl(_))
        );
    }
}
