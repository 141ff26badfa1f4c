//! The [`ObjectStore`] seam the API and pipeline upload through.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;

/// Default lifetime of a presigned read URL.
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

/// Where uploaded documents are persisted.
///
/// Objects are addressed by the URL returned from [`upload`](Self::upload);
/// callers store that URL and hand it back for reads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs (`s3`, `azure`, `memory`).
    fn name(&self) -> &'static str;

    /// Store `bytes` under `project` and return the object URL.
    async fn upload(
        &self,
        project: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError>;

    /// Fetch the object behind a URL previously returned by `upload`.
    async fn download(&self, object_url: &str) -> Result<Vec<u8>, StorageError>;

    /// Time-limited URL a browser can open directly.
    async fn presigned_url(
        &self,
        object_url: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
}
