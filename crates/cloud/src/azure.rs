//! Azure Blob Storage backend using shared access signature (SAS) auth.
//!
//! Blobs are written with a plain `PUT` against the Blob service REST API so
//! no Azure SDK is needed. The returned URL carries no credentials; the SAS
//! token is appended only for reads.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::naming::unique_filename;
use crate::store::ObjectStore;

#[derive(Debug, Clone)]
pub struct AzureSettings {
    /// e.g. `https://account.blob.core.windows.net`
    pub account_url: String,
    pub container: String,
    /// SAS query string, with or without the leading `?`.
    pub sas_token: String,
}

pub struct AzureBlobStore {
    client: reqwest::Client,
    container_url: String,
    sas_token: String,
}

impl AzureBlobStore {
    pub fn new(settings: &AzureSettings) -> Self {
        Self::with_client(reqwest::Client::new(), settings)
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, settings: &AzureSettings) -> Self {
        Self {
            client,
            container_url: format!(
                "{}/{}",
                settings.account_url.trim_end_matches('/'),
                settings.container.trim_matches('/')
            ),
            sas_token: settings.sas_token.trim_start_matches('?').to_string(),
        }
    }

    /// Public URL of a blob inside the container.
    pub fn blob_url(&self, blob_name: &str) -> String {
        let encoded: Vec<_> = blob_name.split('/').map(urlencoding::encode).collect();
        format!("{}/{}", self.container_url, encoded.join("/"))
    }

    fn signed(&self, object_url: &str) -> Result<String, StorageError> {
        if !object_url.starts_with(&self.container_url) {
            return Err(StorageError::InvalidUrl(object_url.to_string()));
        }
        Ok(format!("{object_url}?{}", self.sas_token))
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StorageError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    if file_name.to_ascii_lowercase().ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    fn name(&self) -> &'static str {
        "azure"
    }

    async fn upload(
        &self,
        project: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        let blob_name = format!(
            "{project}/{}",
            unique_filename(file_name, chrono::Utc::now().naive_utc())
        );
        let url = self.blob_url(&blob_name);
        let size = bytes.len();

        let response = self
            .client
            .put(self.signed(&url)?)
            .header("x-ms-blob-type", "BlockBlob")
            .header(reqwest::header::CONTENT_TYPE, content_type_for(file_name))
            .body(bytes)
            .send()
            .await?;
        Self::ensure_success(response).await?;

        tracing::info!(blob = %blob_name, size, "Uploaded blob to Azure");
        Ok(url)
    }

    async fn download(&self, object_url: &str) -> Result<Vec<u8>, StorageError> {
        let response = self.client.get(self.signed(object_url)?).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(object_url.to_string()));
        }
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// The SAS token carries its own expiry, so `expires_in` is not applied.
    async fn presigned_url(
        &self,
        object_url: &str,
        _expires_in: Duration,
    ) -> Result<String, StorageError> {
        self.signed(object_url)
    }
}
