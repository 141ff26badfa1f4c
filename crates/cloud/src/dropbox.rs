//! Dropbox file source (API v2, bearer token auth).

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::naming::file_name_from_path;

const PROVIDER: &str = "Dropbox";

pub const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com";
pub const DEFAULT_CONTENT_BASE: &str = "https://content.dropboxapi.com";

/// One entry of a folder listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropboxEntry {
    /// `file`, `folder` or `deleted`.
    #[serde(rename = ".tag")]
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path_display: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

impl DropboxEntry {
    pub fn is_file(&self) -> bool {
        self.tag == "file"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderListing {
    pub entries: Vec<DropboxEntry>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// Subset of the `Dropbox-API-Result` header returned with a download.
#[derive(Debug, Deserialize)]
struct DownloadMetadata {
    name: String,
}

pub struct DropboxSource {
    client: reqwest::Client,
    api_base: String,
    content_base: String,
}

impl DropboxSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_urls(client, DEFAULT_API_BASE, DEFAULT_CONTENT_BASE)
    }

    /// Point at alternative hosts (used by tests).
    pub fn with_base_urls(client: reqwest::Client, api_base: &str, content_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            content_base: content_base.trim_end_matches('/').to_string(),
        }
    }

    /// Non-recursive listing of `path` (`""` is the root).
    pub async fn list_folder(
        &self,
        access_token: &str,
        path: &str,
    ) -> Result<FolderListing, SourceError> {
        let response = self
            .client
            .post(format!("{}/2/files/list_folder", self.api_base))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "path": path, "recursive": false }))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<FolderListing>().await?)
    }

    /// Download the file at `path`. Returns its bytes and file name.
    pub async fn download(
        &self,
        access_token: &str,
        path: &str,
    ) -> Result<(Vec<u8>, String), SourceError> {
        let arg = serde_json::json!({ "path": path }).to_string();
        let response = self
            .client
            .post(format!("{}/2/files/download", self.content_base))
            .bearer_auth(access_token)
            .header("Dropbox-API-Arg", arg)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let name = response
            .headers()
            .get("Dropbox-API-Result")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| serde_json::from_str::<DownloadMetadata>(v).ok())
            .map(|m| m.name)
            .unwrap_or_else(|| file_name_from_path(path).to_string());

        let bytes = response.bytes().await?.to_vec();
        tracing::debug!(path, size = bytes.len(), "Downloaded file from Dropbox");
        Ok((bytes, name))
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(SourceError::InvalidToken { provider: PROVIDER });
    }
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        tracing::error!(status = status.as_u16(), %body, "Dropbox API error");
        return Err(SourceError::Api {
            provider: PROVIDER,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
