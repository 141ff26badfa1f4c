//! SharePoint file source via Microsoft Graph.

use serde::Deserialize;

use crate::error::SourceError;

const PROVIDER: &str = "Microsoft Graph";

pub const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// The fields of a `driveItem` this source looks at.
#[derive(Debug, Deserialize)]
struct DriveItem {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    folder: Option<serde_json::Value>,
}

pub struct SharePointSource {
    client: reqwest::Client,
    graph_base: String,
}

impl SharePointSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_GRAPH_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, graph_base: &str) -> Self {
        Self {
            client,
            graph_base: graph_base.trim_end_matches('/').to_string(),
        }
    }

    /// Download a drive item of `site_id`. Folders are rejected before any
    /// content is fetched. Returns the bytes and the item name.
    pub async fn download(
        &self,
        access_token: &str,
        site_id: &str,
        item_id: &str,
    ) -> Result<(Vec<u8>, String), SourceError> {
        let item_url = format!("{}/sites/{site_id}/drive/items/{item_id}", self.graph_base);

        let response = self
            .client
            .get(&item_url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let item: DriveItem = ensure_success(response).await?.json().await?;
        if item.folder.is_some() {
            return Err(SourceError::IsFolder);
        }
        let name = item.name.unwrap_or_else(|| "unknown_file".to_string());

        let response = self
            .client
            .get(format!("{item_url}/content"))
            .bearer_auth(access_token)
            .send()
            .await?;
        let bytes = ensure_success(response).await?.bytes().await?.to_vec();

        tracing::debug!(site_id, item_id, size = bytes.len(), "Downloaded file from SharePoint");
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
        tracing::error!(status = status.as_u16(), %body, "Microsoft Graph request failed");
        return Err(SourceError::Api {
            provider: PROVIDER,
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
