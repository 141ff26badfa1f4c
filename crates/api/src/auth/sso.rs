//! OAuth authorization-code exchanges for Microsoft sign-in and Dropbox.

use serde::Deserialize;
use serde_json::Value;

use crate::config::OAuthClient;

/// Errors from an OAuth provider round trip.
#[derive(Debug, thiserror::Error)]
pub enum SsoError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with an `error` field. `detail` is what the
    /// client sees in `errors`.
    #[error("{provider} rejected the authorization code")]
    Rejected { provider: &'static str, detail: Value },

    #[error("Unexpected {provider} response: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },
}

/// The `/me` fields used to match a local account.
#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftProfile {
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default, rename = "userPrincipalName")]
    pub user_principal_name: Option<String>,
}

impl MicrosoftProfile {
    /// `mail`, falling back to the principal name.
    pub fn email(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

async fn exchange_code(
    http: &reqwest::Client,
    provider: &'static str,
    token_url: &str,
    client: &OAuthClient,
    code: &str,
) -> Result<Value, SsoError> {
    let form = [
        ("client_id", client.client_id.as_str()),
        ("client_secret", client.client_secret.as_str()),
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", client.redirect_uri.as_str()),
    ];
    let body: Value = http.post(token_url).form(&form).send().await?.json().await?;

    if body.get("error").is_some() {
        tracing::warn!(provider, error = %body["error"], "Authorization code exchange rejected");
        return Err(SsoError::Rejected {
            provider,
            detail: body,
        });
    }
    Ok(body)
}

/// Trade a Microsoft authorization code for its access token.
pub async fn exchange_microsoft_code(
    http: &reqwest::Client,
    token_url: &str,
    client: &OAuthClient,
    code: &str,
) -> Result<String, SsoError> {
    let body = exchange_code(http, "Microsoft", token_url, client, code)
        .await
        .map_err(|e| match e {
            // Clients only get the description, not the whole token response.
            SsoError::Rejected { provider, detail } => SsoError::Rejected {
                provider,
                detail: detail
                    .get("error_description")
                    .cloned()
                    .unwrap_or(Value::Null),
            },
            other => other,
        })?;

    body.get("access_token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SsoError::Malformed {
            provider: "Microsoft",
            detail: "token response has no access_token".into(),
        })
}

pub async fn fetch_microsoft_profile(
    http: &reqwest::Client,
    graph_base: &str,
    access_token: &str,
) -> Result<MicrosoftProfile, SsoError> {
    let url = format!("{}/me", graph_base.trim_end_matches('/'));
    let response = http.get(url).bearer_auth(access_token).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SsoError::Malformed {
            provider: "Microsoft",
            detail: format!("profile request returned {status}"),
        });
    }
    Ok(response.json().await?)
}

/// Trade a Dropbox authorization code. The raw token response is returned
/// so the client can keep the refresh token and account id.
pub async fn exchange_dropbox_code(
    http: &reqwest::Client,
    token_url: &str,
    client: &OAuthClient,
    code: &str,
) -> Result<Value, SsoError> {
    exchange_code(http, "Dropbox", token_url, client, code).await
}
