//! Chat-completion client used for structured extraction.

use async_trait::async_trait;
use serde::Deserialize;

use crate::prompt::SYSTEM_MESSAGE;

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 2500;

/// Errors from the LLM endpoint.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response had no `choices[0].message.content`.
    #[error("LLM response contained no completion")]
    EmptyCompletion,
}

/// A chat model that answers one user prompt.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Raw text content of the first choice.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Clone)]
pub struct AzureOpenAiSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

/// Azure OpenAI chat completions deployment.
pub struct AzureOpenAiClient {
    client: reqwest::Client,
    settings: AzureOpenAiSettings,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl AzureOpenAiClient {
    pub fn new(client: reqwest::Client, settings: AzureOpenAiSettings) -> Self {
        Self { client, settings }
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.deployment,
            self.settings.api_version
        )
    }
}

#[async_trait]
impl ChatCompletion for AzureOpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "messages": [
                {"role": "system", "content": SYSTEM_MESSAGE},
                {"role": "user", "content": prompt},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(self.url())
            .header("api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;

    async fn completions(
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> axum::response::Response {
        if headers.get("api-key").and_then(|v| v.to_str().ok()) != Some("k") {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        assert_eq!(query.get("api-version").map(String::as_str), Some("2024-02-01"));
        assert_eq!(body["messages"][0]["content"], SYSTEM_MESSAGE);
        assert_eq!(body["max_tokens"], 2500);
        let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
        if prompt == "empty" {
            return Json(serde_json::json!({"choices": []})).into_response();
        }
        Json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": format!("echo: {prompt}")}}]
        }))
        .into_response()
    }

    async fn client(api_key: &str) -> AzureOpenAiClient {
        let app = Router::new().route(
            "/openai/deployments/gpt/chat/completions",
            post(completions),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        AzureOpenAiClient::new(
            reqwest::Client::new(),
            AzureOpenAiSettings {
                endpoint: format!("http://{addr}/"),
                api_key: api_key.into(),
                deployment: "gpt".into(),
                api_version: "2024-02-01".into(),
            },
        )
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let reply = client("k").await.complete("hello").await.unwrap();
        assert_eq!(reply, "echo: hello");
    }

    #[tokio::test]
    async fn rejected_key_surfaces_status() {
        assert_matches!(
            client("wrong").await.complete("hello").await,
            Err(LlmError::Api { status: 401, .. })
        );
    }

    #[tokio::test]
    async fn no_choices_is_an_error() {
        assert_matches!(
            client("k").await.complete("empty").await,
            Err(LlmError::EmptyCompletion)
        );
    }
}
