use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;

use super::{retrying_client, GenerationRequest, Generator};

pub struct AnthropicClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AnthropicError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("Response error: {0}")]
    Response(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Response contained no text content")]
    EmptyResponse,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<String>,
}

impl AnthropicClient {
    pub const DEFAULT_MODEL: &'static str = "claude-sonnet-4-20250514";
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: retrying_client(3),
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub async fn send_messages_request(
        &self,
        model_name: &str,
        max_tokens: u32,
        user_content: &str,
    ) -> Result<MessagesResponse, AnthropicError> {
        let body = serde_json::json!({
            "model": model_name,
            "max_tokens": max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": user_content
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&body)?)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(AnthropicError::Api { status, message });
        }

        Ok(resp.json::<MessagesResponse>().await?)
    }
}

impl Generator for AnthropicClient {
    type Error = AnthropicError;

    #[tracing::instrument(skip_all, fields(model = tracing::field::Empty, max_tokens = request.max_tokens))]
    async fn generate(&self, request: GenerationRequest) -> Result<String, Self::Error> {
        let model = request.model.as_deref().unwrap_or(Self::DEFAULT_MODEL);
        tracing::Span::current().record("model", model);

        let response = self
            .send_messages_request(model, request.max_tokens, &request.prompt)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to generate content"))?;

        let text = response
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<String>();

        if text.trim().is_empty() {
            return Err(AnthropicError::EmptyResponse);
        }

        tracing::info!(chars = text.len(), stop_reason = ?response.stop_reason, "Response received");

        Ok(text)
    }
}
