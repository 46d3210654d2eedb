use std::future::Future;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

pub mod anthropic;
pub mod openai;
pub mod prompts;

use anthropic::{AnthropicClient, AnthropicError};
use openai::{OpenAIClient, OpenAIError};

use crate::{
    config::{Provider, Secrets},
    error::Error,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Falls back to the client's default model when unset
    pub model: Option<String>,
    pub max_tokens: u32,
}

/// A generative model: one prompt in, one response string out
pub trait Generator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn generate(
        &self,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

impl<T: Generator + Send + Sync> Generator for &T {
    type Error = T::Error;

    async fn generate(&self, request: GenerationRequest) -> Result<String, Self::Error> {
        (**self).generate(request).await
    }
}

/// HTTP client that retries transient failures with exponential backoff
pub(crate) fn retrying_client(max_retries: u32) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    ClientBuilder::new(reqwest::Client::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error(transparent)]
    Anthropic(#[from] AnthropicError),
    #[error(transparent)]
    OpenAI(#[from] OpenAIError),
}

/// Provider chosen by configuration
pub enum LlmClient {
    Anthropic(AnthropicClient),
    OpenAI(OpenAIClient),
}

impl LlmClient {
    /// Client for the configured provider; its API key must be set
    pub fn from_secrets(provider: Provider, secrets: &Secrets) -> Result<Self, Error> {
        let key = |value: &Option<String>, name: &str| {
            value
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| Error::Config(format!("{name} not set")))
        };

        Ok(match provider {
            Provider::Anthropic => LlmClient::Anthropic(AnthropicClient::new(key(
                &secrets.anthropic_api_key,
                "ANTHROPIC_API_KEY",
            )?)),
            Provider::OpenAi => {
                LlmClient::OpenAI(OpenAIClient::new(key(&secrets.openai_api_key, "OPENAI_API_KEY")?))
            }
        })
    }
}

impl Generator for LlmClient {
    type Error = LlmError;

    async fn generate(&self, request: GenerationRequest) -> Result<String, Self::Error> {
        match self {
            LlmClient::Anthropic(client) => Ok(client.generate(request).await?),
            LlmClient::OpenAI(client) => Ok(client.generate(request).await?),
        }
    }
}
