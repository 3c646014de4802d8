use async_trait::async_trait;
use secrecy::ExposeSecret;

use super::{ChatClient, ChatRequest, ChatResponse, ClientConfig};
use crate::core::ChatError;

const PROVIDER: &str = "openai";

/// Chat client for OpenAI-compatible `/v1/chat/completions` endpoints.
///
/// Clones share the same connection pool.
#[derive(Clone, Debug)]
pub struct OpenAiClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ChatError::Provider {
                provider: PROVIDER.to_string(),
                message: "failed to build the HTTP client".to_string(),
                source: Some(Box::new(err)),
            })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let endpoint = self.config.completions_url();
        tracing::debug!(endpoint = %endpoint, model = %request.model, "sending chat request");

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|err| self.transport_error(&endpoint, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "chat request rejected");
            return Err(ChatError::InvalidResponse {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ChatError::Timeout {
                        after: self.config.timeout,
                    }
                } else {
                    ChatError::Provider {
                        provider: PROVIDER.to_string(),
                        message: "response body is not a chat completion".to_string(),
                        source: Some(Box::new(err)),
                    }
                }
            })
    }
}

impl OpenAiClient {
    fn transport_error(&self, endpoint: &str, err: reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::Timeout {
                after: self.config.timeout,
            }
        } else {
            ChatError::Network {
                endpoint: endpoint.to_string(),
                source: Box::new(err),
            }
        }
    }
}
