use std::time::Duration;

use bon::Builder;
use secrecy::SecretString;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} environment variable not set")]
    MissingEnv { var: &'static str },
}

/// Connection settings of the OpenAI-compatible chat client.
#[derive(Clone, Debug, Builder)]
pub struct ClientConfig {
    /// Provider API credential stored as a [`SecretString`].
    #[builder(into)]
    pub api_key: SecretString,
    /// Base URL of the OpenAI-compatible endpoint, without the `/v1` suffix.
    #[builder(default = DEFAULT_BASE_URL.to_string(), into)]
    pub base_url: String,
    /// Upper bound for one request, connection included.
    #[builder(default = Duration::from_secs(60))]
    pub timeout: Duration,
}

impl ClientConfig {
    /// Reads the key from `OPENAI_API_KEY` and, when set, the endpoint from
    /// `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| ConfigError::MissingEnv { var: API_KEY_ENV })?;
        let base_url = std::env::var(BASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self::builder().api_key(api_key).base_url(base_url).build())
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
