//! Proxy construction.

use std::fmt;
use std::sync::Arc;

use bon::Builder;
use secrecy::SecretString;

use crate::client::{ChatClient, ClientConfig, OpenAiClient};
use crate::core::ChatError;
use crate::dispatch::{DEFAULT_MODEL, Dispatcher};
use crate::transcode::{CustomRule, Transcoder};

/// A trait whose implementation is delegated to a model.
///
/// Implemented by the `<Trait>Proxy` type that `#[ai_interface]` generates.
pub trait AiInterface: Sized {
    /// Interface name shown to the model.
    const NAME: &'static str;

    fn from_dispatcher(dispatcher: Dispatcher) -> Self;
}

/// Creates proxies that answer every call through one chat client.
///
/// Custom rules are frozen into each proxy when it is created; rules added
/// afterwards only affect proxies created later.
///
/// ```no_run
/// # use interfaice::{ProxyFactory, ai_interface};
/// #[ai_interface]
/// trait Geography {
///     fn capital(&self, country: String) -> Result<String, interfaice::InvokeError>;
/// }
///
/// let factory = ProxyFactory::from_env()?;
/// let geography: GeographyProxy = factory.create();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Builder)]
pub struct ProxyFactory {
    client: Arc<dyn ChatClient>,
    #[builder(default)]
    custom_rules: Vec<CustomRule>,
    #[builder(default = DEFAULT_MODEL.to_string(), into)]
    default_model: String,
}

impl ProxyFactory {
    /// Factory backed by the OpenAI chat completions API.
    pub fn of(api_key: impl Into<SecretString>) -> Result<Self, ChatError> {
        Self::of_with_rules(api_key, [])
    }

    pub fn of_with_rules(
        api_key: impl Into<SecretString>,
        custom_rules: impl IntoIterator<Item = CustomRule>,
    ) -> Result<Self, ChatError> {
        let config = ClientConfig::builder().api_key(api_key).build();
        Self::with_config(config, custom_rules)
    }

    /// Factory configured from `OPENAI_API_KEY` and `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, ChatError> {
        let config = ClientConfig::from_env().map_err(|err| ChatError::Provider {
            provider: "openai".to_string(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        })?;
        Self::with_config(config, [])
    }

    fn with_config(
        config: ClientConfig,
        custom_rules: impl IntoIterator<Item = CustomRule>,
    ) -> Result<Self, ChatError> {
        let client = OpenAiClient::new(config)?;
        Ok(Self::builder()
            .client(Arc::new(client))
            .custom_rules(custom_rules.into_iter().collect())
            .build())
    }

    /// Appends rules after the existing ones; earlier rules win ties.
    pub fn add_custom_rules(&mut self, rules: impl IntoIterator<Item = CustomRule>) -> &mut Self {
        self.custom_rules.extend(rules);
        self
    }

    pub fn custom_rules(&self) -> &[CustomRule] {
        &self.custom_rules
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Dispatcher for an interface named `interface_name`, with the current
    /// rule set.
    pub fn dispatcher(&self, interface_name: &str) -> Dispatcher {
        Dispatcher::builder()
            .interface_name(interface_name)
            .client(Arc::clone(&self.client))
            .transcoder(Transcoder::with_custom_rules(self.custom_rules.iter().cloned()))
            .default_model(self.default_model.as_str())
            .build()
    }

    pub fn create<I: AiInterface>(&self) -> I {
        tracing::debug!(
            interface = I::NAME,
            custom_rules = self.custom_rules.len(),
            "creating proxy"
        );
        I::from_dispatcher(self.dispatcher(I::NAME))
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("custom_rules", &self.custom_rules)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}
