//! Invocation dispatch.
//!
//! Every call goes through the same asynchronous core: build the prompt, send
//! one chat request, decode the answer. The calling conventions are thin
//! adapters over that core.

mod convention;

pub use convention::{Completion, Continuation, Deferred, ResponseStream};

use std::sync::{Arc, OnceLock};

use bon::Builder;
use futures::future::{self, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value as JsonValue;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tracing::{debug, trace, warn};

use crate::adapter::PromptBuilder;
use crate::client::{ChatClient, ChatRequest};
use crate::core::{
    ChatError, DecodeError, Encode, InvokeError, MethodDescriptor, MethodSignature,
    TranscodeError, Transcode, Value,
};
use crate::transcode::Transcoder;
use crate::utils::telemetry::truncate;

/// Model used when neither the method nor the factory names one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const LOG_PREVIEW_CHARS: usize = 2_000;

/// One intercepted call: the static signature and the argument values.
#[derive(Debug, Clone)]
pub struct Call {
    pub signature: MethodSignature,
    pub arguments: Vec<Value>,
}

impl Call {
    pub fn new(signature: MethodSignature) -> Self {
        Self {
            signature,
            arguments: Vec::new(),
        }
    }

    pub fn argument<T: Encode + ?Sized>(mut self, value: &T) -> Self {
        self.arguments.push(value.to_value());
        self
    }
}

/// The model's answer together with the call it belongs to.
struct Exchange {
    method: MethodDescriptor,
    answer: String,
}

impl Exchange {
    fn decode_failure(&self, source: TranscodeError) -> InvokeError {
        InvokeError::while_decoding(&self.method.name, &self.answer, source)
    }
}

/// Turns calls into prompts, prompts into chat requests, and answers into
/// typed values.
///
/// Cheap to clone: the client, the rule registry and the fallback runtime are
/// shared.
#[derive(Clone, Builder)]
pub struct Dispatcher {
    #[builder(into)]
    interface_name: Arc<str>,
    client: Arc<dyn ChatClient>,
    #[builder(default)]
    transcoder: Transcoder,
    #[builder(default = Arc::from(DEFAULT_MODEL), into)]
    default_model: Arc<str>,
    #[builder(skip)]
    runtime: Arc<OnceLock<FallbackRuntime>>,
}

/// Runtime owned by a dispatcher for calls made outside any Tokio runtime.
///
/// Shut down in the background on drop, so the last dispatcher clone may be
/// dropped from async code.
struct FallbackRuntime(Option<Runtime>);

impl Drop for FallbackRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl Dispatcher {
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Response format of `signature`, computed without any argument values.
    pub fn response_format(&self, signature: &MethodSignature) -> Result<String, InvokeError> {
        let method = MethodDescriptor::extract(signature, None)?;
        PromptBuilder::new(self.transcoder.clone())
            .response_format(&method.return_type)
            .map_err(|err| InvokeError::while_preparing(&method.name, err))
    }

    #[tracing::instrument(
        name = "interfaice.dispatch.request",
        level = "debug",
        skip(self, call),
        fields(interface = %self.interface_name, method = call.signature.name())
    )]
    async fn request(&self, call: Call) -> Result<Exchange, InvokeError> {
        let method = MethodDescriptor::extract(&call.signature, Some(call.arguments))?;
        let prompt = PromptBuilder::new(self.transcoder.clone())
            .build(&method, &self.interface_name, method.description.as_deref())
            .map_err(|err| InvokeError::while_preparing(&method.name, err))?;
        debug!(system = %prompt.system, user = %prompt.user, "built prompt");

        let model = method
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.to_string());
        let request = ChatRequest {
            model: model.clone(),
            messages: prompt.into_messages(),
        };

        let response = self
            .client
            .chat(request)
            .await
            .map_err(|source| InvokeError::Remote {
                method: method.name.clone(),
                source,
            })?;

        let answer = match response.answer() {
            Some(answer) if !answer.trim().is_empty() => answer.to_string(),
            _ => {
                return Err(InvokeError::Remote {
                    method: method.name.clone(),
                    source: ChatError::EmptyResponse { model },
                });
            }
        };
        trace!(answer = truncate(&answer, LOG_PREVIEW_CHARS), "received answer");

        Ok(Exchange { method, answer })
    }

    fn decode<T: Transcode>(&self, exchange: &Exchange) -> Result<T, InvokeError> {
        let response_type = exchange.method.return_type.response_type().ok_or_else(|| {
            InvokeError::Introspection {
                method: exchange.method.name.clone(),
                reason: "return type has no response form".to_string(),
            }
        })?;

        let decoded = self
            .transcoder
            .decode_value(&response_type, strip_code_fence(&exchange.answer))
            .and_then(|value| T::from_value(value).map_err(TranscodeError::from));

        decoded.map_err(|err| {
            warn!(method = %exchange.method.name, error = %err, "failed to decode answer");
            exchange.decode_failure(err)
        })
    }

    /// Asynchronous core of every convention.
    pub async fn invoke<T: Transcode>(&self, call: Call) -> Result<T, InvokeError> {
        let exchange = self.request(call).await?;
        self.decode(&exchange)
    }

    /// Blocking convention: waits for the answer on the calling thread.
    ///
    /// Inside a multi-threaded Tokio runtime the worker is handed over with
    /// `block_in_place`. Inside a current-thread runtime the call runs on a
    /// helper thread. Outside any runtime a dispatcher-owned runtime is used.
    pub fn invoke_blocking<T: Transcode + Send>(&self, call: Call) -> Result<T, InvokeError> {
        let method = call.signature.name().to_string();
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.invoke(call)))
            }
            Ok(_) => std::thread::scope(|scope| {
                let worker = scope.spawn(|| {
                    let runtime = self.runtime(&method)?;
                    runtime.block_on(self.invoke(call))
                });
                worker
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            }),
            Err(_) => self.runtime(&method)?.block_on(self.invoke(call)),
        }
    }

    /// Suspending convention: starts the call and returns at once. The
    /// outcome is delivered through `continuation`.
    pub fn suspend<T>(&self, call: Call, continuation: Continuation<T>)
    where
        T: Transcode + Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => match self.runtime(call.signature.name()) {
                Ok(runtime) => runtime.handle().clone(),
                Err(err) => return continuation.resume(Err(err)),
            },
        };
        let dispatcher = self.clone();
        handle.spawn(async move {
            let outcome = dispatcher.invoke::<T>(call).await;
            continuation.resume(outcome);
        });
    }

    /// Single-value async convention. The call starts when the returned
    /// future is first polled.
    pub fn invoke_single<T>(&self, call: Call) -> Deferred<T>
    where
        T: Transcode + Send + 'static,
    {
        let dispatcher = self.clone();
        Deferred::new(async move { dispatcher.invoke::<T>(call).await })
    }

    /// Multi-value convention. The answer is requested as a JSON array whose
    /// entries are decoded lazily, in order.
    pub fn invoke_stream<T>(&self, call: Call) -> ResponseStream<T>
    where
        T: Transcode + Send + 'static,
    {
        let dispatcher = self.clone();
        let elements = async move {
            match dispatcher.request(call).await {
                Ok(exchange) => dispatcher.elements::<T>(exchange),
                Err(err) => stream::once(future::ready(Err(err))).boxed(),
            }
        };
        ResponseStream::new(elements.flatten_stream())
    }

    fn elements<T>(&self, exchange: Exchange) -> BoxStream<'static, Result<T, InvokeError>>
    where
        T: Transcode + Send + 'static,
    {
        let failed = |err: InvokeError| -> BoxStream<'static, Result<T, InvokeError>> {
            stream::once(future::ready(Err(err))).boxed()
        };

        let Some(element_type) = exchange.method.return_type.argument(0).cloned() else {
            return failed(InvokeError::Introspection {
                method: exchange.method.name.clone(),
                reason: "stream return type has no element type".to_string(),
            });
        };
        let element = match self.transcoder.element(element_type) {
            Ok(element) => element,
            Err(err) => return failed(InvokeError::while_preparing(&exchange.method.name, err)),
        };

        let text = strip_code_fence(&exchange.answer);
        let nodes = match serde_json::from_str::<JsonValue>(text) {
            Ok(JsonValue::Array(nodes)) => nodes,
            Ok(_) => {
                let err = DecodeError::ExpectedArray {
                    raw: text.to_string(),
                };
                return failed(exchange.decode_failure(err.into()));
            }
            Err(source) => {
                let err = DecodeError::InvalidJson {
                    raw: text.to_string(),
                    source,
                };
                return failed(exchange.decode_failure(err.into()));
            }
        };

        let transcoder = self.transcoder.clone();
        stream::iter(nodes)
            .map(move |node| {
                element
                    .decode_node(&transcoder, &node)
                    .and_then(|value| T::from_value(value).map_err(TranscodeError::from))
                    .map_err(|err| exchange.decode_failure(err))
            })
            .boxed()
    }

    fn runtime(&self, method: &str) -> Result<&Runtime, InvokeError> {
        let runtime_error = |message: &str, source: Option<std::io::Error>| InvokeError::Remote {
            method: method.to_string(),
            source: ChatError::Provider {
                provider: "tokio".to_string(),
                message: message.to_string(),
                source: source.map(|err| Box::new(err) as _),
            },
        };

        let fallback = match self.runtime.get() {
            Some(fallback) => fallback,
            None => {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .thread_name("interfaice-dispatch")
                    .build()
                    .map_err(|err| runtime_error("failed to start the dispatcher runtime", Some(err)))?;
                self.runtime
                    .get_or_init(|| FallbackRuntime(Some(runtime)))
            }
        };
        fallback
            .0
            .as_ref()
            .ok_or_else(|| runtime_error("the dispatcher runtime is shut down", None))
    }
}

/// Trims the answer and removes a Markdown code fence around it.
fn strip_code_fence(answer: &str) -> &str {
    let trimmed = answer.trim();
    let Some(body) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = match body.split_once('\n') {
        Some((_, rest)) => rest,
        None => body,
    };
    body.trim()
}
