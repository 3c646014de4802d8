use std::{error::Error as StdError, time::Duration};

/// Coarse classification of an [`InvokeError`].
///
/// Use [`InvokeError::kind`] to get this. There is no retry advice attached:
/// every kind is reported once, at the point of detection.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// No rule matches a type or one of its nested element types.
    TypeResolution,
    /// The shape of the call could not be extracted.
    Introspection,
    /// The chat collaborator failed or returned no usable answer.
    RemoteCall,
    /// The answer does not decode into the expected type.
    Decode,
    /// A target type has no usable constructor or field set.
    Configuration,
}

/// Failure of a single proxied method call.
///
/// Every variant names the method so that errors from several concurrent calls
/// stay attributable.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("cannot resolve a transcoding rule for `{method}`")]
    TypeResolution {
        method: String,
        #[source]
        source: TranscodeError,
    },

    #[error("cannot extract the call shape of `{method}`: {reason}")]
    Introspection { method: String, reason: String },

    /// The chat collaborator failed before returning a usable answer.
    #[error("LLM call for `{method}` failed")]
    Remote {
        method: String,
        #[source]
        source: ChatError,
    },

    /// The model answered, but the answer could not be decoded.
    ///
    /// `raw_response` holds the full answer text for debugging.
    #[error("failed to decode the answer for `{method}`")]
    Decode {
        method: String,
        raw_response: String,
        #[source]
        source: TranscodeError,
    },

    #[error("`{method}` uses a type that cannot be decoded")]
    Configuration {
        method: String,
        #[source]
        source: TranscodeError,
    },
}

impl InvokeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TypeResolution { .. } => ErrorKind::TypeResolution,
            Self::Introspection { .. } => ErrorKind::Introspection,
            Self::Remote { .. } => ErrorKind::RemoteCall,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    pub fn method(&self) -> &str {
        match self {
            Self::TypeResolution { method, .. }
            | Self::Introspection { method, .. }
            | Self::Remote { method, .. }
            | Self::Decode { method, .. }
            | Self::Configuration { method, .. } => method,
        }
    }

    /// Classifies a transcoding failure raised while building the prompt.
    pub(crate) fn while_preparing(method: &str, source: TranscodeError) -> Self {
        let method = method.to_string();
        match source {
            TranscodeError::TypeResolution { .. } => Self::TypeResolution { method, source },
            _ => Self::Configuration { method, source },
        }
    }

    /// Classifies a transcoding failure raised while decoding `raw_response`.
    pub(crate) fn while_decoding(method: &str, raw_response: &str, source: TranscodeError) -> Self {
        let method = method.to_string();
        match source {
            TranscodeError::TypeResolution { .. } => Self::TypeResolution { method, source },
            TranscodeError::Configuration { .. } => Self::Configuration { method, source },
            _ => Self::Decode {
                method,
                raw_response: raw_response.to_string(),
                source,
            },
        }
    }
}

/// Failure inside the rule engine: matching, encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("no rule matches `{type_name}`: {reason}")]
    TypeResolution { type_name: String, reason: String },

    #[error("`{type_name}` cannot be decoded: {reason}")]
    Configuration { type_name: String, reason: String },

    /// A value handed to `encode` does not have the shape its type promises.
    #[error("value `{value}` does not fit `{type_name}`")]
    ValueMismatch { type_name: String, value: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl TranscodeError {
    pub(crate) fn unresolved(type_name: impl ToString, reason: impl Into<String>) -> Self {
        Self::TypeResolution {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn configuration(type_name: impl ToString, reason: impl Into<String>) -> Self {
        Self::Configuration {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Text or a dynamic value does not satisfy the expected type.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("not valid JSON: {raw}")]
    InvalidJson {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected json array. actual: {raw}")]
    ExpectedArray { raw: String },

    #[error("expected json object. actual: {raw}")]
    ExpectedObject { raw: String },

    /// The text is not a literal of the scalar type (e.g. `"maybe"` for `bool`).
    #[error("`{raw}` is not a valid {expected}: {reason}")]
    InvalidLiteral {
        expected: &'static str,
        raw: String,
        reason: String,
    },

    #[error("no enum constant `{got}` for type `{enum_name}`")]
    UnknownVariant {
        enum_name: String,
        got: String,
        valid_variants: Vec<String>,
    },

    #[error("missing required field `{field}` in `{class}`")]
    MissingField { class: String, field: String },

    #[error("expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Expected one value variant, got another (e.g. expected String, got I32).
    #[error("expected {expected}, got {actual}")]
    UnexpectedValue {
        expected: &'static str,
        actual: String,
    },
}

impl DecodeError {
    pub(crate) fn literal(expected: &'static str, raw: &str, reason: impl ToString) -> Self {
        Self::InvalidLiteral {
            expected,
            raw: raw.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// The chat collaborator failed before returning a usable answer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Could not reach the provider endpoint (DNS, connection refused, etc.).
    #[error("could not reach {endpoint}")]
    Network {
        endpoint: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },

    /// The provider answered with a non-success HTTP status.
    #[error("invalid response from provider: HTTP {status}")]
    InvalidResponse { status: u16, body: String },

    /// The provider answered, but without any choice or text content.
    #[error("provider returned no answer content for model `{model}`")]
    EmptyResponse { model: String },

    #[error("provider error from {provider}: {message}")]
    Provider {
        provider: String,
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// The call was dropped before it completed.
    #[error("the call was cancelled before it completed")]
    Cancelled,
}
