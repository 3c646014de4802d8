use std::fmt;
use std::sync::Arc;

use enum_dispatch::enum_dispatch;

use super::Transcoder;
use super::scalar::ScalarRule;
use super::structural::{ArrayRule, EnumRule, ListRule, MapRule, ObjectRule, OptionalRule, SetRule};
use crate::core::{TranscodeError, Value};

/// A type-bound strategy for describing, encoding and decoding values.
///
/// Every operation receives the ambient [`Transcoder`] so that structural
/// rules can resolve the rules of their nested types.
#[enum_dispatch]
pub trait Rule {
    /// LLM-readable description of the text format this rule reads and writes.
    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError>;

    fn encode(&self, transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError>;

    fn decode(&self, transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError>;
}

/// A rule shared between threads, as registered by callers.
pub type SharedRule = Arc<dyn Rule + Send + Sync>;

#[enum_dispatch(Rule)]
#[derive(Debug, Clone)]
pub enum BuiltinRule {
    Scalar(ScalarRule),
    Array(ArrayRule),
    List(ListRule),
    Set(SetRule),
    Map(MapRule),
    Optional(OptionalRule),
    Enum(EnumRule),
    Object(ObjectRule),
}

/// Outcome of rule matching: a caller-supplied rule or a built-in one.
#[derive(Clone)]
pub enum MatchedRule {
    Custom(SharedRule),
    Builtin(BuiltinRule),
}

impl MatchedRule {
    pub fn is_custom(&self) -> bool {
        matches!(self, MatchedRule::Custom(_))
    }
}

impl Rule for MatchedRule {
    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError> {
        match self {
            MatchedRule::Custom(rule) => rule.describe(transcoder),
            MatchedRule::Builtin(rule) => rule.describe(transcoder),
        }
    }

    fn encode(&self, transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        match self {
            MatchedRule::Custom(rule) => rule.encode(transcoder, value),
            MatchedRule::Builtin(rule) => rule.encode(transcoder, value),
        }
    }

    fn decode(&self, transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        match self {
            MatchedRule::Custom(rule) => rule.decode(transcoder, text),
            MatchedRule::Builtin(rule) => rule.decode(transcoder, text),
        }
    }
}

impl fmt::Debug for MatchedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchedRule::Custom(_) => f.write_str("Custom(..)"),
            MatchedRule::Builtin(rule) => f.debug_tuple("Builtin").field(rule).finish(),
        }
    }
}
