//! Type-directed text transcoding.
//!
//! A [`Transcoder`] maps a [`TypeDescriptor`] to a [`Rule`] and uses it to
//! describe, encode and decode values of that type. Caller-supplied
//! [`CustomRule`]s take precedence over the built-in rules.

mod custom;
mod duration;
mod rule;
mod scalar;
mod structural;

use std::fmt;
use std::sync::Arc;

pub use custom::CustomRule;
pub use rule::{BuiltinRule, MatchedRule, Rule, SharedRule};
pub use scalar::ScalarRule;
pub use structural::{
    ArrayRule, Element, EnumRule, ListRule, MapRule, ObjectRule, OptionalRule, SetRule,
};

use crate::core::{Encode, TranscodeError, Transcode, TypeDescriptor, TypeKind, Value};

/// Text of an absent value, in prompts and in answers.
pub const NULL_SENTINEL: &str = "NULL";

/// Rule registry and matcher.
///
/// The custom-rule list is frozen at construction; clones share it.
#[derive(Clone, Default)]
pub struct Transcoder {
    custom_rules: Arc<[CustomRule]>,
}

impl Transcoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom_rules(rules: impl IntoIterator<Item = CustomRule>) -> Self {
        Self {
            custom_rules: rules.into_iter().collect(),
        }
    }

    pub fn custom_rules(&self) -> &[CustomRule] {
        &self.custom_rules
    }

    /// Selects the rule for `descriptor`. First match wins:
    ///
    /// 1. a custom rule whose target equals the type;
    /// 2. a custom rule whose target is a supertype of the type;
    /// 3. the built-in rule of the type's kind.
    pub fn match_rule(&self, descriptor: &TypeDescriptor) -> Result<MatchedRule, TranscodeError> {
        if let Some(custom) = self
            .custom_rules
            .iter()
            .find(|custom| custom.target() == descriptor)
            .or_else(|| {
                self.custom_rules
                    .iter()
                    .find(|custom| descriptor.is_subtype_of(custom.target()))
            })
        {
            return Ok(MatchedRule::Custom(custom.rule().clone()));
        }

        let builtin: BuiltinRule = match descriptor.kind() {
            TypeKind::Scalar(kind) => ScalarRule::new(kind).into(),
            TypeKind::Array => ArrayRule::new(self.argument(descriptor, 0)?).into(),
            TypeKind::List => ListRule::new(self.argument(descriptor, 0)?).into(),
            TypeKind::Set => SetRule::new(self.argument(descriptor, 0)?).into(),
            TypeKind::Map => MapRule::new(
                self.argument(descriptor, 0)?,
                self.argument(descriptor, 1)?,
            )
            .into(),
            TypeKind::Optional => OptionalRule::new(self.argument(descriptor, 0)?).into(),
            TypeKind::Enum => match descriptor.enum_schema() {
                Some(schema) => EnumRule::new(schema.clone()).into(),
                None => {
                    return Err(TranscodeError::unresolved(descriptor, "enum has no variant table"));
                }
            },
            TypeKind::Object => match descriptor.object_schema() {
                Some(schema) => ObjectRule::new(schema.clone()).into(),
                None => {
                    return Err(TranscodeError::unresolved(descriptor, "object has no field table"));
                }
            },
            TypeKind::Opaque => {
                return Err(TranscodeError::unresolved(
                    descriptor,
                    "no built-in rule applies and no custom rule is registered",
                ));
            }
            TypeKind::Single | TypeKind::Stream | TypeKind::Continuation => {
                return Err(TranscodeError::unresolved(
                    descriptor,
                    "calling-convention wrappers are not values",
                ));
            }
        };
        Ok(MatchedRule::Builtin(builtin))
    }

    /// Resolves a nested type into an [`Element`].
    pub fn element(&self, descriptor: TypeDescriptor) -> Result<Element, TranscodeError> {
        let rule = self.match_rule(&descriptor)?;
        Ok(Element::new(descriptor, rule))
    }

    fn argument(&self, descriptor: &TypeDescriptor, index: usize) -> Result<Element, TranscodeError> {
        let argument = descriptor.argument(index).ok_or_else(|| {
            TranscodeError::unresolved(descriptor, format!("missing type argument #{index}"))
        })?;
        self.element(argument.clone())
            .map_err(|err| TranscodeError::unresolved(descriptor, err.to_string()))
    }

    pub fn describe(&self, descriptor: &TypeDescriptor) -> Result<String, TranscodeError> {
        self.match_rule(descriptor)?.describe(self)
    }

    /// Encodes `value` as prompt text. A null value renders [`NULL_SENTINEL`]
    /// without consulting any rule.
    pub fn encode_value(
        &self,
        descriptor: &TypeDescriptor,
        value: &Value,
    ) -> Result<String, TranscodeError> {
        match value {
            Value::Null => Ok(NULL_SENTINEL.to_string()),
            Value::String(text) if text == NULL_SENTINEL => {
                tracing::debug!(
                    type_name = %descriptor,
                    "string value equals the null sentinel and will read as NULL"
                );
                self.match_rule(descriptor)?.encode(self, value)
            }
            other => self.match_rule(descriptor)?.encode(self, other),
        }
    }

    pub fn decode_value(
        &self,
        descriptor: &TypeDescriptor,
        text: &str,
    ) -> Result<Value, TranscodeError> {
        self.match_rule(descriptor)?.decode(self, text)
    }

    pub fn encode<T: Encode + ?Sized>(&self, value: &T) -> Result<String, TranscodeError> {
        self.encode_value(&T::descriptor(), &value.to_value())
    }

    pub fn decode<T: Transcode>(&self, text: &str) -> Result<T, TranscodeError> {
        let value = self.decode_value(&T::descriptor(), text)?;
        Ok(T::from_value(value)?)
    }
}

impl fmt::Debug for Transcoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcoder")
            .field("custom_rules", &self.custom_rules)
            .finish()
    }
}
