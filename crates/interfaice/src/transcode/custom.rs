use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{Rule, SharedRule, Transcoder};
use crate::core::{DecodeError, Describe, TranscodeError, Transcode, TypeDescriptor, Value};

/// A caller-supplied rule that overrides built-in resolution for one target
/// type and, through supertype matching, for its subtypes.
#[derive(Clone)]
pub struct CustomRule {
    target: TypeDescriptor,
    rule: SharedRule,
}

impl CustomRule {
    pub fn new<R>(target: TypeDescriptor, rule: R) -> Self
    where
        R: Rule + Send + Sync + 'static,
    {
        Self {
            target,
            rule: Arc::new(rule),
        }
    }

    /// A rule targeting the descriptor of `T`.
    pub fn of<T, R>(rule: R) -> Self
    where
        T: Describe + ?Sized,
        R: Rule + Send + Sync + 'static,
    {
        Self::new(T::descriptor(), rule)
    }

    /// Builds a rule for `T` from a description and a pair of typed
    /// functions, without implementing [`Rule`] by hand.
    pub fn typed<T, E, D>(description: impl Into<Cow<'static, str>>, encode: E, decode: D) -> Self
    where
        T: Transcode + 'static,
        E: Fn(&T) -> String + Send + Sync + 'static,
        D: Fn(&str) -> Result<T, DecodeError> + Send + Sync + 'static,
    {
        Self::new(
            T::descriptor(),
            TypedRule {
                description: description.into(),
                encode,
                decode,
                marker: PhantomData,
            },
        )
    }

    pub fn target(&self) -> &TypeDescriptor {
        &self.target
    }

    pub fn rule(&self) -> &SharedRule {
        &self.rule
    }
}

impl fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomRule")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

struct TypedRule<T, E, D> {
    description: Cow<'static, str>,
    encode: E,
    decode: D,
    marker: PhantomData<fn() -> T>,
}

impl<T, E, D> Rule for TypedRule<T, E, D>
where
    T: Transcode,
    E: Fn(&T) -> String,
    D: Fn(&str) -> Result<T, DecodeError>,
{
    fn describe(&self, _transcoder: &Transcoder) -> Result<String, TranscodeError> {
        Ok(self.description.to_string())
    }

    fn encode(&self, _transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        let typed = T::from_value(value.clone()).map_err(|_| TranscodeError::ValueMismatch {
            type_name: T::descriptor().to_string(),
            value: format!("{value:?}"),
        })?;
        Ok((self.encode)(&typed))
    }

    fn decode(&self, _transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        let typed = (self.decode)(text)?;
        Ok(typed.to_value())
    }
}
