use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    hash::Hash,
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use indexmap::IndexMap;

use super::descriptor::{ScalarKind, TypeDescriptor};
use super::errors::DecodeError;
use super::schema::ObjectFields;

/// Dynamic value tree exchanged between typed Rust values and the rules.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Char(char),
    String(String),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Instant(DateTime<Utc>),
    Duration(Duration),
    TimeDelta(TimeDelta),
    List(Vec<Value>),
    /// Ordered key/value pairs. Keys may be any value, not only strings.
    Map(Vec<(Value, Value)>),
    Enum(String),
    Object(IndexMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::I8(_) => "I8",
            Value::I16(_) => "I16",
            Value::I32(_) => "I32",
            Value::I64(_) => "I64",
            Value::U8(_) => "U8",
            Value::U16(_) => "U16",
            Value::U32(_) => "U32",
            Value::U64(_) => "U64",
            Value::F32(_) => "F32",
            Value::F64(_) => "F64",
            Value::Char(_) => "Char",
            Value::String(_) => "String",
            Value::DateTime(_) => "DateTime",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::Instant(_) => "Instant",
            Value::Duration(_) => "Duration",
            Value::TimeDelta(_) => "TimeDelta",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Enum(_) => "Enum",
            Value::Object(_) => "Object",
        }
    }

    fn unexpected(self, expected: &'static str) -> DecodeError {
        DecodeError::UnexpectedValue {
            expected,
            actual: self.type_name().to_string(),
        }
    }
}

/// Static type description of a Rust type.
pub trait Describe {
    fn descriptor() -> TypeDescriptor;
}

/// Conversion of a typed value into the dynamic [`Value`] tree.
pub trait Encode: Describe {
    fn to_value(&self) -> Value;
}

/// Conversion back from a decoded [`Value`].
pub trait Transcode: Encode + Sized {
    fn from_value(value: Value) -> Result<Self, DecodeError>;

    /// Value to use when an object field of this type is missing entirely.
    fn absent() -> Option<Self> {
        None
    }
}

impl<T: Describe + ?Sized> Describe for &T {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

macro_rules! impl_scalar {
    ($ty:ty, $kind:ident) => {
        impl Describe for $ty {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::scalar(ScalarKind::$kind)
            }
        }

        impl Encode for $ty {
            fn to_value(&self) -> Value {
                Value::$kind(self.clone())
            }
        }

        impl Transcode for $ty {
            fn from_value(value: Value) -> Result<Self, DecodeError> {
                match value {
                    Value::$kind(inner) => Ok(inner),
                    other => Err(other.unexpected(stringify!($kind))),
                }
            }
        }
    };
}

impl_scalar!(bool, Bool);
impl_scalar!(i8, I8);
impl_scalar!(i16, I16);
impl_scalar!(i32, I32);
impl_scalar!(i64, I64);
impl_scalar!(u8, U8);
impl_scalar!(u16, U16);
impl_scalar!(u32, U32);
impl_scalar!(u64, U64);
impl_scalar!(f32, F32);
impl_scalar!(f64, F64);
impl_scalar!(char, Char);
impl_scalar!(String, String);
impl_scalar!(NaiveDateTime, DateTime);
impl_scalar!(NaiveDate, Date);
impl_scalar!(NaiveTime, Time);
impl_scalar!(DateTime<Utc>, Instant);
impl_scalar!(Duration, Duration);
impl_scalar!(TimeDelta, TimeDelta);

impl Describe for str {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::scalar(ScalarKind::String)
    }
}

impl Encode for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

impl<T: Describe> Describe for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::optional(T::descriptor())
    }
}

impl<T: Encode> Encode for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

impl<T: Transcode> Transcode for Option<T> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

fn from_list<T: Transcode, C: FromIterator<T>>(value: Value) -> Result<C, DecodeError> {
    match value {
        Value::List(items) => items.into_iter().map(T::from_value).collect(),
        other => Err(other.unexpected("List")),
    }
}

fn from_map<K, V, C>(value: Value) -> Result<C, DecodeError>
where
    K: Transcode,
    V: Transcode,
    C: FromIterator<(K, V)>,
{
    match value {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(key, value)| Ok((K::from_value(key)?, V::from_value(value)?)))
            .collect(),
        other => Err(other.unexpected("Map")),
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list("Vec", T::descriptor())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Encode::to_value).collect())
    }
}

impl<T: Transcode> Transcode for Vec<T> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        from_list(value)
    }
}

impl<T: Describe> Describe for [T] {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::array(T::descriptor())
    }
}

impl<T: Encode> Encode for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Encode::to_value).collect())
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::array(T::descriptor())
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: Transcode, const N: usize> Transcode for [T; N] {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        let items: Vec<T> = from_list(value)?;
        items
            .try_into()
            .map_err(|items: Vec<T>| DecodeError::LengthMismatch {
                expected: N,
                actual: items.len(),
            })
    }
}

macro_rules! impl_set {
    ($set:ident, $name:literal, $($bound:path),+) => {
        impl<T: Describe> Describe for $set<T> {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::set($name, T::descriptor())
            }
        }

        impl<T: Encode> Encode for $set<T> {
            fn to_value(&self) -> Value {
                Value::List(self.iter().map(Encode::to_value).collect())
            }
        }

        impl<T: Transcode $(+ $bound)+> Transcode for $set<T> {
            fn from_value(value: Value) -> Result<Self, DecodeError> {
                from_list(value)
            }
        }
    };
}

impl_set!(HashSet, "HashSet", Eq, Hash);
impl_set!(BTreeSet, "BTreeSet", Ord);

macro_rules! impl_map {
    ($map:ident, $name:literal, $($bound:path),+) => {
        impl<K: Describe, V: Describe> Describe for $map<K, V> {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::map($name, K::descriptor(), V::descriptor())
            }
        }

        impl<K: Encode, V: Encode> Encode for $map<K, V> {
            fn to_value(&self) -> Value {
                Value::Map(
                    self.iter()
                        .map(|(key, value)| (key.to_value(), value.to_value()))
                        .collect(),
                )
            }
        }

        impl<K: Transcode $(+ $bound)+, V: Transcode> Transcode for $map<K, V> {
            fn from_value(value: Value) -> Result<Self, DecodeError> {
                from_map(value)
            }
        }
    };
}

impl_map!(HashMap, "HashMap", Eq, Hash);
impl_map!(BTreeMap, "BTreeMap", Ord);
impl_map!(IndexMap, "IndexMap", Eq, Hash);

macro_rules! impl_pointer {
    ($ptr:ident) => {
        impl<T: Describe + ?Sized> Describe for $ptr<T> {
            fn descriptor() -> TypeDescriptor {
                T::descriptor()
            }
        }

        impl<T: Encode + ?Sized> Encode for $ptr<T> {
            fn to_value(&self) -> Value {
                (**self).to_value()
            }
        }

        impl<T: Transcode> Transcode for $ptr<T> {
            fn from_value(value: Value) -> Result<Self, DecodeError> {
                T::from_value(value).map($ptr::new)
            }

            fn absent() -> Option<Self> {
                T::absent().map($ptr::new)
            }
        }
    };
}

impl_pointer!(Box);
impl_pointer!(Arc);

/// Unwraps a decoded object into its field table.
#[doc(hidden)]
pub fn expect_object(value: Value) -> Result<ObjectFields, DecodeError> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(other.unexpected("Object")),
    }
}

#[doc(hidden)]
pub fn expect_variant(value: Value) -> Result<String, DecodeError> {
    match value {
        Value::Enum(variant) | Value::String(variant) => Ok(variant),
        other => Err(other.unexpected("Enum")),
    }
}

/// Removes `name` from `fields` and converts it, falling back to
/// [`Transcode::absent`] when the field is missing.
#[doc(hidden)]
pub fn take_field<T: Transcode>(
    fields: &mut ObjectFields,
    class: &str,
    name: &str,
) -> Result<T, DecodeError> {
    match fields.shift_remove(name) {
        Some(value) => T::from_value(value),
        None => T::absent().ok_or_else(|| DecodeError::MissingField {
            class: class.to_string(),
            field: name.to_string(),
        }),
    }
}

/// Like [`take_field`], but a missing or null field takes `T::default()`.
#[doc(hidden)]
pub fn take_field_or_default<T: Transcode + Default>(
    fields: &mut ObjectFields,
    name: &str,
) -> Result<T, DecodeError> {
    match fields.shift_remove(name) {
        Some(Value::Null) | None => Ok(T::default()),
        Some(value) => T::from_value(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_to_value() {
        assert_eq!("hello".to_value(), Value::String("hello".into()));
        assert_eq!(true.to_value(), Value::Bool(true));
        assert_eq!((-7i16).to_value(), Value::I16(-7));
        assert_eq!(3.5f32.to_value(), Value::F32(3.5));
    }

    #[test]
    fn test_container_to_value() {
        let none: Option<i32> = None;
        assert_eq!(Some(1).to_value(), Value::I32(1));
        assert_eq!(none.to_value(), Value::Null);
        assert_eq!(
            vec!["a", "b"].to_value(),
            Value::List(vec![Value::String("a".into()), Value::String("b".into())])
        );
        assert_eq!(Arc::new(7u8).to_value(), Value::U8(7));
    }

    #[test]
    fn test_fixed_array_length_is_checked() {
        let value = Value::List(vec![Value::I32(1), Value::I32(2)]);
        let err = <[i32; 3]>::from_value(value).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LengthMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_missing_field_uses_absent() {
        let mut fields = ObjectFields::new();
        let nickname: Option<String> = take_field(&mut fields, "Person", "nickname").unwrap();
        assert_eq!(nickname, None);

        let err = take_field::<String>(&mut fields, "Person", "name").unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { .. }));
    }

    #[test]
    fn test_mismatched_value_is_rejected() {
        let err = String::from_value(Value::I32(3)).unwrap_err();
        assert_eq!(err.to_string(), "expected String, got I32");
    }
}
