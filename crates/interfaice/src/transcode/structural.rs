use std::cell::RefCell;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use super::{MatchedRule, NULL_SENTINEL, Rule, Transcoder};
use crate::core::{
    DecodeError, EnumSchema, ObjectFields, ObjectSchema, TranscodeError, TypeDescriptor, TypeKind,
    Value,
};

/// A nested type together with the rule resolved for it.
#[derive(Debug, Clone)]
pub struct Element {
    descriptor: TypeDescriptor,
    rule: Box<MatchedRule>,
}

impl Element {
    pub(crate) fn new(descriptor: TypeDescriptor, rule: MatchedRule) -> Self {
        Self {
            descriptor,
            rule: Box::new(rule),
        }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError> {
        self.rule.describe(transcoder)
    }

    /// Encodes `value` for embedding inside a JSON document.
    ///
    /// Structural values and numeric or boolean literals embed as JSON; every
    /// other encoded text embeds as a JSON string.
    pub(crate) fn encode_json(
        &self,
        transcoder: &Transcoder,
        value: &Value,
    ) -> Result<JsonValue, TranscodeError> {
        if value.is_null() {
            return Ok(JsonValue::Null);
        }
        let text = self.rule.encode(transcoder, value)?;
        if embeds_as_json(&self.descriptor)
            && let Ok(node) = serde_json::from_str::<JsonValue>(&text)
        {
            return Ok(node);
        }
        Ok(JsonValue::String(text))
    }

    /// Key text of a JSON object member.
    fn encode_key(&self, transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        if value.is_null() {
            return Ok(NULL_SENTINEL.to_string());
        }
        self.rule.encode(transcoder, value)
    }

    /// Decodes one JSON node: string content as-is, any other node by its
    /// serialized JSON text. JSON `null` decodes to [`Value::Null`].
    pub(crate) fn decode_node(
        &self,
        transcoder: &Transcoder,
        node: &JsonValue,
    ) -> Result<Value, TranscodeError> {
        match node {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::String(text) => self.rule.decode(transcoder, text),
            other => self.rule.decode(transcoder, &other.to_string()),
        }
    }
}

fn embeds_as_json(descriptor: &TypeDescriptor) -> bool {
    match descriptor.kind() {
        TypeKind::Scalar(kind) => kind.is_json_literal(),
        TypeKind::Optional => descriptor.argument(0).is_some_and(embeds_as_json),
        kind => kind.is_structural(),
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_json(text: &str) -> Result<JsonValue, DecodeError> {
    serde_json::from_str(text.trim()).map_err(|source| DecodeError::InvalidJson {
        raw: text.to_string(),
        source,
    })
}

fn mismatch(descriptor_name: &str, value: &Value) -> TranscodeError {
    TranscodeError::ValueMismatch {
        type_name: descriptor_name.to_string(),
        value: format!("{value:?}"),
    }
}

/// Shared body of the array, list and set rules.
#[derive(Debug, Clone)]
struct Sequence {
    element: Element,
}

impl Sequence {
    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError> {
        Ok(format!(
            "Json array with the following entry format:\n{}",
            self.element.describe(transcoder)?
        ))
    }

    fn encode(
        &self,
        transcoder: &Transcoder,
        type_name: &str,
        value: &Value,
    ) -> Result<String, TranscodeError> {
        let Value::List(items) = value else {
            return Err(mismatch(type_name, value));
        };
        let nodes = items
            .iter()
            .map(|item| self.element.encode_json(transcoder, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(JsonValue::Array(nodes).to_string())
    }

    fn decode(&self, transcoder: &Transcoder, text: &str) -> Result<Vec<Value>, TranscodeError> {
        let JsonValue::Array(nodes) = parse_json(text)? else {
            return Err(DecodeError::ExpectedArray {
                raw: text.to_string(),
            }
            .into());
        };
        nodes
            .iter()
            .map(|node| self.element.decode_node(transcoder, node))
            .collect()
    }
}

macro_rules! sequence_rule {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            inner: Sequence,
        }

        impl $name {
            pub(crate) fn new(element: Element) -> Self {
                Self {
                    inner: Sequence { element },
                }
            }

            pub fn element(&self) -> &TypeDescriptor {
                self.inner.element.descriptor()
            }
        }
    };
}

sequence_rule!(
    /// Fixed-size arrays.
    ArrayRule
);
sequence_rule!(ListRule);
sequence_rule!(
    /// Sets. Decoding drops duplicate entries, keeping the first occurrence.
    SetRule
);

impl Rule for ArrayRule {
    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError> {
        self.inner.describe(transcoder)
    }

    fn encode(&self, transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        self.inner.encode(transcoder, "array", value)
    }

    fn decode(&self, transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        self.inner.decode(transcoder, text).map(Value::List)
    }
}

impl Rule for ListRule {
    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError> {
        self.inner.describe(transcoder)
    }

    fn encode(&self, transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        self.inner.encode(transcoder, "list", value)
    }

    fn decode(&self, transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        self.inner.decode(transcoder, text).map(Value::List)
    }
}

impl Rule for SetRule {
    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError> {
        self.inner.describe(transcoder)
    }

    fn encode(&self, transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        self.inner.encode(transcoder, "set", value)
    }

    fn decode(&self, transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        let mut unique: Vec<Value> = Vec::new();
        for item in self.inner.decode(transcoder, text)? {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Ok(Value::List(unique))
    }
}

#[derive(Debug, Clone)]
pub struct MapRule {
    key: Element,
    value: Element,
}

impl MapRule {
    pub(crate) fn new(key: Element, value: Element) -> Self {
        Self { key, value }
    }
}

impl Rule for MapRule {
    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError> {
        Ok(format!(
            "Json object with the following key/value format:\nkey -> {{\n{}\n}}\nvalue -> {{\n{}\n}}",
            indent(&self.key.describe(transcoder)?),
            indent(&self.value.describe(transcoder)?),
        ))
    }

    fn encode(&self, transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        let Value::Map(entries) = value else {
            return Err(mismatch("map", value));
        };
        let mut object = serde_json::Map::new();
        for (key, entry) in entries {
            object.insert(
                self.key.encode_key(transcoder, key)?,
                self.value.encode_json(transcoder, entry)?,
            );
        }
        Ok(JsonValue::Object(object).to_string())
    }

    fn decode(&self, transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        let JsonValue::Object(members) = parse_json(text)? else {
            return Err(DecodeError::ExpectedObject {
                raw: text.to_string(),
            }
            .into());
        };
        members
            .iter()
            .map(|(key, node)| {
                Ok((
                    self.key.rule.decode(transcoder, key)?,
                    self.value.decode_node(transcoder, node)?,
                ))
            })
            .collect::<Result<Vec<_>, TranscodeError>>()
            .map(Value::Map)
    }
}

/// Nullable values. `NULL` is the text of an absent value.
#[derive(Debug, Clone)]
pub struct OptionalRule {
    inner: Element,
}

impl OptionalRule {
    pub(crate) fn new(inner: Element) -> Self {
        Self { inner }
    }
}

impl Rule for OptionalRule {
    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError> {
        Ok(format!(
            "{} (or {NULL_SENTINEL} when there is no value)",
            self.inner.describe(transcoder)?
        ))
    }

    fn encode(&self, transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        match value {
            Value::Null => Ok(NULL_SENTINEL.to_string()),
            other => self.inner.rule.encode(transcoder, other),
        }
    }

    fn decode(&self, transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        if text.trim() == NULL_SENTINEL {
            return Ok(Value::Null);
        }
        self.inner.rule.decode(transcoder, text)
    }
}

#[derive(Debug, Clone)]
pub struct EnumRule {
    schema: Arc<EnumSchema>,
}

impl EnumRule {
    pub(crate) fn new(schema: Arc<EnumSchema>) -> Self {
        Self { schema }
    }
}

impl Rule for EnumRule {
    fn describe(&self, _transcoder: &Transcoder) -> Result<String, TranscodeError> {
        Ok(format!(
            "one of the following values:\n{}",
            self.schema.variants().collect::<Vec<_>>().join(", ")
        ))
    }

    fn encode(&self, _transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        match value {
            Value::Enum(variant) if self.schema.contains(variant) => Ok(variant.clone()),
            other => Err(mismatch(self.schema.name(), other)),
        }
    }

    fn decode(&self, _transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        let name = text.trim();
        if self.schema.contains(name) {
            return Ok(Value::Enum(name.to_string()));
        }
        Err(DecodeError::UnknownVariant {
            enum_name: self.schema.name().to_string(),
            got: name.to_string(),
            valid_variants: self.schema.variants().map(str::to_string).collect(),
        }
        .into())
    }
}

/// Generic objects described by an [`ObjectSchema`].
///
/// Field rules are resolved on use, so self-referential types can be matched.
#[derive(Debug, Clone)]
pub struct ObjectRule {
    schema: Arc<ObjectSchema>,
}

thread_local! {
    /// Objects whose description is being built on this thread.
    static DESCRIBING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Marks an object as being described until dropped.
struct DescribeGuard;

impl DescribeGuard {
    fn enter(name: &str) -> Result<Self, TranscodeError> {
        DESCRIBING.with_borrow_mut(|stack| {
            if stack.iter().any(|entered| entered == name) {
                return Err(TranscodeError::unresolved(
                    name,
                    "the type contains itself, so its description would never end",
                ));
            }
            stack.push(name.to_string());
            Ok(Self)
        })
    }
}

impl Drop for DescribeGuard {
    fn drop(&mut self) {
        DESCRIBING.with_borrow_mut(|stack| {
            stack.pop();
        });
    }
}

impl ObjectRule {
    pub(crate) fn new(schema: Arc<ObjectSchema>) -> Self {
        Self { schema }
    }

    fn configuration(&self, reason: impl Into<String>) -> TranscodeError {
        TranscodeError::configuration(self.schema.name(), reason)
    }

    fn field_element(
        &self,
        transcoder: &Transcoder,
        name: &str,
    ) -> Result<Element, TranscodeError> {
        let field = self.schema.field(name).ok_or_else(|| {
            self.configuration(format!("constructor parameter `{name}` is not a declared field"))
        })?;
        transcoder.element(field.descriptor())
    }
}

impl Rule for ObjectRule {
    fn describe(&self, transcoder: &Transcoder) -> Result<String, TranscodeError> {
        let _guard = DescribeGuard::enter(self.schema.name())?;
        let fields = self
            .schema
            .fields()
            .iter()
            .map(|field| {
                let nested = transcoder.describe(&field.descriptor())?;
                Ok(format!("{} -> {{\n{}\n}}", field.name(), indent(&nested)))
            })
            .collect::<Result<Vec<_>, TranscodeError>>()?;
        Ok(format!(
            "Json object with the following fields:\n{}",
            fields.join("\n")
        ))
    }

    fn encode(&self, transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        let Value::Object(values) = value else {
            return Err(mismatch(self.schema.name(), value));
        };
        let mut object = serde_json::Map::new();
        for field in self.schema.fields() {
            let element = transcoder.element(field.descriptor())?;
            let value = values.get(field.name()).unwrap_or(&Value::Null);
            object.insert(field.name().to_string(), element.encode_json(transcoder, value)?);
        }
        Ok(JsonValue::Object(object).to_string())
    }

    fn decode(&self, transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        let JsonValue::Object(members) = parse_json(text)? else {
            return Err(DecodeError::ExpectedObject {
                raw: text.to_string(),
            }
            .into());
        };
        let mut remaining: IndexMap<String, JsonValue> = members.into_iter().collect();

        let constructor = self
            .schema
            .constructors()
            .find(|parameters| {
                parameters
                    .iter()
                    .all(|parameter| remaining.contains_key(&**parameter))
            })
            .ok_or_else(|| match self.schema.constructors().next() {
                None => self.configuration("no constructor declared"),
                Some(_) => self.configuration(format!(
                    "no constructor found for the fields {:?}",
                    remaining.keys().collect::<Vec<_>>()
                )),
            })?;

        let mut fields = ObjectFields::new();
        for parameter in constructor {
            let element = self.field_element(transcoder, parameter)?;
            if let Some(node) = remaining.shift_remove(&**parameter) {
                fields.insert(parameter.to_string(), element.decode_node(transcoder, &node)?);
            }
        }

        let (by_setter, remaining): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|(key, _)| self.schema.setter(key).is_some());
        for (key, node) in by_setter {
            if let Some(setter) = self.schema.setter(&key) {
                let element = transcoder.element(setter.descriptor())?;
                let value = element.decode_node(transcoder, &node)?;
                setter.apply(&mut fields, value)?;
            }
        }

        // Direct field writes run last and win over anything a setter filled in.
        for (key, node) in remaining {
            if let Some(field) = self.schema.field(&key) {
                let element = transcoder.element(field.descriptor())?;
                let value = element.decode_node(transcoder, &node)?;
                fields.insert(key, value);
            } else {
                tracing::debug!(
                    object = self.schema.name(),
                    key = %key,
                    "ignoring unknown field in model answer"
                );
            }
        }

        Ok(Value::Object(fields))
    }
}
