use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::schema::{EnumSchema, ObjectSchema};

/// Scalar types with a dedicated built-in rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Char,
    String,
    /// `chrono::NaiveDateTime`
    DateTime,
    /// `chrono::NaiveDate`
    Date,
    /// `chrono::NaiveTime`
    Time,
    /// `chrono::DateTime<Utc>`
    Instant,
    /// `std::time::Duration`
    Duration,
    /// `chrono::TimeDelta`
    TimeDelta,
}

impl ScalarKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Char => "char",
            ScalarKind::String => "String",
            ScalarKind::DateTime => "NaiveDateTime",
            ScalarKind::Date => "NaiveDate",
            ScalarKind::Time => "NaiveTime",
            ScalarKind::Instant => "DateTime<Utc>",
            ScalarKind::Duration => "Duration",
            ScalarKind::TimeDelta => "TimeDelta",
        }
    }

    /// Scalars whose literal form is also a valid JSON literal.
    pub fn is_json_literal(self) -> bool {
        matches!(
            self,
            ScalarKind::Bool
                | ScalarKind::I8
                | ScalarKind::I16
                | ScalarKind::I32
                | ScalarKind::I64
                | ScalarKind::U8
                | ScalarKind::U16
                | ScalarKind::U32
                | ScalarKind::U64
                | ScalarKind::F32
                | ScalarKind::F64
        )
    }
}

/// Structural category of a type. Drives built-in rule selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Scalar(ScalarKind),
    Array,
    List,
    Set,
    Map,
    Optional,
    Enum,
    Object,
    /// A type with no built-in category; only a custom rule can handle it.
    Opaque,
    /// Single-value async wrapper (`Deferred<T>`).
    Single,
    /// Multi-value async wrapper (`ResponseStream<T>`).
    Stream,
    /// Completion handle of the suspending calling convention.
    Continuation,
}

impl TypeKind {
    /// Kinds whose encoded form is a JSON document.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            TypeKind::Array | TypeKind::List | TypeKind::Set | TypeKind::Map | TypeKind::Object
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncWrapper {
    Single,
    Stream,
}

#[derive(Debug, Clone)]
pub(crate) enum Shape {
    Object(Arc<ObjectSchema>),
    Enum(Arc<EnumSchema>),
}

/// Structural description of a type, used to select a codec rule.
///
/// Identity is the name, the kind and the ordered type arguments. The attached
/// schema and the supertype list are derived from the name and take no part in
/// equality or hashing.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: Cow<'static, str>,
    kind: TypeKind,
    arguments: Vec<TypeDescriptor>,
    shape: Option<Shape>,
    supertypes: Vec<Cow<'static, str>>,
}

impl TypeDescriptor {
    fn new(name: impl Into<Cow<'static, str>>, kind: TypeKind, arguments: Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            kind,
            arguments,
            shape: None,
            supertypes: Vec::new(),
        }
    }

    pub fn scalar(kind: ScalarKind) -> Self {
        Self::new(kind.type_name(), TypeKind::Scalar(kind), Vec::new())
    }

    pub fn array(element: TypeDescriptor) -> Self {
        Self::new("array", TypeKind::Array, vec![element])
    }

    pub fn list(name: impl Into<Cow<'static, str>>, element: TypeDescriptor) -> Self {
        Self::new(name, TypeKind::List, vec![element])
    }

    pub fn set(name: impl Into<Cow<'static, str>>, element: TypeDescriptor) -> Self {
        Self::new(name, TypeKind::Set, vec![element])
    }

    pub fn map(
        name: impl Into<Cow<'static, str>>,
        key: TypeDescriptor,
        value: TypeDescriptor,
    ) -> Self {
        Self::new(name, TypeKind::Map, vec![key, value])
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        Self::new("Option", TypeKind::Optional, vec![inner])
    }

    pub fn object(schema: Arc<ObjectSchema>) -> Self {
        let mut descriptor = Self::new(schema.name().to_string(), TypeKind::Object, Vec::new());
        descriptor.shape = Some(Shape::Object(schema));
        descriptor
    }

    pub fn enumeration(schema: Arc<EnumSchema>) -> Self {
        let mut descriptor = Self::new(schema.name().to_string(), TypeKind::Enum, Vec::new());
        descriptor.shape = Some(Shape::Enum(schema));
        descriptor
    }

    /// A type that has no built-in rule and must be served by a custom rule.
    pub fn opaque(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, TypeKind::Opaque, Vec::new())
    }

    pub fn single(inner: TypeDescriptor) -> Self {
        Self::new("Deferred", TypeKind::Single, vec![inner])
    }

    pub fn stream(element: TypeDescriptor) -> Self {
        Self::new("ResponseStream", TypeKind::Stream, vec![element])
    }

    pub fn continuation(output: TypeDescriptor) -> Self {
        Self::new("Continuation", TypeKind::Continuation, vec![output])
    }

    /// The argument-less form of a generic family, e.g. raw `Vec`.
    ///
    /// A custom rule registered for a raw descriptor applies to every
    /// parameterization of that family.
    pub fn raw(name: impl Into<Cow<'static, str>>, kind: TypeKind) -> Self {
        Self::new(name, kind, Vec::new())
    }

    pub fn with_supertype(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last path segment of the name, for prompts and messages.
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn arguments(&self) -> &[TypeDescriptor] {
        &self.arguments
    }

    pub fn argument(&self, index: usize) -> Option<&TypeDescriptor> {
        self.arguments.get(index)
    }

    pub fn supertypes(&self) -> &[Cow<'static, str>] {
        &self.supertypes
    }

    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    pub fn wrapper(&self) -> Option<AsyncWrapper> {
        match self.kind {
            TypeKind::Single => Some(AsyncWrapper::Single),
            TypeKind::Stream => Some(AsyncWrapper::Stream),
            _ => None,
        }
    }

    pub fn object_schema(&self) -> Option<&Arc<ObjectSchema>> {
        match &self.shape {
            Some(Shape::Object(schema)) => Some(schema),
            _ => None,
        }
    }

    pub fn enum_schema(&self) -> Option<&Arc<EnumSchema>> {
        match &self.shape {
            Some(Shape::Enum(schema)) => Some(schema),
            _ => None,
        }
    }

    /// True when `target` is a strict supertype of `self`: either the raw form
    /// of the same generic family, or a name `self` declares as a supertype.
    pub fn is_subtype_of(&self, target: &TypeDescriptor) -> bool {
        if self == target {
            return false;
        }
        let raw_family = target.arguments.is_empty()
            && !self.arguments.is_empty()
            && target.kind == self.kind
            && target.name == self.name;
        raw_family || self.supertypes.iter().any(|name| *name == target.name)
    }

    /// The type the model is asked to produce for a value of this type.
    ///
    /// A single-value wrapper answers with its argument; a stream answers
    /// with a list of its elements.
    pub fn response_type(&self) -> Option<TypeDescriptor> {
        match self.kind {
            TypeKind::Single => self.arguments.first().cloned(),
            TypeKind::Stream => self
                .arguments
                .first()
                .map(|element| TypeDescriptor::list("Vec", element.clone())),
            TypeKind::Continuation => None,
            _ => Some(self.clone()),
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.name == other.name && self.arguments == other.arguments
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.kind.hash(state);
        self.arguments.hash(state);
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == TypeKind::Array {
            return match self.arguments.first() {
                Some(element) => write!(f, "[{element}]"),
                None => f.write_str("[_]"),
            };
        }
        f.write_str(self.short_name())?;
        if !self.arguments.is_empty() {
            f.write_str("<")?;
            for (index, argument) in self.arguments.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{argument}")?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}
