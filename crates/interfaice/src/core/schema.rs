use std::borrow::Cow;

use indexmap::IndexMap;

use super::descriptor::TypeDescriptor;
use super::errors::DecodeError;
use super::value::Value;

/// Lazily produces the descriptor of a field. Deferring the call keeps
/// recursive object graphs from being walked at schema construction.
pub type DescriptorFn = fn() -> TypeDescriptor;

/// Field values collected while decoding an object, keyed by declared name.
pub type ObjectFields = IndexMap<String, Value>;

/// Applies a decoded setter argument to the collected fields.
pub type SetterFn = fn(&mut ObjectFields, Value) -> Result<(), DecodeError>;

#[derive(Debug, Clone)]
pub struct FieldSchema {
    name: Cow<'static, str>,
    descriptor: DescriptorFn,
}

impl FieldSchema {
    pub fn new(name: impl Into<Cow<'static, str>>, descriptor: DescriptorFn) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> TypeDescriptor {
        (self.descriptor)()
    }
}

/// A setter-shaped entry point: a JSON key that is not a field itself but
/// updates one or more fields once decoded.
#[derive(Debug, Clone)]
pub struct Setter {
    name: Cow<'static, str>,
    descriptor: DescriptorFn,
    apply: SetterFn,
}

impl Setter {
    pub fn new(name: impl Into<Cow<'static, str>>, descriptor: DescriptorFn, apply: SetterFn) -> Self {
        Self {
            name: name.into(),
            descriptor,
            apply,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> TypeDescriptor {
        (self.descriptor)()
    }

    pub fn apply(&self, fields: &mut ObjectFields, value: Value) -> Result<(), DecodeError> {
        (self.apply)(fields, value)
    }
}

/// Statically declared shape of an object type: its fields in declaration
/// order, the constructors it can be built with, and its setters.
///
/// Constructors are lists of field names. Decoding picks the first one whose
/// names are all present in the JSON input.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    name: Cow<'static, str>,
    fields: Vec<FieldSchema>,
    constructors: Vec<Vec<Cow<'static, str>>>,
    setters: Vec<Setter>,
}

impl ObjectSchema {
    pub fn builder(name: impl Into<Cow<'static, str>>) -> ObjectSchemaBuilder {
        ObjectSchemaBuilder {
            schema: ObjectSchema {
                name: name.into(),
                fields: Vec::new(),
                constructors: Vec::new(),
                setters: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &[Cow<'static, str>]> {
        self.constructors.iter().map(Vec::as_slice)
    }

    pub fn setter(&self, name: &str) -> Option<&Setter> {
        self.setters.iter().find(|setter| setter.name() == name)
    }

    pub fn setters(&self) -> &[Setter] {
        &self.setters
    }
}

pub struct ObjectSchemaBuilder {
    schema: ObjectSchema,
}

impl ObjectSchemaBuilder {
    pub fn field(mut self, name: impl Into<Cow<'static, str>>, descriptor: DescriptorFn) -> Self {
        self.schema.fields.push(FieldSchema::new(name, descriptor));
        self
    }

    /// Declares a constructor by the field names it consumes.
    pub fn constructor<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        self.schema
            .constructors
            .push(parameters.into_iter().map(Into::into).collect());
        self
    }

    pub fn setter(
        mut self,
        name: impl Into<Cow<'static, str>>,
        descriptor: DescriptorFn,
        apply: SetterFn,
    ) -> Self {
        self.schema.setters.push(Setter::new(name, descriptor, apply));
        self
    }

    pub fn build(self) -> ObjectSchema {
        self.schema
    }
}

#[derive(Debug, Clone)]
pub struct EnumSchema {
    name: Cow<'static, str>,
    variants: Vec<Cow<'static, str>>,
}

impl EnumSchema {
    pub fn new<I, S>(name: impl Into<Cow<'static, str>>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|variant| variant.as_ref())
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.variants.iter().any(|known| known == variant)
    }
}
