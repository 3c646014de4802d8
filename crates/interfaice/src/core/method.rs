use std::borrow::Cow;

use super::descriptor::{TypeDescriptor, TypeKind};
use super::errors::InvokeError;
use super::value::Value;

/// Static shape of an interface method, as declared in source.
///
/// The suspending convention is expressed by a trailing parameter whose
/// descriptor has kind [`TypeKind::Continuation`]; extraction removes it and
/// uses its argument as the logical return type.
#[derive(Debug, Clone)]
pub struct MethodSignature {
    name: Cow<'static, str>,
    parameters: Vec<(Cow<'static, str>, TypeDescriptor)>,
    return_type: Option<TypeDescriptor>,
    model: Option<Cow<'static, str>>,
    description: Option<Cow<'static, str>>,
}

impl MethodSignature {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
            model: None,
            description: None,
        }
    }

    pub fn parameter(mut self, name: impl Into<Cow<'static, str>>, descriptor: TypeDescriptor) -> Self {
        self.parameters.push((name.into(), descriptor));
        self
    }

    pub fn returns(mut self, descriptor: TypeDescriptor) -> Self {
        self.return_type = Some(descriptor);
        self
    }

    pub fn model(mut self, model: impl Into<Cow<'static, str>>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub descriptor: TypeDescriptor,
    pub value: Value,
}

/// Structured capture of one call: its name, real parameters with their
/// values, and the logical return type.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub parameters: Vec<ParameterDescriptor>,
    pub return_type: TypeDescriptor,
    pub suspending: bool,
    pub description: Option<String>,
    pub model: Option<String>,
}

impl MethodDescriptor {
    /// Extracts the call shape from `signature`.
    ///
    /// `arguments` holds one value per real parameter. With `None` only the
    /// return type is resolved and the parameter list stays empty, which is
    /// enough to render a response format ahead of any call.
    pub fn extract(
        signature: &MethodSignature,
        arguments: Option<Vec<Value>>,
    ) -> Result<Self, InvokeError> {
        let introspection = |reason: String| InvokeError::Introspection {
            method: signature.name.to_string(),
            reason,
        };

        let mut declared = signature.parameters.as_slice();
        let mut return_type = signature.return_type.clone();
        let mut suspending = false;

        if let Some(((name, last), rest)) = declared.split_last()
            && last.kind() == TypeKind::Continuation
        {
            let output = last.argument(0).cloned().ok_or_else(|| {
                introspection(format!(
                    "continuation parameter `{name}` carries no result type"
                ))
            })?;
            declared = rest;
            return_type = Some(output);
            suspending = true;
        }

        let return_type = return_type.ok_or_else(|| introspection("no return type declared".into()))?;

        let parameters = match arguments {
            None => Vec::new(),
            Some(values) if values.len() != declared.len() => {
                return Err(introspection(format!(
                    "expected {} argument(s), got {}",
                    declared.len(),
                    values.len()
                )));
            }
            Some(values) => declared
                .iter()
                .zip(values)
                .map(|((name, descriptor), value)| ParameterDescriptor {
                    name: name.to_string(),
                    descriptor: descriptor.clone(),
                    value,
                })
                .collect(),
        };

        Ok(Self {
            name: signature.name.to_string(),
            parameters,
            return_type,
            suspending,
            description: signature.description.as_deref().map(str::to_string),
            model: signature.model.as_deref().map(str::to_string),
        })
    }
}
