use indoc::formatdoc;

use crate::client::ChatMessage;
use crate::core::{MethodDescriptor, ParameterDescriptor, TranscodeError, TypeDescriptor};
use crate::transcode::{NULL_SENTINEL, Transcoder};

/// The two messages sent for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

/// Renders a [`MethodDescriptor`] into a [`Prompt`].
///
/// Output is deterministic for a fixed descriptor and rule set.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    transcoder: Transcoder,
}

impl PromptBuilder {
    pub fn new(transcoder: Transcoder) -> Self {
        Self { transcoder }
    }

    /// Description of the text the model must answer with.
    ///
    /// A `Deferred<T>` return asks for `T`; a `ResponseStream<T>` return asks
    /// for a JSON array of `T`.
    pub fn response_format(&self, return_type: &TypeDescriptor) -> Result<String, TranscodeError> {
        let response_type = response_type(return_type)?;
        self.transcoder.describe(&response_type)
    }

    pub fn build(
        &self,
        method: &MethodDescriptor,
        interface_name: &str,
        description: Option<&str>,
    ) -> Result<Prompt, TranscodeError> {
        let response_type = response_type(&method.return_type)?;
        let format = self.transcoder.describe(&response_type)?;

        let system = formatdoc! {"
            You will be given a method spec of a method declared by the `{interface_name}` interface.
            By carefully following the method spec, respond as the method would.
            When responding, follow the given format without any additional text. Keep in mind that your response will be decoded and provided as the method response:
            response format: {format}"
        };

        let parameters = method
            .parameters
            .iter()
            .map(|parameter| self.parameter_line(parameter))
            .collect::<Result<Vec<_>, _>>()?;
        let parameters = if parameters.is_empty() {
            "(none)".to_string()
        } else {
            parameters.join("\n")
        };

        let mut user = formatdoc! {"
            method spec:
            name = {name}
            parameters (a value of {NULL_SENTINEL} means no value was given):
            {parameters}
            return type = {response_type}",
            name = method.name,
        };
        if let Some(description) = description.filter(|text| !text.trim().is_empty()) {
            user.push_str(&format!("\ndescription = {}", description.trim()));
        }
        user.push_str(
            "\n\nagain, make sure to follow the provided response format without any additional text",
        );

        Ok(Prompt { system, user })
    }

    fn parameter_line(&self, parameter: &ParameterDescriptor) -> Result<String, TranscodeError> {
        let value = self
            .transcoder
            .encode_value(&parameter.descriptor, &parameter.value)?;
        Ok(format_parameter(&parameter.name, &value))
    }
}

fn response_type(return_type: &TypeDescriptor) -> Result<TypeDescriptor, TranscodeError> {
    return_type.response_type().ok_or_else(|| {
        TranscodeError::unresolved(return_type, "a continuation is not a response type")
    })
}

fn format_parameter(name: &str, value: &str) -> String {
    format!("{name} = {value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MethodSignature, ScalarKind, Value};

    #[test]
    fn test_format_parameter() {
        assert_eq!(format_parameter("country", "Korea"), "country = Korea");
    }

    #[test]
    fn test_stream_response_is_a_list() {
        let element = TypeDescriptor::scalar(ScalarKind::String);
        let stream = TypeDescriptor::stream(element.clone());
        assert_eq!(
            response_type(&stream).unwrap(),
            TypeDescriptor::list("Vec", element)
        );
    }

    #[test]
    fn test_null_parameter_renders_sentinel() {
        let signature = MethodSignature::new("greet")
            .parameter(
                "name",
                TypeDescriptor::optional(TypeDescriptor::scalar(ScalarKind::String)),
            )
            .returns(TypeDescriptor::scalar(ScalarKind::String));
        let method = MethodDescriptor::extract(&signature, Some(vec![Value::Null])).unwrap();

        let prompt = PromptBuilder::default()
            .build(&method, "Greeter", None)
            .unwrap();
        assert!(prompt.user.contains("name = NULL"));
        assert!(!prompt.user.contains("description ="));
    }
}
