use std::collections::{BTreeSet, HashMap};

use interfaice::{
    Continuation, CustomRule, Deferred, Describe, Encode, MethodDescriptor, MethodSignature,
    PromptBuilder, ResponseStream, Role, Transcode, Transcoder, Value,
};

#[derive(Debug, Transcode)]
struct City {
    name: String,
    population: u64,
}

fn build(signature: &MethodSignature, arguments: Vec<Value>) -> interfaice::Prompt {
    let method = MethodDescriptor::extract(signature, Some(arguments)).unwrap();
    PromptBuilder::new(Transcoder::new())
        .build(&method, "Geography", method.description.as_deref())
        .unwrap()
}

#[test]
fn test_blocking_prompt() {
    let signature = MethodSignature::new("capital")
        .parameter("country", String::descriptor())
        .returns(String::descriptor());
    let prompt = build(&signature, vec![Value::String("Korea".into())]);

    assert_eq!(
        prompt.system,
        "You will be given a method spec of a method declared by the `Geography` interface.\n\
         By carefully following the method spec, respond as the method would.\n\
         When responding, follow the given format without any additional text. \
         Keep in mind that your response will be decoded and provided as the method response:\n\
         response format: a string literal, e.g. hello world (without surrounding quotes)"
    );
    assert_eq!(
        prompt.user,
        "method spec:\n\
         name = capital\n\
         parameters (a value of NULL means no value was given):\n\
         country = Korea\n\
         return type = String\n\
         \n\
         again, make sure to follow the provided response format without any additional text"
    );
}

#[test]
fn test_prompt_messages_order() {
    let signature = MethodSignature::new("motto").returns(String::descriptor());
    let messages = build(&signature, Vec::new()).into_messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[1].role, Role::User);
    assert!(messages[1].content.contains("parameters (a value of NULL means no value was given):\n(none)\n"));
}

#[test]
fn test_description_is_appended() {
    let signature = MethodSignature::new("capital")
        .parameter("country", String::descriptor())
        .returns(String::descriptor())
        .description("Answer in the local language.");
    let prompt = build(&signature, vec![Value::String("Korea".into())]);
    assert!(prompt.user.ends_with(
        "return type = String\ndescription = Answer in the local language.\n\nagain, make sure to follow the provided response format without any additional text"
    ));
}

#[test]
fn test_structured_parameters_are_json() {
    let seoul = City {
        name: "Seoul".to_string(),
        population: 9_500_000,
    };
    let signature = MethodSignature::new("describe")
        .parameter("city", City::descriptor())
        .parameter("tags", Vec::<String>::descriptor())
        .parameter("rank", Option::<u8>::descriptor())
        .returns(String::descriptor());
    let prompt = build(
        &signature,
        vec![
            seoul.to_value(),
            vec!["capital".to_string()].to_value(),
            Value::Null,
        ],
    );
    assert!(prompt.user.contains(r#"city = {"name":"Seoul","population":9500000}"#));
    assert!(prompt.user.contains(r#"tags = ["capital"]"#));
    assert!(prompt.user.contains("rank = NULL"));
}

#[test]
fn test_stream_asks_for_array() {
    let signature = MethodSignature::new("cities")
        .parameter("country", String::descriptor())
        .returns(ResponseStream::<City>::descriptor());
    let prompt = build(&signature, vec![Value::String("Korea".into())]);
    assert!(prompt.system.ends_with(
        "response format: Json array with the following entry format:\n\
         Json object with the following fields:\n\
         name -> {\n    a string literal, e.g. hello world (without surrounding quotes)\n}\n\
         population -> {\n    a number literal ranging from 0 to 18446744073709551615, inclusive.\n}"
    ));
    assert!(prompt.user.contains("return type = Vec<City>"));
}

#[test]
fn test_format_descriptions_are_deterministic() {
    let loud = || {
        CustomRule::typed::<bool, _, _>(
            "YES or NO",
            |value| (if *value { "YES" } else { "NO" }).to_string(),
            |text| Ok(text.trim() == "YES"),
        )
    };
    let descriptors = [
        City::descriptor(),
        Vec::<City>::descriptor(),
        HashMap::<String, Option<bool>>::descriptor(),
        BTreeSet::<u16>::descriptor(),
    ];

    let first = Transcoder::with_custom_rules([loud()]);
    let second = Transcoder::with_custom_rules([loud()]);
    for descriptor in &descriptors {
        let described = first.describe(descriptor).unwrap();
        assert_eq!(first.describe(descriptor).unwrap(), described);
        assert_eq!(second.describe(descriptor).unwrap(), described);
    }
}

#[test]
fn test_deferred_and_suspending_ask_for_inner_type() {
    let deferred = MethodSignature::new("area").returns(Deferred::<u32>::descriptor());
    let prompt = build(&deferred, Vec::new());
    assert!(prompt.user.contains("return type = u32"));
    assert!(prompt.system.ends_with("from 0 to 4294967295, inclusive."));

    let suspending = MethodSignature::new("area")
        .parameter("continuation", Continuation::<bool>::descriptor());
    let prompt = build(&suspending, Vec::new());
    assert!(prompt.user.contains("return type = bool"));
}

#[test]
fn test_response_format_without_arguments() {
    let signature = MethodSignature::new("cities").returns(ResponseStream::<String>::descriptor());
    let method = MethodDescriptor::extract(&signature, None).unwrap();
    let format = PromptBuilder::default()
        .response_format(&method.return_type)
        .unwrap();
    assert_eq!(
        format,
        "Json array with the following entry format:\na string literal, e.g. hello world (without surrounding quotes)"
    );
}
