use interfaice::{
    CustomRule, DecodeError, Describe, ObjectFields, Rule, TranscodeError, Transcode, Transcoder,
    TypeDescriptor, TypeKind, Value,
};

const SHAPE: &str = "test_custom_rules::Shape";

#[derive(Debug, PartialEq, Transcode)]
#[transcode(supertype = "test_custom_rules::Shape")]
struct Circle {
    radius: f64,
}

#[derive(Debug, PartialEq, Transcode)]
struct Quiz {
    question: String,
    answer: bool,
}

/// Renders any shape as `r=<radius>`.
struct ShapeRule;

impl Rule for ShapeRule {
    fn describe(&self, _transcoder: &Transcoder) -> Result<String, TranscodeError> {
        Ok("a shape literal such as r=2".to_string())
    }

    fn encode(&self, _transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        match value {
            Value::Object(fields) => match fields.get("radius") {
                Some(Value::F64(radius)) => Ok(format!("r={radius}")),
                _ => Ok("r=?".to_string()),
            },
            other => Err(TranscodeError::ValueMismatch {
                type_name: SHAPE.to_string(),
                value: format!("{other:?}"),
            }),
        }
    }

    fn decode(&self, _transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        let radius = text
            .trim()
            .strip_prefix("r=")
            .and_then(|radius| radius.parse::<f64>().ok())
            .ok_or_else(|| DecodeError::UnexpectedValue {
                expected: "r=<radius>",
                actual: text.to_string(),
            })?;
        let mut fields = ObjectFields::new();
        fields.insert("radius".to_string(), Value::F64(radius));
        Ok(Value::Object(fields))
    }
}

/// Comma-separated strings for every `Vec`.
struct CsvRule;

impl Rule for CsvRule {
    fn describe(&self, _transcoder: &Transcoder) -> Result<String, TranscodeError> {
        Ok("comma separated values".to_string())
    }

    fn encode(&self, _transcoder: &Transcoder, value: &Value) -> Result<String, TranscodeError> {
        let Value::List(items) = value else {
            return Err(TranscodeError::ValueMismatch {
                type_name: "Vec".to_string(),
                value: format!("{value:?}"),
            });
        };
        Ok(items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => format!("{other:?}"),
            })
            .collect::<Vec<_>>()
            .join(","))
    }

    fn decode(&self, _transcoder: &Transcoder, text: &str) -> Result<Value, TranscodeError> {
        Ok(Value::List(
            text.split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        ))
    }
}

fn yes_no() -> CustomRule {
    CustomRule::typed::<bool, _, _>(
        "yes or no",
        |value| (if *value { "yes" } else { "no" }).to_string(),
        |text| match text.trim() {
            "yes" => Ok(true),
            "no" => Ok(false),
            other => Err(DecodeError::UnexpectedValue {
                expected: "yes or no",
                actual: other.to_string(),
            }),
        },
    )
}

#[test]
fn test_exact_custom_rule_overrides_builtin() {
    let transcoder = Transcoder::with_custom_rules([yes_no()]);
    assert!(transcoder.match_rule(&bool::descriptor()).unwrap().is_custom());
    assert_eq!(transcoder.describe(&bool::descriptor()).unwrap(), "yes or no");
    assert_eq!(transcoder.encode(&true).unwrap(), "yes");
    assert!(!transcoder.decode::<bool>(" no ").unwrap());
    assert!(transcoder.decode::<bool>("true").is_err());
}

#[test]
fn test_custom_rule_applies_to_nested_types() {
    let transcoder = Transcoder::with_custom_rules([yes_no()]);
    assert_eq!(transcoder.encode(&vec![true, false]).unwrap(), r#"["yes","no"]"#);
    assert_eq!(
        transcoder.decode::<Vec<bool>>(r#"["no", "yes"]"#).unwrap(),
        vec![false, true]
    );

    let quiz = Quiz {
        question: "Is Seoul in Korea?".to_string(),
        answer: true,
    };
    let text = transcoder.encode(&quiz).unwrap();
    assert_eq!(text, r#"{"question":"Is Seoul in Korea?","answer":"yes"}"#);
    assert_eq!(transcoder.decode::<Quiz>(&text).unwrap(), quiz);
}

#[test]
fn test_supertype_rule_matches_declared_subtype() {
    let transcoder = Transcoder::with_custom_rules([CustomRule::new(
        TypeDescriptor::opaque(SHAPE),
        ShapeRule,
    )]);
    assert!(Circle::descriptor().is_subtype_of(&TypeDescriptor::opaque(SHAPE)));
    assert!(transcoder.match_rule(&Circle::descriptor()).unwrap().is_custom());
    assert_eq!(
        transcoder.describe(&Circle::descriptor()).unwrap(),
        "a shape literal such as r=2"
    );
    assert_eq!(transcoder.encode(&Circle { radius: 2.5 }).unwrap(), "r=2.5");
    assert_eq!(
        transcoder.decode::<Circle>("r=4").unwrap(),
        Circle { radius: 4.0 }
    );
}

#[test]
fn test_exact_rule_beats_supertype_rule() {
    let exact = CustomRule::typed::<Circle, _, _>(
        "a radius",
        |circle| circle.radius.to_string(),
        |text| {
            text.trim()
                .parse()
                .map(|radius| Circle { radius })
                .map_err(|_| DecodeError::UnexpectedValue {
                    expected: "a radius",
                    actual: text.to_string(),
                })
        },
    );
    let transcoder = Transcoder::with_custom_rules([
        CustomRule::new(TypeDescriptor::opaque(SHAPE), ShapeRule),
        exact,
    ]);
    assert_eq!(transcoder.describe(&Circle::descriptor()).unwrap(), "a radius");
    assert_eq!(transcoder.decode::<Circle>("3").unwrap(), Circle { radius: 3.0 });
}

#[test]
fn test_first_registered_rule_wins() {
    let shouting = CustomRule::typed::<bool, _, _>(
        "YES or NO",
        |value| (if *value { "YES" } else { "NO" }).to_string(),
        |text| Ok(text.trim() == "YES"),
    );
    let transcoder = Transcoder::with_custom_rules([yes_no(), shouting]);
    assert_eq!(transcoder.describe(&bool::descriptor()).unwrap(), "yes or no");
}

#[test]
fn test_raw_generic_rule_matches_every_parameterization() {
    let transcoder = Transcoder::with_custom_rules([CustomRule::new(
        TypeDescriptor::raw("Vec", TypeKind::List),
        CsvRule,
    )]);

    let cities = vec!["Seoul".to_string(), "Busan".to_string()];
    assert_eq!(transcoder.encode(&cities).unwrap(), "Seoul,Busan");
    assert_eq!(
        transcoder.decode::<Vec<String>>("Seoul, Busan").unwrap(),
        cities
    );
    assert!(transcoder.match_rule(&Vec::<i64>::descriptor()).unwrap().is_custom());
    assert!(
        !transcoder
            .match_rule(&std::collections::HashSet::<String>::descriptor())
            .unwrap()
            .is_custom()
    );
}

#[test]
fn test_opaque_type_without_rule_fails_resolution() {
    let transcoder = Transcoder::new();
    let money = TypeDescriptor::opaque("bank::Money");

    let err = transcoder.describe(&money).unwrap_err();
    assert!(matches!(err, TranscodeError::TypeResolution { ref type_name, .. } if type_name == "Money"));

    let err = transcoder
        .describe(&TypeDescriptor::list("Vec", money))
        .unwrap_err();
    assert!(matches!(err, TranscodeError::TypeResolution { ref type_name, .. } if type_name == "Vec<Money>"));
}

#[test]
fn test_calling_convention_wrappers_are_not_values() {
    let transcoder = Transcoder::new();
    let single = TypeDescriptor::single(i32::descriptor());
    assert!(matches!(
        transcoder.describe(&single).unwrap_err(),
        TranscodeError::TypeResolution { .. }
    ));
    let continuation = TypeDescriptor::continuation(i32::descriptor());
    assert!(transcoder.match_rule(&continuation).is_err());
}
