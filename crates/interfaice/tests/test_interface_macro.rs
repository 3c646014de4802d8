use std::sync::Arc;

use futures::StreamExt;
use interfaice::{
    AiInterface, CustomRule, DecodeError, Deferred, ErrorKind, InvokeError, MockChatClient,
    ProxyFactory, ResponseStream, Transcode, ai_interface,
};

#[derive(Debug, PartialEq, Transcode)]
struct City {
    name: String,
    population: u64,
}

#[derive(Debug, thiserror::Error)]
enum GeoError {
    #[error("geography lookup failed")]
    Lookup(#[from] InvokeError),
}

#[ai_interface]
trait Geography {
    const PLANET: &'static str = "Earth";

    fn capital(&self, country: &str) -> Result<String, InvokeError>;

    #[ai_chat(model = "gpt-4o", description = "Largest cities first")]
    fn cities(&self, country: String, limit: u8) -> ResponseStream<City>;

    async fn population(&self, city: String) -> Result<u64, InvokeError>;

    fn area(&self, country: Option<String>) -> Deferred<f64>;

    fn is_capital(&self, city: String) -> Result<bool, GeoError>;

    fn borders(&self, country: String) -> anyhow::Result<Vec<String>>;

    fn greet(&self, name: &str) -> String {
        format!("Hello from {}, {name}", Self::PLANET)
    }
}

fn factory(client: &Arc<MockChatClient>) -> ProxyFactory {
    ProxyFactory::builder().client(client.clone()).build()
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
fn test_proxy_identity() {
    let client = Arc::new(MockChatClient::new());
    let geography: GeographyProxy = factory(&client).create();

    assert_eq!(GeographyProxy::NAME, "Geography");
    assert_eq!(geography.dispatcher().interface_name(), "Geography");
    assert_eq!(geography.dispatcher().default_model(), "gpt-3.5-turbo");
    assert!(format!("{geography:?}").starts_with("GeographyProxy"));
}

#[test]
fn test_blocking_method() {
    let client = Arc::new(MockChatClient::with_answers(["Seoul"]));
    let geography: GeographyProxy = factory(&client).create();

    assert_eq!(geography.capital("Korea").unwrap(), "Seoul");

    let request = client.last_request().unwrap();
    assert_eq!(request.model, "gpt-3.5-turbo");
    assert!(request.messages[0].content.contains("`Geography` interface"));
    assert!(request.messages[0].content.contains("response format: a string literal"));
    assert!(request.messages[1].content.contains("name = capital"));
    assert!(request.messages[1].content.contains("country = Korea"));
    assert!(request.messages[1].content.contains("return type = String"));
}

#[tokio::test]
async fn test_stream_method_with_chat_metadata() {
    let client = Arc::new(MockChatClient::with_answers([r#"[
        {"name": "Seoul", "population": 9500000},
        {"name": "Busan", "population": 3300000}
    ]"#]));
    let geography: GeographyProxy = factory(&client).create();

    let cities: Vec<City> = geography
        .cities("Korea".to_string(), 2)
        .map(Result::unwrap)
        .collect()
        .await;
    assert_eq!(
        cities,
        vec![
            City {
                name: "Seoul".to_string(),
                population: 9_500_000,
            },
            City {
                name: "Busan".to_string(),
                population: 3_300_000,
            },
        ]
    );

    let request = client.last_request().unwrap();
    assert_eq!(request.model, "gpt-4o");
    assert!(request.messages[1].content.contains("limit = 2"));
    assert!(request.messages[1].content.contains("return type = Vec<City>"));
    assert!(request.messages[1].content.contains("description = Largest cities first"));
}

#[tokio::test]
async fn test_async_method_suspends() {
    let client = Arc::new(MockChatClient::with_answers(["9500000"]));
    let geography: GeographyProxy = factory(&client).create();

    assert_eq!(geography.population("Seoul".to_string()).await.unwrap(), 9_500_000);
    let request = client.last_request().unwrap();
    assert!(!request.messages[1].content.contains("continuation"));
    assert!(request.messages[1].content.contains("return type = u64"));
}

#[tokio::test]
async fn test_deferred_method() {
    let client = Arc::new(MockChatClient::with_answers(["100210.5"]));
    let geography: GeographyProxy = factory(&client).create();

    let area = geography.area(None);
    assert!(client.requests().is_empty());
    assert_eq!(area.await.unwrap(), 100_210.5);
    assert!(client.last_request().unwrap().messages[1]
        .content
        .contains("country = NULL"));
}

#[test]
fn test_caller_error_types() {
    let client = Arc::new(MockChatClient::with_answers(["maybe", "Korea"]));
    let geography: GeographyProxy = factory(&client).create();

    let GeoError::Lookup(err) = geography.is_capital("Seoul".to_string()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    let err = geography.borders("Korea".to_string()).unwrap_err();
    let err = err.downcast_ref::<InvokeError>().unwrap();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.method(), "borders");
}

#[test]
fn test_default_methods_are_not_proxied() {
    let client = Arc::new(MockChatClient::new());
    let geography: GeographyProxy = factory(&client).create();

    assert_eq!(geography.greet("Kim"), "Hello from Earth, Kim");
    assert!(client.requests().is_empty());
}

#[test]
fn test_custom_rules_are_frozen_at_creation() {
    let client = Arc::new(MockChatClient::with_answers(["true", "yes"]));
    let mut factory = factory(&client);
    let before: GeographyProxy = factory.create();
    factory.add_custom_rules([yes_no()]);
    let after: GeographyProxy = factory.create();

    assert!(before.is_capital("Seoul".to_string()).unwrap());
    assert!(client.last_request().unwrap().messages[0]
        .content
        .contains("a boolean literal"));

    assert!(after.is_capital("Seoul".to_string()).unwrap());
    assert!(client.last_request().unwrap().messages[0]
        .content
        .contains("response format: yes or no"));
    assert_eq!(factory.custom_rules().len(), 1);
}

#[test]
fn test_factory_default_model() {
    let client = Arc::new(MockChatClient::with_answers(["Tokyo"]));
    let geography: GeographyProxy = ProxyFactory::builder()
        .client(client.clone())
        .default_model("local-llama")
        .build()
        .create();

    assert_eq!(geography.capital("Japan").unwrap(), "Tokyo");
    assert_eq!(client.last_request().unwrap().model, "local-llama");
}
