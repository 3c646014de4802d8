use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use interfaice::{
    Call, ChatError, Continuation, Deferred, Describe, Dispatcher, ErrorKind, InvokeError,
    MOCK_ANSWER, MethodSignature, MockChatClient, ResponseStream, Role, TranscodeError,
    TypeDescriptor,
};

fn dispatcher(client: &Arc<MockChatClient>) -> Dispatcher {
    Dispatcher::builder()
        .interface_name("Geography")
        .client(client.clone())
        .build()
}

fn capital(country: &str) -> Call {
    let signature = MethodSignature::new("capital")
        .parameter("country", String::descriptor())
        .returns(String::descriptor());
    Call::new(signature).argument(country)
}

fn population(city: &str) -> Call {
    let signature = MethodSignature::new("population")
        .parameter("city", String::descriptor())
        .parameter("continuation", Continuation::<u64>::descriptor());
    Call::new(signature).argument(city)
}

fn cities(country: &str) -> Call {
    let signature = MethodSignature::new("cities")
        .parameter("country", String::descriptor())
        .returns(ResponseStream::<String>::descriptor());
    Call::new(signature).argument(country)
}

#[test]
fn test_blocking_outside_runtime() {
    let client = Arc::new(MockChatClient::with_answers(["Seoul"]));
    let answer: String = dispatcher(&client).invoke_blocking(capital("Korea")).unwrap();
    assert_eq!(answer, "Seoul");

    let request = client.last_request().unwrap();
    assert_eq!(request.model, "gpt-3.5-turbo");
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[0].role, Role::System);
    assert!(request.messages[0].content.contains("`Geography` interface"));
    assert!(request.messages[1].content.contains("country = Korea"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_blocking_inside_multi_thread_runtime() {
    let client = Arc::new(MockChatClient::with_answers(["Seoul"]));
    let answer: String = dispatcher(&client).invoke_blocking(capital("Korea")).unwrap();
    assert_eq!(answer, "Seoul");
}

#[tokio::test]
async fn test_blocking_inside_current_thread_runtime() {
    let client = Arc::new(MockChatClient::with_answers(["Tokyo"]));
    let answer: String = dispatcher(&client).invoke_blocking(capital("Japan")).unwrap();
    assert_eq!(answer, "Tokyo");
}

#[tokio::test]
async fn test_async_core() {
    let client = Arc::new(MockChatClient::with_answers(["```\nSeoul\n```"]));
    let answer: String = dispatcher(&client).invoke(capital("Korea")).await.unwrap();
    assert_eq!(answer, "Seoul");
}

#[tokio::test]
async fn test_suspending_convention() {
    let client = Arc::new(MockChatClient::with_answers([" 9500000\n"]));
    let (continuation, completion) = Continuation::<u64>::channel("population");
    dispatcher(&client).suspend(population("Seoul"), continuation);
    assert_eq!(completion.await.unwrap(), 9_500_000);

    let request = client.last_request().unwrap();
    assert!(request.messages[1].content.contains("city = Seoul"));
    assert!(request.messages[1].content.contains("return type = u64"));
}

#[test]
fn test_suspending_outside_runtime() {
    let client = Arc::new(MockChatClient::with_answers(["42"]));
    let (continuation, completion) = Continuation::<u64>::channel("population");
    dispatcher(&client).suspend(population("Daegu"), continuation);
    assert_eq!(futures::executor::block_on(completion).unwrap(), 42);
}

#[tokio::test]
async fn test_dropped_continuation_cancels() {
    let (continuation, completion) = Continuation::<u64>::channel("population");
    drop(continuation);
    let err = completion.await.unwrap_err();
    assert!(matches!(
        err,
        InvokeError::Remote {
            source: ChatError::Cancelled,
            ..
        }
    ));
}

#[tokio::test]
async fn test_deferred_is_lazy() {
    let client = Arc::new(MockChatClient::with_answers(["12"]));
    let signature = MethodSignature::new("provinces")
        .parameter("country", String::descriptor())
        .returns(Deferred::<u8>::descriptor());
    let deferred: Deferred<u8> =
        dispatcher(&client).invoke_single(Call::new(signature).argument("Korea"));

    assert!(client.requests().is_empty());
    assert_eq!(deferred.await.unwrap(), 12);
    assert_eq!(client.requests().len(), 1);
}

#[tokio::test]
async fn test_stream_yields_elements_in_order() {
    let client = Arc::new(MockChatClient::with_answers([
        "```json\n[\"Seoul\", \"Busan\", \"Incheon\"]\n```",
    ]));
    let stream: ResponseStream<String> = dispatcher(&client).invoke_stream(cities("Korea"));
    let cities: Vec<String> = stream.map(Result::unwrap).collect().await;
    assert_eq!(cities, vec!["Seoul", "Busan", "Incheon"]);

    let request = client.last_request().unwrap();
    assert!(request.messages[0].content.contains("Json array with the following entry format:"));
}

#[tokio::test]
async fn test_stream_reports_bad_element_in_place() {
    let client = Arc::new(MockChatClient::with_answers(["[1, \"two\", 3]"]));
    let signature = MethodSignature::new("digits").returns(ResponseStream::<u8>::descriptor());
    let items: Vec<_> = dispatcher(&client)
        .invoke_stream::<u8>(Call::new(signature))
        .collect()
        .await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap(), &1);
    assert_eq!(items[1].as_ref().unwrap_err().kind(), ErrorKind::Decode);
    assert_eq!(items[2].as_ref().unwrap(), &3);
}

#[tokio::test]
async fn test_stream_requires_array() {
    let client = Arc::new(MockChatClient::with_answers(["Seoul, Busan"]));
    let items: Vec<_> = dispatcher(&client)
        .invoke_stream::<String>(cities("Korea"))
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    let Err(InvokeError::Decode { raw_response, .. }) = &items[0] else {
        panic!("expected a decode error");
    };
    assert_eq!(raw_response, "Seoul, Busan");
}

#[tokio::test]
async fn test_remote_error_on_every_convention() {
    let timeout = || ChatError::Timeout {
        after: Duration::from_secs(1),
    };
    let client = Arc::new(MockChatClient::new());
    for _ in 0..4 {
        client.push_error(timeout());
    }
    let dispatcher = dispatcher(&client);

    let err = dispatcher.invoke::<String>(capital("Korea")).await.unwrap_err();
    assert!(matches!(
        err,
        InvokeError::Remote {
            source: ChatError::Timeout { .. },
            ..
        }
    ));

    let (continuation, completion) = Continuation::<u64>::channel("population");
    dispatcher.suspend(population("Seoul"), continuation);
    assert_eq!(completion.await.unwrap_err().kind(), ErrorKind::RemoteCall);

    let signature = MethodSignature::new("area").returns(Deferred::<u32>::descriptor());
    let err = dispatcher
        .invoke_single::<u32>(Call::new(signature))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteCall);

    let items: Vec<_> = dispatcher.invoke_stream::<String>(cities("Korea")).collect().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap_err().kind(), ErrorKind::RemoteCall);
}

#[test]
fn test_blank_answer_is_remote_error() {
    let client = Arc::new(MockChatClient::with_answers(["  \n"]));
    let err = dispatcher(&client)
        .invoke_blocking::<String>(capital("Korea"))
        .unwrap_err();
    assert!(matches!(
        err,
        InvokeError::Remote {
            source: ChatError::EmptyResponse { .. },
            ..
        }
    ));
}

#[test]
fn test_decode_error_keeps_raw_answer() {
    let client = Arc::new(MockChatClient::with_answers(["maybe"]));
    let signature = MethodSignature::new("is_capital")
        .parameter("city", String::descriptor())
        .returns(bool::descriptor());
    let err = dispatcher(&client)
        .invoke_blocking::<bool>(Call::new(signature).argument("Seoul"))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(err.method(), "is_capital");
    let InvokeError::Decode {
        raw_response,
        source,
        ..
    } = err
    else {
        panic!("expected a decode error");
    };
    assert_eq!(raw_response, "maybe");
    assert!(matches!(source, TranscodeError::Decode(_)));
}

#[test]
fn test_unresolvable_return_type_sends_nothing() {
    let client = Arc::new(MockChatClient::new());
    let signature = MethodSignature::new("balance").returns(TypeDescriptor::opaque("bank::Money"));
    let err = dispatcher(&client)
        .invoke_blocking::<String>(Call::new(signature))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TypeResolution);
    assert!(client.requests().is_empty());
}

#[test]
fn test_argument_count_mismatch_is_introspection_error() {
    let client = Arc::new(MockChatClient::new());
    let signature = MethodSignature::new("capital")
        .parameter("country", String::descriptor())
        .returns(String::descriptor());
    let err = dispatcher(&client)
        .invoke_blocking::<String>(Call::new(signature))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Introspection);
}

#[test]
fn test_model_selection() {
    let client = Arc::new(MockChatClient::with_answers(["Seoul", "Seoul"]));
    let dispatcher = Dispatcher::builder()
        .interface_name("Geography")
        .client(client.clone())
        .default_model("local-model")
        .build();

    dispatcher.invoke_blocking::<String>(capital("Korea")).unwrap();
    assert_eq!(client.last_request().unwrap().model, "local-model");

    let signature = MethodSignature::new("capital")
        .parameter("country", String::descriptor())
        .returns(String::descriptor())
        .model("gpt-4o");
    dispatcher
        .invoke_blocking::<String>(Call::new(signature).argument("Korea"))
        .unwrap();
    assert_eq!(client.last_request().unwrap().model, "gpt-4o");
}

#[test]
fn test_unscripted_mock_answers_with_default_text() {
    let client = Arc::new(MockChatClient::new());
    let answer: String = dispatcher(&client).invoke_blocking(capital("Korea")).unwrap();
    assert_eq!(answer, MOCK_ANSWER);
}

#[test]
fn test_responder_sees_the_prompt() {
    let client = Arc::new(MockChatClient::with_responder(|request| {
        let user = &request.messages[1].content;
        Ok(if user.contains("country = Korea") { "Seoul" } else { "unknown" }.to_string())
    }));
    let dispatcher = dispatcher(&client);
    assert_eq!(dispatcher.invoke_blocking::<String>(capital("Korea")).unwrap(), "Seoul");
    assert_eq!(dispatcher.invoke_blocking::<String>(capital("France")).unwrap(), "unknown");
}

#[test]
fn test_response_format() {
    let client = Arc::new(MockChatClient::new());
    let format = dispatcher(&client)
        .response_format(
            &MethodSignature::new("count").returns(Deferred::<Option<u8>>::descriptor()),
        )
        .unwrap();
    assert_eq!(
        format,
        "a number literal ranging from 0 to 255, inclusive. (or NULL when there is no value)"
    );
}
