use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{ChatChoice, ChatClient, ChatMessage, ChatRequest, ChatResponse, ChatUsage};
use crate::core::ChatError;

/// Answer of a [`MockChatClient`] with nothing scripted.
pub const MOCK_ANSWER: &str = "Hello, I am a chatbot. I am here to help you.";

type Responder = dyn Fn(&ChatRequest) -> Result<String, ChatError> + Send + Sync;

/// In-process chat client for tests and demos.
///
/// Scripted responses are served first, in order. After that, the responder
/// closure answers if one is set; otherwise every call gets [`MOCK_ANSWER`].
/// Every request is recorded.
#[derive(Default)]
pub struct MockChatClient {
    scripted: Mutex<VecDeque<Result<ChatResponse, ChatError>>>,
    responder: Option<Box<Responder>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::new();
        for answer in answers {
            client.push_answer(answer);
        }
        client
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<String, ChatError> + Send + Sync + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    pub fn push_answer(&self, answer: impl Into<String>) {
        self.push_response(ChatResponse::from_answer("mock", answer));
    }

    pub fn push_response(&self, response: ChatResponse) {
        lock(&self.scripted).push_back(Ok(response));
    }

    pub fn push_error(&self, error: ChatError) {
        lock(&self.scripted).push_back(Err(error));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        lock(&self.requests).last().cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn default_response() -> ChatResponse {
    ChatResponse {
        id: "cmpl-3KJYz4J5jzv5J".to_string(),
        object: "text_completion".to_string(),
        created: 1627896549,
        model: "davinci:2020-05-03".to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage::assistant(MOCK_ANSWER),
            finish_reason: Some("stop".to_string()),
        }],
        usage: Some(ChatUsage {
            prompt_tokens: 7,
            completion_tokens: 7,
            total_tokens: 14,
        }),
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        lock(&self.requests).push(request.clone());

        let scripted = lock(&self.scripted).pop_front();
        if let Some(scripted) = scripted {
            return scripted;
        }
        match &self.responder {
            Some(responder) => {
                responder(&request).map(|answer| ChatResponse::from_answer(request.model, answer))
            }
            None => Ok(default_response()),
        }
    }
}
