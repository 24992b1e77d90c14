use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ModelClient, ModelRequest, ModelResponse};
use crate::error::ModelError;

/// Replays queued responses in order and records every request it receives.
///
/// Once the queue is drained the client keeps returning the fallback response, or
/// `ModelError::Exhausted` when none was set.
pub struct MockModelClient {
    responses: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    fallback: Option<ModelResponse>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl MockModelClient {
    pub fn new(responses: Vec<Result<ModelResponse, ModelError>>) -> Self {
        MockModelClient {
            responses: Mutex::new(responses.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same text
    pub fn replying(text: impl Into<String>) -> Self {
        MockModelClient::new(Vec::new()).with_fallback(ModelResponse::text(text))
    }

    pub fn with_fallback(mut self, response: ModelResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<ModelRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        self.requests.lock().push(request.clone());
        match self.responses.lock().pop_front() {
            Some(result) => result,
            None => self.fallback.clone().ok_or(ModelError::Exhausted),
        }
    }
}
