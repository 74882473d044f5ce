//! Recording executor for unit tests

use super::executor::{HttpRequest, RawResponse, RequestExecutor};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&HttpRequest) -> Result<RawResponse> + Send + Sync>;

/// Answers requests from a closure and records every request it sees
pub(crate) struct MockExecutor {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockExecutor {
    pub(crate) fn new<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<RawResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far, in order
    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RequestExecutor for MockExecutor {
    async fn execute(&self, request: HttpRequest) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(&request)
    }
}
