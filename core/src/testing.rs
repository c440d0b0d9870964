//! In-memory executor for exercising the pipeline without a network.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::executor::Executor;
use crate::http::{HttpRequest, HttpResponse, TransportError};

/// Replays queued outcomes in order and records every request it receives.
///
/// Once the queue is drained every further call fails with a transport error.
#[derive(Debug, Default)]
pub struct StubExecutor {
    outcomes: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with the given status and body.
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.respond_with_headers(status, Vec::new(), body)
    }

    pub fn respond_with_headers(
        self,
        status: u16,
        headers: Vec<(String, String)>,
        body: impl Into<String>,
    ) -> Self {
        self.push(Ok(HttpResponse {
            status,
            headers,
            body: body.into(),
        }));
        self
    }

    /// Queue a transport failure.
    pub fn fail(self, error: TransportError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, outcome: Result<HttpResponse, TransportError>) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Every request executed so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Executor for StubExecutor {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("no stubbed response left")))
    }
}
