// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripted in-memory [`Transport`] for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{FailureKind, HttpRequest, Response, Transport, TransportFailure};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this response.
    Respond(Response),
    /// Fail without a response.
    Fail(TransportFailure),
}

/// Transport that replays queued replies in FIFO order and records every
/// request it was asked to send.
///
/// When the queue runs dry the exchange fails with [`FailureKind::NotSent`].
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Create a transport with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response (builder pattern).
    #[must_use]
    pub fn with_response(self, response: Response) -> Self {
        self.push(MockReply::Respond(response));
        self
    }

    /// Queue a transport failure (builder pattern).
    #[must_use]
    pub fn with_failure(self, failure: TransportFailure) -> Self {
        self.push(MockReply::Fail(failure));
        self
    }

    /// Append a reply to the queue.
    pub fn push(&self, reply: MockReply) {
        self.replies
            .lock()
            .expect("mock reply lock poisoned")
            .push_back(reply);
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("mock request lock poisoned")
            .clone()
    }

    /// Number of replies still queued.
    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("mock reply lock poisoned").len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<Response, TransportFailure> {
        self.requests
            .lock()
            .expect("mock request lock poisoned")
            .push(request);
        let next = self
            .replies
            .lock()
            .expect("mock reply lock poisoned")
            .pop_front();
        match next {
            Some(MockReply::Respond(response)) => Ok(response),
            Some(MockReply::Fail(failure)) => Err(failure),
            None => Err(TransportFailure::new(
                FailureKind::NotSent,
                "mock queue is empty",
            )),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
