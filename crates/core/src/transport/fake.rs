//! Fake transport for exercising sessions and entities without a network.
//!
//! # Example
//!
//! ```ignore
//! let (transport, controller) = FakeTransportBuilder::new().build();
//! let session = Session::with_transport(ForumConfig::default(), transport);
//!
//! controller.push_html("<html>...</html>");
//! let topic = Topic::new(5).update_in(&session, None, Kwargs::new())?;
//!
//! let sent = controller.take_sent();
//! assert_eq!(sent.len(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::{Error, Result};

#[derive(Default)]
struct Shared {
    responses: VecDeque<HttpResponse>,
    sent: Vec<HttpRequest>,
}

/// Builder for creating fake transport instances.
#[derive(Default)]
pub struct FakeTransportBuilder {
    responses: VecDeque<HttpResponse>,
}

impl FakeTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response before the transport is built.
    pub fn respond(mut self, response: HttpResponse) -> Self {
        self.responses.push_back(response);
        self
    }

    /// Builds the transport and the controller that scripts it.
    pub fn build(self) -> (FakeTransport, FakeTransportController) {
        let shared = Arc::new(Mutex::new(Shared {
            responses: self.responses,
            sent: Vec::new(),
        }));
        (
            FakeTransport {
                shared: Arc::clone(&shared),
            },
            FakeTransportController { shared },
        )
    }
}

/// Transport that answers from a queue of scripted responses.
///
/// Sending with an empty queue is a [`Error::Transport`], so a test fails
/// loudly when code makes more requests than expected.
pub struct FakeTransport {
    shared: Arc<Mutex<Shared>>,
}

impl Transport for FakeTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut shared = self.shared.lock();
        shared.sent.push(request.clone());
        let mut response = shared
            .responses
            .pop_front()
            .ok_or_else(|| Error::Transport(format!("no response queued for {} {}", request.method, request.url)))?;
        if response.url.is_empty() {
            response.url = request.url.clone();
        }
        Ok(response)
    }
}

/// Queues responses and inspects what was sent.
#[derive(Clone)]
pub struct FakeTransportController {
    shared: Arc<Mutex<Shared>>,
}

impl FakeTransportController {
    /// Queues a response for the next request.
    pub fn push(&self, response: HttpResponse) {
        self.shared.lock().responses.push_back(response);
    }

    /// Queues a `200 OK` with `body`. The URL is filled in from the request.
    pub fn push_html(&self, body: impl Into<String>) {
        self.push(HttpResponse::ok("", body));
    }

    /// Takes all sent requests, clearing the buffer.
    pub fn take_sent(&self) -> Vec<HttpRequest> {
        std::mem::take(&mut self.shared.lock().sent)
    }

    /// Number of requests sent so far.
    pub fn sent_count(&self) -> usize {
        self.shared.lock().sent.len()
    }

    /// Number of scripted responses not consumed yet.
    pub fn pending(&self) -> usize {
        self.shared.lock().responses.len()
    }
}
