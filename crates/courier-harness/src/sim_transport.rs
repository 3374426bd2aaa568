//! Loopback direct transport.

use std::sync::{Mutex, PoisonError};

use courier_core::{collaborators::DirectWebRequestHandler, error::TransportError};
use courier_proto::{HttpRequest, HttpResponse, StatusCode};
use tracing::trace;

type Responder = dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Direct transport that answers in-process and records every request.
///
/// The responder closure plays the remote party. It typically feeds the
/// request to a second channel's `read_from_request` and writes the answer
/// back with `send`, so both ends of a direct exchange run in one test.
pub struct LoopbackTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl LoopbackTransport {
    /// Transport answering with `responder`
    pub fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self { responder: Box::new(responder), requests: Mutex::new(Vec::new()) }
    }

    /// Transport that always answers with `status` and `body`
    pub fn replying(status: StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::new(move |_| Ok(HttpResponse::new(status, body.clone())))
    }

    /// Transport that always fails with a connection error
    pub fn unreachable() -> Self {
        Self::new(|request| {
            Err(TransportError::Connection {
                url: request.url.to_string(),
                reason: "connection refused".to_string(),
            })
        })
    }

    /// Every request executed so far, oldest first
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Most recent request
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }

    /// Number of requests executed
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl DirectWebRequestHandler for LoopbackTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        trace!(method = %request.method, url = %request.url, "loopback request");
        let response = (self.responder)(&request);
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);
        response
    }
}
