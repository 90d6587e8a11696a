//! A scripted in-memory [`HttpClient`] for tests.
//!
//! Declare the requests a test expects, in order, together with the
//! response each one gets. Requests that do not match the next expectation
//! fail with a [`TransportError`]; [`MockBackend::verify`] panics if any
//! expectation was left unused.
//!
//! Compiled for the crate's own tests and behind the `test_utils` feature.
//!
//! ```rust
//! use restrecord_engine::testing::MockBackend;
//! use restrecord_engine::{RecordType, SyncOptions, Verb};
//! use serde_json::json;
//!
//! let backend = MockBackend::new();
//! backend.expect(Verb::Get, "/users/1").respond(json!({"id": 1, "name": "Ann"}));
//!
//! let users = RecordType::builder("User")
//!     .url_root("/users")
//!     .client(backend.clone())
//!     .build();
//!
//! let user = futures::executor::block_on(users.fetch_one(1, SyncOptions::new())).unwrap();
//! assert_eq!(user.get("name"), Some(&json!("Ann")));
//! backend.verify();
//! ```

use crate::transport::{HttpClient, HttpRequest, HttpResponse, TransportError};
use crate::Verb;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Expectation {
    verb: Verb,
    url: String,
    body: Option<Value>,
    reply: std::result::Result<HttpResponse, TransportError>,
}

#[derive(Default)]
struct State {
    expected: VecDeque<Expectation>,
    received: Vec<HttpRequest>,
}

/// Scripted transport. Share it between the record type and the test via
/// `Arc`.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Expect a request with this verb and URL next.
    pub fn expect(&self, verb: Verb, url: impl Into<String>) -> Expect<'_> {
        Expect {
            backend: self,
            verb,
            url: url.into(),
            body: None,
        }
    }

    /// Every request received so far, matched or not.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().received.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().received.len()
    }

    /// Number of expectations not yet consumed.
    pub fn pending(&self) -> usize {
        self.lock().expected.len()
    }

    /// Panic if an expectation was never met.
    pub fn verify(&self) {
        let state = self.lock();
        if let Some(next) = state.expected.front() {
            panic!(
                "unsatisfied request expectation: {} {} ({} outstanding)",
                next.verb,
                next.url,
                state.expected.len()
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn answer(&self, request: HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let mut state = self.lock();
        state.received.push(request.clone());

        let Some(next) = state.expected.pop_front() else {
            return Err(TransportError::new(format!(
                "unexpected request: {} {}",
                request.verb, request.url
            )));
        };
        if next.verb != request.verb || next.url != request.url {
            return Err(TransportError::new(format!(
                "expected {} {}, got {} {}",
                next.verb, next.url, request.verb, request.url
            )));
        }
        if let Some(body) = &next.body {
            if request.data.as_ref() != Some(body) {
                return Err(TransportError::new(format!(
                    "unexpected body for {} {}: {}",
                    request.verb,
                    request.url,
                    request.data.unwrap_or(Value::Null)
                )));
            }
        }
        next.reply
    }
}

impl HttpClient for MockBackend {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(future::ready(self.answer(request)))
    }
}

/// A pending expectation, finished by one of the `respond` methods.
pub struct Expect<'a> {
    backend: &'a MockBackend,
    verb: Verb,
    url: String,
    body: Option<Value>,
}

impl Expect<'_> {
    /// Also require this exact JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Answer `200` with `data`.
    pub fn respond(self, data: Value) {
        self.finish(Ok(HttpResponse::ok(data)));
    }

    pub fn respond_with(self, status: u16, data: Value) {
        self.finish(Ok(HttpResponse::new(status, data)));
    }

    /// Reject the request.
    pub fn fail(self, error: TransportError) {
        self.finish(Err(error));
    }

    fn finish(self, reply: std::result::Result<HttpResponse, TransportError>) {
        self.backend.lock().expected.push_back(Expectation {
            verb: self.verb,
            url: self.url,
            body: self.body,
            reply,
        });
    }
}
