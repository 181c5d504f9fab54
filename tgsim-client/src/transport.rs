//! HTTP transport abstraction.
//!
//! The client prepares a fully-resolved [`TransportRequest`] and hands it to
//! a [`Transport`]. Production uses [`ReqwestTransport`]; tests use
//! [`MockTransport`] to script replies and inspect what was sent.

use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ClientError, Result, TransportError};
use crate::request::Credentials;

/// A request ready to go on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Final header set, credential included.
    pub headers: HeaderMap,
    /// Encoded body.
    pub body: Option<Bytes>,
    /// Cookie handling.
    pub credentials: Credentials,
}

/// A received HTTP response with its body fully read.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create a response. Invalid status codes become 500.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Create a JSON response.
    pub fn json_value(status: u16, value: &serde_json::Value) -> Self {
        let mut response = Self::new(status, value.to_string());
        response.headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        response
    }

    /// Status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body.
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(ClientError::Deserialize)
    }
}

/// Future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<Response, TransportError>> + Send + 'a>>;

/// Provider trait for HTTP round-trips.
///
/// Dropping the returned future must cancel the in-flight call.
pub trait Transport: Send + Sync {
    /// Perform one request.
    fn send(&self, request: TransportRequest) -> TransportFuture<'_>;

    /// Check if this is a mock transport.
    fn is_mock(&self) -> bool;
}

/// Transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    with_cookies: reqwest::Client,
    without_cookies: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the underlying HTTP clients.
    pub fn new() -> std::result::Result<Self, TransportError> {
        Ok(Self {
            with_cookies: reqwest::Client::builder().cookie_store(true).build()?,
            without_cookies: reqwest::Client::builder().build()?,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
        let http = match request.credentials {
            Credentials::Include => &self.with_cookies,
            Credentials::Omit => &self.without_cookies,
        };

        Box::pin(async move {
            let mut builder = http
                .request(request.method, &request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            Ok(Response {
                status,
                headers,
                body,
            })
        })
    }

    fn is_mock(&self) -> bool {
        false
    }
}

/// Scripted outcome for one [`MockTransport`] call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Answer with this response.
    Respond(Response),
    /// Fail at the transport level.
    Fail(TransportError),
    /// Never answer; the call only ends when the caller drops it.
    Hang,
}

/// Mock transport for testing.
///
/// Replies are consumed in order; once the queue is empty the `otherwise`
/// reply (if any) is used for every further call.
///
/// # Example
///
/// ```
/// use tgsim_client::{MockTransport, Response};
/// use serde_json::json;
///
/// let mock = MockTransport::new()
///     .respond(Response::json_value(200, &json!([])))
///     .respond(Response::new(404, "Not found"));
/// assert_eq!(mock.request_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    otherwise: Mutex<Option<MockReply>>,
    requests: Mutex<Vec<TransportRequest>>,
    cancelled: Arc<AtomicUsize>,
}

impl MockTransport {
    /// Create a mock with no replies queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn reply(self, reply: MockReply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Queue a response.
    pub fn respond(self, response: Response) -> Self {
        self.reply(MockReply::Respond(response))
    }

    /// Queue a transport failure.
    pub fn fail(self, error: TransportError) -> Self {
        self.reply(MockReply::Fail(error))
    }

    /// Queue a call that never completes.
    pub fn hang(self) -> Self {
        self.reply(MockReply::Hang)
    }

    /// Reply used once the queue is exhausted.
    pub fn otherwise(self, reply: MockReply) -> Self {
        *self.otherwise.lock() = Some(reply);
        self
    }

    /// Queue a reply on a shared mock.
    pub fn push_reply(&self, reply: MockReply) {
        self.replies.lock().push_back(reply);
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    /// The most recent request.
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().last().cloned()
    }

    /// Number of requests seen.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of hanging calls that were cancelled by dropping them.
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> MockReply {
        if let Some(reply) = self.replies.lock().pop_front() {
            return reply;
        }
        self.otherwise.lock().clone().unwrap_or_else(|| {
            MockReply::Fail(TransportError::Connection(
                "no mock reply queued".to_string(),
            ))
        })
    }
}

impl Transport for MockTransport {
    fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
        self.requests.lock().push(request);
        let reply = self.next_reply();
        let cancelled = Arc::clone(&self.cancelled);

        Box::pin(async move {
            match reply {
                MockReply::Respond(response) => Ok(response),
                MockReply::Fail(error) => Err(error),
                MockReply::Hang => {
                    let _guard = CancelGuard(cancelled);
                    std::future::pending().await
                }
            }
        })
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// Counts a hanging call as cancelled when its future is dropped.
struct CancelGuard(Arc<AtomicUsize>);

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
