//! Request descriptors.

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;

use crate::error::{ClientError, Result};

/// Request payload.
#[derive(Debug, Clone)]
pub enum Body {
    /// Structured value, serialized as JSON by the client.
    Json(serde_json::Value),
    /// Pre-encoded payload (binary, form, file contents) sent as-is.
    Raw(Bytes),
}

impl Body {
    /// Build a JSON body from any serializable value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(ClientError::Serialize)
    }
}

/// Whether the cookie jar accompanies the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Credentials {
    /// Send stored cookies and accept new ones.
    #[default]
    Include,
    /// Send without cookies.
    Omit,
}

/// Options for a single call to [`crate::Client::request`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tgsim_client::{Body, RequestOptions};
/// use serde_json::json;
///
/// let options = RequestOptions::post()
///     .body(Body::Json(json!({ "name": "Bot1" })))
///     .header("X-Request-Source", "cli")
///     .timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// HTTP method.
    pub method: Method,
    /// Extra headers, merged with the credential header.
    pub headers: Vec<(String, String)>,
    /// Optional payload.
    pub body: Option<Body>,
    /// Per-request deadline; overrides the client default.
    pub timeout: Option<Duration>,
    /// External cancellation.
    pub signal: Option<AbortSignal>,
    /// Cookie handling.
    pub credentials: Credentials,
}

impl RequestOptions {
    /// `GET` request with no body.
    pub fn get() -> Self {
        Self::default()
    }

    /// `POST` request.
    pub fn post() -> Self {
        Self::default().method(Method::POST)
    }

    /// `PUT` request.
    pub fn put() -> Self {
        Self::default().method(Method::PUT)
    }

    /// `PATCH` request.
    pub fn patch() -> Self {
        Self::default().method(Method::PATCH)
    }

    /// `DELETE` request.
    pub fn delete() -> Self {
        Self::default().method(Method::DELETE)
    }

    /// Set the method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the deadline.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation signal.
    #[must_use]
    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Set cookie handling.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Owner side of a cancellation signal.
///
/// # Example
///
/// ```
/// use tgsim_client::AbortController;
///
/// let controller = AbortController::new();
/// let signal = controller.signal();
/// assert!(!signal.is_aborted());
///
/// controller.abort();
/// assert!(signal.is_aborted());
/// ```
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<bool>,
}

impl AbortController {
    /// Create a controller that has not fired.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Get a signal to hand to requests.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// Whether the controller has fired.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the controller fires.
    ///
    /// Never resolves if the controller is dropped without firing.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
