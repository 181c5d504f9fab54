//! Core tgsim client implementation.

use crate::error::{ClientError, Result};
use crate::request::{Body, RequestOptions};
use crate::transport::{ReqwestTransport, Response, Transport, TransportRequest};
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tgsim_core::config::{AuthScheme, ClientConfig};
use tgsim_core::providers::{ClockProvider, ConnectivityProvider, RealClock, RealConnectivity};
use tgsim_core::session::SessionStore;

const API_KEY_HEADER: &str = "x-api-key";

/// A client for the chat-simulation backend API.
///
/// Every request carries the credential held by the injected
/// [`SessionStore`]. A 401 answer clears that credential, so later calls
/// fail fast with [`ClientError::MissingCredential`] until a new one is set.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tgsim_client::Client;
/// use tgsim_core::providers::MemoryStore;
/// use tgsim_core::session::SessionStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = SessionStore::new(Arc::new(MemoryStore::new()));
/// session.set("my-secret-key")?;
///
/// let client = Client::new("http://localhost:8000/api", session)?
///     .with_timeout(Duration::from_secs(30));
///
/// let bots = client.list_bots().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    /// Base URL for the backend.
    base_url: String,
    /// HTTP transport.
    transport: Arc<dyn Transport>,
    /// Session credential.
    session: SessionStore,
    /// Offline detection.
    connectivity: Arc<dyn ConnectivityProvider>,
    /// Timer source for request deadlines.
    clock: Arc<dyn ClockProvider>,
    /// How the credential is presented.
    auth_scheme: AuthScheme,
    /// Deadline applied when a request sets none.
    default_timeout: Option<Duration>,
}

impl Client {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the backend (e.g., "http://localhost:8000/api")
    /// * `session` - Store holding the API credential
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Result<Self> {
        let base_url = base_url.into();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let transport = ReqwestTransport::new().map_err(ClientError::Network)?;

        Ok(Self {
            base_url,
            transport: Arc::new(transport),
            session,
            connectivity: Arc::new(RealConnectivity::new()),
            clock: Arc::new(RealClock::new()),
            auth_scheme: AuthScheme::default(),
            default_timeout: None,
        })
    }

    /// Create a client from loaded configuration.
    pub fn from_config(config: &ClientConfig, session: SessionStore) -> Result<Self> {
        let client = Self::new(config.api_url.clone(), session)?.with_auth_scheme(config.auth_scheme);
        Ok(match config.request_timeout {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        })
    }

    /// Replace the HTTP transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the clock used for deadlines.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockProvider>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the connectivity provider.
    #[must_use]
    pub fn with_connectivity(mut self, connectivity: Arc<dyn ConnectivityProvider>) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Choose how the credential is sent.
    #[must_use]
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    /// Set a default deadline for requests that carry none.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The session store this client reads the credential from.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Build a full URL from a path.
    fn url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Merge caller headers with content type and credential headers.
    fn headers(
        &self,
        api_key: &str,
        extra: &[(String, String)],
        json_body: bool,
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        for (name, value) in extra {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ClientError::InvalidRequest(format!("invalid header name '{}': {}", name, e))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                ClientError::InvalidRequest(format!("invalid value for header '{}': {}", name, e))
            })?;
            headers.append(header_name, header_value);
        }

        if json_body && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let (name, value) = match self.auth_scheme {
            AuthScheme::ApiKey => (HeaderName::from_static(API_KEY_HEADER), api_key.to_string()),
            AuthScheme::Bearer => (AUTHORIZATION, format!("Bearer {}", api_key)),
        };
        let mut value = HeaderValue::from_str(&value).map_err(|_| {
            ClientError::InvalidRequest("stored API key is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        headers.insert(name, value);

        Ok(headers)
    }

    /// Perform one authenticated request.
    ///
    /// Returns the response for any 2xx status; the caller decides how to
    /// read the body. Every other outcome is a [`ClientError`]:
    ///
    /// - no credential configured: [`ClientError::MissingCredential`]
    /// - platform offline: [`ClientError::Offline`], nothing is sent
    /// - deadline elapsed: [`ClientError::Timeout`], the call is cancelled
    /// - signal fired: [`ClientError::Aborted`], the call is cancelled
    /// - transport failure: [`ClientError::Network`]
    /// - non-2xx: [`ClientError::Api`] with the body text; a 401 also
    ///   clears the stored credential
    ///
    /// No retries are attempted.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Response> {
        let Some(api_key) = self.session.get() else {
            return Err(ClientError::MissingCredential);
        };

        if !self.connectivity.is_online() {
            tracing::debug!(path, "Offline, not sending request");
            return Err(ClientError::Offline);
        }

        let RequestOptions {
            method,
            headers,
            body,
            timeout,
            signal,
            credentials,
        } = options;

        if signal.as_ref().is_some_and(|s| s.is_aborted()) {
            return Err(ClientError::Aborted);
        }

        let (body, json_body) = match body {
            Some(Body::Json(value)) => {
                let encoded = serde_json::to_vec(&value).map_err(ClientError::Serialize)?;
                (Some(Bytes::from(encoded)), true)
            }
            Some(Body::Raw(bytes)) => (Some(bytes), false),
            None => (None, false),
        };

        let request = TransportRequest {
            method: method.clone(),
            url: self.url(path),
            headers: self.headers(&api_key, &headers, json_body)?,
            body,
            credentials,
        };

        tracing::debug!(%method, path, "Sending request");

        let deadline = timeout.or(self.default_timeout);
        let clock = Arc::clone(&self.clock);
        let timer = async move {
            match deadline {
                Some(limit) => {
                    clock.sleep(limit).await;
                    limit
                }
                None => std::future::pending().await,
            }
        };
        let aborted = async {
            match &signal {
                Some(signal) => signal.aborted().await,
                None => std::future::pending().await,
            }
        };

        let response = tokio::select! {
            result = self.transport.send(request) => result.map_err(|e| {
                tracing::debug!(%method, path, error = %e, "Transport failed");
                ClientError::Network(e)
            })?,
            limit = timer => {
                tracing::debug!(%method, path, timeout_ms = limit.as_millis() as u64, "Request timed out");
                return Err(ClientError::Timeout(limit));
            }
            () = aborted => {
                tracing::debug!(%method, path, "Request aborted");
                return Err(ClientError::Aborted);
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.as_u16() == 401 {
            tracing::warn!(path, "Credential rejected by backend, clearing session");
            self.session.clear();
        } else {
            tracing::debug!(%method, path, status = status.as_u16(), "Request failed");
        }

        Err(ClientError::Api {
            status: status.as_u16(),
            body: response.text(),
        })
    }

    /// Execute a GET request and parse the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(path, RequestOptions::get()).await?.json()
    }

    /// Execute a POST request with a JSON body and parse the JSON reply.
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let options = RequestOptions::post().body(Body::json(body)?);
        self.request(path, options).await?.json()
    }

    /// Execute a DELETE request, ignoring any body.
    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        self.request(path, RequestOptions::delete()).await.map(|_| ())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("auth_scheme", &self.auth_scheme)
            .field("default_timeout", &self.default_timeout)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
