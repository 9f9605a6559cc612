//! HTTP transport abstraction.
//!
//! [`HttpTransport`] is the single network seam of the crate, so tests can
//! swap in a mock and check exactly which URLs are requested.

use std::fmt;
use std::time::Duration;

/// User-Agent sent with every request.
const USER_AGENT: &str = concat!("opentopo-dem/", env!("CARGO_PKG_VERSION"));

/// Longest timeout handed to the HTTP client (one year).
///
/// reqwest adds the timeout to `Instant::now()`, which panics on overflow.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Reason phrase, when known.
    pub reason: Option<String>,
    /// Complete response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A response with a status code and body and no reason phrase.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: None,
            body: body.into(),
        }
    }

    /// 4xx and 5xx responses.
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Broad category of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The timeout elapsed before the response completed.
    Timeout,
    /// DNS resolution or connection establishment failed.
    Connect,
    /// Anything else (TLS, protocol, body read, client setup).
    Other,
}

/// A request that produced no HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Failure category.
    pub kind: TransportErrorKind,
    /// Description of the underlying cause.
    pub message: String,
}

impl TransportError {
    /// Create an error of the given kind.
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Blocking HTTP GET.
pub trait HttpTransport: Send + Sync {
    /// Perform a GET and buffer the whole body.
    ///
    /// Error statuses are returned as responses, not as errors; only failures
    /// that produce no response at all become a [`TransportError`].
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for &T {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError> {
        (**self).get(url, timeout)
    }
}

impl<T: HttpTransport + ?Sized> HttpTransport for Box<T> {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError> {
        (**self).get(url, timeout)
    }
}

/// Production transport on `reqwest::blocking`.
///
/// Idle connections are not kept, so a connection never outlives the call
/// that opened it.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build a transport with the default client settings.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| {
                TransportError::new(
                    TransportErrorKind::Other,
                    format!("Failed to create HTTP client: {}", e),
                )
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout.min(MAX_TIMEOUT))
            .send()
            .map_err(|e| classify(&e, "Request failed"))?;

        let status = response.status();
        let body = response
            .bytes()
            .map_err(|e| classify(&e, "Failed to read response"))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body: body.to_vec(),
        })
    }
}

/// Map a reqwest error onto a transport error kind.
fn classify(err: &reqwest::Error, context: &str) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    // reqwest's Display stops at the outermost layer; the cause chain holds
    // the DNS/TLS/IO detail.
    let mut message = format!("{}: {}", context, err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = std::error::Error::source(cause);
    }
    TransportError::new(kind, message)
}
