//! DEM retrieval from the OpenTopography global DEM endpoint.
//!
//! A request runs in a fixed order: validate the parameters, encode them onto
//! the base URL, issue one GET bounded by the timeout, then classify the
//! outcome. Nothing is retried or cached.

use crate::error::{DemError, ValidationError};
use crate::params::DemParams;
use crate::query::{build_url, redact_api_key};
use crate::transport::{
    HttpResponse, HttpTransport, ReqwestTransport, TransportError, TransportErrorKind, MAX_TIMEOUT,
};
use crate::Result;
use std::time::Duration;
use tracing::{debug, warn};

/// OpenTopography global DEM endpoint.
pub const BASE_URL: &str = "https://portal.opentopography.org/API/globaldem";

/// Timeout used when the caller does not give one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an error body copied into [`DemError::Remote`].
const MAX_REASON_BODY_CHARS: usize = 200;

/// Fetch DEM data for `params` from the global DEM endpoint.
///
/// `timeout` bounds the whole request; `None` means [`DEFAULT_TIMEOUT`].
/// Timeouts above [`MAX_TIMEOUT`] are capped to it.
/// Returns the response body unchanged (typically a GeoTIFF).
///
/// # Example
///
/// ```no_run
/// use opentopo_dem::{retrieve_dem, DemParams};
///
/// let params = DemParams::new()
///     .with("demtype", "SRTMGL3")
///     .with("south", -25.451567)
///     .with("north", -25.418431)
///     .with("west", -49.308291)
///     .with("east", -49.235979)
///     .with("outputFormat", "GTiff")
///     .with("API_Key", "demoapikeyot2022");
///
/// let tiff = retrieve_dem(&params, None)?;
/// std::fs::write("curitiba.tif", &tiff)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn retrieve_dem(params: &DemParams, timeout: Option<Duration>) -> Result<Vec<u8>> {
    let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
    // Reject bad input before a client (and its connection pool) exists.
    let timeout = check_request(params, timeout)?;
    let transport = ReqwestTransport::new().map_err(network_error)?;
    fetch(&transport, BASE_URL, params, timeout)
}

/// Same as [`retrieve_dem`], over a caller-supplied transport.
pub fn retrieve_dem_with<T: HttpTransport + ?Sized>(
    transport: &T,
    params: &DemParams,
    timeout: Option<Duration>,
) -> Result<Vec<u8>> {
    fetch(transport, BASE_URL, params, timeout.unwrap_or(DEFAULT_TIMEOUT))
}

/// Reusable retriever with a configurable endpoint, timeout and transport.
///
/// Holds no per-request state, so one instance can serve many threads.
pub struct DemRetriever<T = ReqwestTransport> {
    base_url: String,
    timeout: Duration,
    transport: T,
}

impl<T> std::fmt::Debug for DemRetriever<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DemRetriever")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DemRetriever<ReqwestTransport> {
    /// Retriever for the public endpoint over `reqwest`.
    pub fn new() -> Result<Self> {
        let transport = ReqwestTransport::new().map_err(network_error)?;
        Ok(Self::with_transport(transport))
    }
}

impl<T: HttpTransport> DemRetriever<T> {
    /// Retriever for the public endpoint over a custom transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            transport,
        }
    }

    /// Point at a different endpoint (mirrors, local test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Change the default timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Default timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// URL that [`retrieve`](Self::retrieve) would request for `params`.
    pub fn request_url(&self, params: &DemParams) -> String {
        build_url(&self.base_url, params)
    }

    /// Fetch with the default timeout.
    pub fn retrieve(&self, params: &DemParams) -> Result<Vec<u8>> {
        fetch(&self.transport, &self.base_url, params, self.timeout)
    }

    /// Fetch with an explicit timeout.
    pub fn retrieve_with_timeout(&self, params: &DemParams, timeout: Duration) -> Result<Vec<u8>> {
        fetch(&self.transport, &self.base_url, params, timeout)
    }
}

/// Validate a request and return the timeout to actually use.
fn check_request(
    params: &DemParams,
    timeout: Duration,
) -> std::result::Result<Duration, ValidationError> {
    params.validate()?;
    if timeout.is_zero() {
        return Err(ValidationError::ZeroTimeout);
    }
    Ok(timeout.min(MAX_TIMEOUT))
}

fn fetch<T: HttpTransport + ?Sized>(
    transport: &T,
    base_url: &str,
    params: &DemParams,
    timeout: Duration,
) -> Result<Vec<u8>> {
    let timeout = check_request(params, timeout)?;

    let url = build_url(base_url, params);
    debug!(
        url = %redact_api_key(&url),
        timeout_secs = timeout.as_secs_f64(),
        "Requesting DEM"
    );

    let response = transport.get(&url, timeout).map_err(|e| {
        warn!(url = %redact_api_key(&url), error = %e, "DEM request failed");
        network_error(e)
    })?;

    if response.is_error() {
        let reason = remote_reason(&response);
        warn!(status = response.status, reason = %reason, "DEM service returned an error");
        return Err(DemError::Remote {
            status: response.status,
            url,
            reason,
        });
    }

    debug!(status = response.status, bytes = response.body.len(), "DEM received");
    Ok(response.body)
}

fn network_error(err: TransportError) -> DemError {
    DemError::Network {
        timed_out: err.kind == TransportErrorKind::Timeout,
        reason: err.message,
    }
}

/// Reason phrase, followed by the service's own explanation when the body is
/// short readable text.
fn remote_reason(response: &HttpResponse) -> String {
    let phrase = response
        .reason
        .clone()
        .or_else(|| {
            reqwest::StatusCode::from_u16(response.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Unknown status".to_string());

    let detail = std::str::from_utf8(&response.body)
        .ok()
        .map(str::trim)
        .filter(|text| !text.is_empty() && !text.chars().any(|c| c.is_control() && !c.is_whitespace()));

    match detail {
        Some(text) => {
            let snippet: String = text.chars().take(MAX_REASON_BODY_CHARS).collect();
            format!("{}: {}", phrase, snippet)
        }
        None => phrase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct MockTransport {
        reply: std::result::Result<HttpResponse, TransportError>,
        calls: Mutex<Vec<(String, Duration)>>,
    }

    impl MockTransport {
        fn replying(reply: std::result::Result<HttpResponse, TransportError>) -> Self {
            Self {
                reply,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Duration)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl HttpTransport for MockTransport {
        fn get(&self, url: &str, timeout: Duration) -> std::result::Result<HttpResponse, TransportError> {
            self.calls.lock().unwrap().push((url.to_string(), timeout));
            self.reply.clone()
        }
    }

    fn valid_params() -> DemParams {
        DemParams::new()
            .with("demtype", "SRTMGL3")
            .with("south", -25.451567)
            .with("north", -25.418431)
            .with("west", -49.308291)
            .with("east", -49.235979)
            .with("outputFormat", "GTiff")
            .with("API_Key", "demoapikeyot2022")
    }

    #[test]
    fn test_default_timeout_passed_to_transport() {
        let mock = MockTransport::replying(Ok(HttpResponse::new(200, vec![1, 2, 3])));
        let body = retrieve_dem_with(&mock, &valid_params(), None).unwrap();
        assert_eq!(body, vec![1, 2, 3]);

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, DEFAULT_TIMEOUT);
        assert!(calls[0].0.starts_with("https://portal.opentopography.org/API/globaldem?"));
    }

    #[test]
    fn test_missing_key_makes_no_request() {
        let mock = MockTransport::replying(Ok(HttpResponse::new(200, Vec::new())));
        let mut params = valid_params();
        params.remove("outputFormat");

        let err = retrieve_dem_with(&mock, &params, None).unwrap_err();
        match err {
            DemError::Validation(ValidationError::MissingParameters { missing }) => {
                assert_eq!(missing, vec!["outputFormat".to_string()]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mock = MockTransport::replying(Ok(HttpResponse::new(200, Vec::new())));
        let err = retrieve_dem_with(&mock, &valid_params(), Some(Duration::ZERO)).unwrap_err();
        assert!(matches!(err, DemError::Validation(ValidationError::ZeroTimeout)));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_huge_timeout_capped() {
        let mock = MockTransport::replying(Ok(HttpResponse::new(200, b"ok".to_vec())));
        retrieve_dem_with(&mock, &valid_params(), Some(Duration::MAX)).unwrap();
        assert_eq!(mock.calls()[0].1, MAX_TIMEOUT);
    }

    #[test]
    fn test_retrieve_dem_validates_before_network() {
        let err = retrieve_dem(&DemParams::new(), None).unwrap_err();
        assert!(matches!(err, DemError::Validation(_)));
    }

    #[test]
    fn test_redirect_status_is_not_an_error() {
        let mock = MockTransport::replying(Ok(HttpResponse::new(304, b"cached".to_vec())));
        assert_eq!(retrieve_dem_with(&mock, &valid_params(), None).unwrap(), b"cached");
    }

    #[test]
    fn test_error_status_carries_url_and_reason() {
        let mock = MockTransport::replying(Ok(HttpResponse::new(
            401,
            b"Invalid API Key. Please request one from https://opentopography.org\n".to_vec(),
        )));
        let err = retrieve_dem_with(&mock, &valid_params(), None).unwrap_err();
        match &err {
            DemError::Remote { status, url, reason } => {
                assert_eq!(*status, 401);
                assert_eq!(url, &mock.calls()[0].0);
                assert!(url.contains("API_Key=demoapikeyot2022"));
                assert_eq!(
                    reason,
                    "Unauthorized: Invalid API Key. Please request one from https://opentopography.org"
                );
            }
            other => panic!("expected remote error, got {:?}", other),
        }
        assert!(!err.to_string().contains("demoapikeyot2022"));
    }

    #[test]
    fn test_binary_error_body_not_quoted() {
        let mock = MockTransport::replying(Ok(HttpResponse::new(502, vec![0x00, 0xff, 0x10])));
        let err = retrieve_dem_with(&mock, &valid_params(), None).unwrap_err();
        match err {
            DemError::Remote { reason, .. } => assert_eq!(reason, "Bad Gateway"),
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_long_error_body_truncated() {
        let mock = MockTransport::replying(Ok(HttpResponse::new(400, "x".repeat(1000).into_bytes())));
        let err = retrieve_dem_with(&mock, &valid_params(), None).unwrap_err();
        match err {
            DemError::Remote { reason, .. } => {
                assert_eq!(reason.len(), "Bad Request: ".len() + MAX_REASON_BODY_CHARS);
            }
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[test]
    fn test_transport_kinds_map_to_network_error() {
        let mock = MockTransport::replying(Err(TransportError::new(
            TransportErrorKind::Connect,
            "dns error: failed to lookup address",
        )));
        let err = retrieve_dem_with(&mock, &valid_params(), None).unwrap_err();
        match err {
            DemError::Network { reason, timed_out } => {
                assert!(!timed_out);
                assert!(reason.contains("dns error"));
            }
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[test]
    fn test_retriever_custom_base_url_and_timeout() {
        let mock = MockTransport::replying(Ok(HttpResponse::new(200, b"ok".to_vec())));
        let retriever = DemRetriever::with_transport(mock)
            .with_base_url("http://localhost:9999/dem")
            .with_timeout(Duration::from_secs(5));

        let params = valid_params();
        assert!(retriever.request_url(&params).starts_with("http://localhost:9999/dem?"));
        retriever.retrieve(&params).unwrap();
        retriever.retrieve_with_timeout(&params, Duration::from_millis(250)).unwrap();

        let calls = retriever.transport().calls();
        assert_eq!(calls[0].1, Duration::from_secs(5));
        assert_eq!(calls[1].1, Duration::from_millis(250));
        assert_eq!(calls[0].0, retriever.request_url(&params));
    }

    #[test]
    fn test_identical_content_builds_identical_url() {
        let retriever = DemRetriever::with_transport(MockTransport::replying(Ok(HttpResponse::new(200, Vec::new()))));
        let mut pairs: Vec<(String, crate::ParamValue)> = valid_params()
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        pairs.reverse();
        let reordered: DemParams = pairs.into_iter().collect();
        assert_eq!(retriever.request_url(&valid_params()), retriever.request_url(&reordered));
    }
}
