//! Query-string encoding for DEM requests.
//!
//! Uses `application/x-www-form-urlencoded` rules: alphanumerics and `*-._`
//! pass through, space becomes `+`, every other byte is percent-escaped.

use crate::params::{DemParams, API_KEY};
use url::form_urlencoded;

/// Placeholder written over the API key in log lines and error messages.
const REDACTED: &str = "REDACTED";

/// Encode parameters as `key=value` pairs joined with `&`.
pub fn encode_query(params: &DemParams) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter() {
        serializer.append_pair(key, &value.to_string());
    }
    serializer.finish()
}

/// Decode a query string into its `(key, value)` pairs, in order.
pub fn decode_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

/// Join the base endpoint and the encoded parameters with `?`.
pub fn build_url(base_url: &str, params: &DemParams) -> String {
    format!("{}?{}", base_url, encode_query(params))
}

/// Replace the `API_Key` value in a request URL.
///
/// URLs without a query or without the key are returned unchanged.
pub fn redact_api_key(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let pairs = decode_query(query);
    if !pairs.iter().any(|(k, _)| k == API_KEY) {
        return url.to_string();
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        if key == API_KEY {
            serializer.append_pair(key, REDACTED);
        } else {
            serializer.append_pair(key, value);
        }
    }
    format!("{}?{}", base, serializer.finish())
}
