//! Error types for the DEM retriever.

use crate::query::redact_api_key;
use thiserror::Error;

/// Errors that can occur when retrieving DEM data.
#[derive(Debug, Error)]
pub enum DemError {
    /// The request was rejected before any network activity.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The request could not be completed (DNS, connect, TLS, timeout, body read).
    #[error("Network error: {reason}")]
    Network {
        /// Description of the underlying failure.
        reason: String,
        /// Whether the failure was the timeout expiring.
        timed_out: bool,
    },

    /// The remote service answered with an error status.
    #[error("HTTP {status} from {}: {reason}", redact_api_key(.url))]
    Remote {
        /// HTTP status code.
        status: u16,
        /// The exact request URL.
        url: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl DemError {
    /// HTTP status code, if the service answered with an error status.
    pub fn status(&self) -> Option<u16> {
        match self {
            DemError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for transport failures caused by the timeout expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DemError::Network { timed_out: true, .. })
    }
}

/// Request validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required parameter keys are absent.
    #[error("missing required parameters: {}", .missing.join(", "))]
    MissingParameters {
        /// Names of the absent keys, in required-key order.
        missing: Vec<String>,
    },

    /// A zero timeout can never complete a request.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}
