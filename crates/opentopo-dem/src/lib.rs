//! # opentopo-dem
//!
//! Client for the OpenTopography global DEM API.
//!
//! Builds a request URL from a set of query parameters, performs a blocking
//! HTTP GET with a timeout, and returns the response body untouched. The
//! payload (usually a GeoTIFF) is never parsed.
//!
//! ## Required parameters
//!
//! | Key | Meaning |
//! |---|---|
//! | `demtype` | DEM product, e.g. `SRTMGL3`, `SRTMGL1`, `COP30` |
//! | `south`, `north`, `west`, `east` | bounding box in decimal degrees |
//! | `outputFormat` | response encoding, e.g. `GTiff` |
//! | `API_Key` | OpenTopography API key |
//!
//! Missing keys are reported as [`ValidationError::MissingParameters`] before
//! any network I/O. Values are passed through without range checks.
//!
//! ## Example
//!
//! ```no_run
//! use opentopo_dem::{retrieve_dem, BoundingBox, DemRequest};
//! use std::time::Duration;
//!
//! let request = DemRequest::new(
//!     "SRTMGL3",
//!     BoundingBox::new(-25.451567, -25.418431, -49.308291, -49.235979),
//!     "GTiff",
//!     "demoapikeyot2022",
//! );
//!
//! let tiff = retrieve_dem(&request.to_params(), Some(Duration::from_secs(60)))?;
//! println!("Downloaded {} bytes", tiff.len());
//! # Ok::<(), opentopo_dem::DemError>(())
//! ```

mod error;
mod params;
mod query;
mod retriever;
mod transport;

pub use error::{DemError, ValidationError};
pub use params::{
    BoundingBox, DemParams, DemRequest, ParamValue, API_KEY, DEMTYPE, EAST, NORTH, OUTPUT_FORMAT,
    REQUIRED_KEYS, SOUTH, WEST,
};
pub use query::{build_url, decode_query, encode_query, redact_api_key};
pub use retriever::{retrieve_dem, retrieve_dem_with, DemRetriever, BASE_URL, DEFAULT_TIMEOUT};
pub use transport::{
    HttpResponse, HttpTransport, ReqwestTransport, TransportError, TransportErrorKind, MAX_TIMEOUT,
};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
