//! Request configuration: YAML file plus command-line overrides.
//!
//! Example file:
//!
//! ```yaml
//! demtype: SRTMGL1
//! bbox:
//!   south: -25.451567
//!   north: -25.418431
//!   west: -49.308291
//!   east: -49.235979
//! output_format: GTiff
//! timeout_secs: 60
//! params:
//!   datasetName: SRTMGL1
//! ```
//!
//! Every field is optional. Flags override the file, the file overrides the
//! built-in defaults.

use crate::error::CliError;
use opentopo_dem::{
    DemParams, ParamValue, API_KEY, DEFAULT_TIMEOUT, DEMTYPE, EAST, NORTH, OUTPUT_FORMAT, SOUTH,
    WEST,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// DEM product requested when none is configured.
pub const DEFAULT_DEMTYPE: &str = "SRTMGL3";

/// Output format requested when none is configured.
pub const DEFAULT_OUTPUT_FORMAT: &str = "GTiff";

/// Bounding box edges; any may be left out.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BboxConfig {
    /// Southern latitude.
    pub south: Option<f64>,
    /// Northern latitude.
    pub north: Option<f64>,
    /// Western longitude.
    pub west: Option<f64>,
    /// Eastern longitude.
    pub east: Option<f64>,
}

/// A (possibly partial) DEM request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    /// DEM product; [`DEFAULT_DEMTYPE`] when unset.
    pub demtype: Option<String>,
    /// Requested extent.
    #[serde(default)]
    pub bbox: BboxConfig,
    /// Response encoding; [`DEFAULT_OUTPUT_FORMAT`] when unset.
    pub output_format: Option<String>,
    /// OpenTopography API key.
    pub api_key: Option<String>,
    /// Request timeout in seconds; [`DEFAULT_TIMEOUT`] when unset.
    pub timeout_secs: Option<f64>,
    /// Extra query parameters passed through to the service.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl RequestConfig {
    /// Load a request file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: RequestConfig) -> RequestConfig {
        let mut params = self.params;
        params.extend(overrides.params);
        RequestConfig {
            demtype: overrides.demtype.or(self.demtype),
            bbox: BboxConfig {
                south: overrides.bbox.south.or(self.bbox.south),
                north: overrides.bbox.north.or(self.bbox.north),
                west: overrides.bbox.west.or(self.bbox.west),
                east: overrides.bbox.east.or(self.bbox.east),
            },
            output_format: overrides.output_format.or(self.output_format),
            api_key: overrides.api_key.or(self.api_key),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            params,
        }
    }

    /// Build the query parameters.
    ///
    /// Unset bounding box edges and a missing API key are left out so the
    /// library reports them as missing.
    pub fn to_params(&self) -> DemParams {
        let mut params: DemParams = self.params.clone().into_iter().collect();

        params.insert(DEMTYPE, self.demtype.as_deref().unwrap_or(DEFAULT_DEMTYPE));
        params.insert(
            OUTPUT_FORMAT,
            self.output_format.as_deref().unwrap_or(DEFAULT_OUTPUT_FORMAT),
        );

        let edges = [
            (SOUTH, self.bbox.south),
            (NORTH, self.bbox.north),
            (WEST, self.bbox.west),
            (EAST, self.bbox.east),
        ];
        for (key, value) in edges {
            match value {
                Some(v) => {
                    params.insert(key, v);
                }
                None => {
                    params.remove(key);
                }
            }
        }

        match &self.api_key {
            Some(key) => {
                params.insert(API_KEY, key.as_str());
            }
            None => {
                params.remove(API_KEY);
            }
        }

        params
    }

    /// Request timeout.
    pub fn timeout(&self) -> Result<Duration, CliError> {
        match self.timeout_secs {
            None => Ok(DEFAULT_TIMEOUT),
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|_| CliError::Config(format!("invalid timeout: {} seconds", secs))),
        }
    }
}

/// Parse a `key=value` pair from the command line.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}
