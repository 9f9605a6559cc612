//! Request parameters for the global DEM endpoint.
//!
//! [`DemParams`] is a string-keyed map of scalar values, checked against the
//! fixed set of [`REQUIRED_KEYS`] before a request is made. [`DemRequest`] is
//! the typed way to build one.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// DEM product identifier key.
pub const DEMTYPE: &str = "demtype";
/// Southern latitude key.
pub const SOUTH: &str = "south";
/// Northern latitude key.
pub const NORTH: &str = "north";
/// Western longitude key.
pub const WEST: &str = "west";
/// Eastern longitude key.
pub const EAST: &str = "east";
/// Response encoding key.
pub const OUTPUT_FORMAT: &str = "outputFormat";
/// Authentication token key.
pub const API_KEY: &str = "API_Key";

/// Keys that must be present in every request.
pub const REQUIRED_KEYS: [&str; 7] = [DEMTYPE, SOUTH, NORTH, WEST, EAST, OUTPUT_FORMAT, API_KEY];

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(i) => write!(f, "{}", i),
            // Keep "1.0" rather than "1" so whole degrees still read as floats.
            ParamValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        // Go through the shortest f32 text so 0.1f32 stays "0.1".
        ParamValue::Float(v.to_string().parse().unwrap_or(v as f64))
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

/// Query parameters for a DEM request.
///
/// Keys are kept sorted, so two maps with the same pairs always encode to the
/// same query string regardless of insertion order. Keys beyond the required
/// set are passed through to the service untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemParams {
    values: BTreeMap<String, ParamValue>,
}

impl DemParams {
    /// Create an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a parameter, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Remove a parameter.
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.values.remove(key)
    }

    /// Look up a parameter.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Whether a parameter is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Required keys that are absent, in [`REQUIRED_KEYS`] order.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !self.values.contains_key(*key))
            .collect()
    }

    /// Check that every required key is present.
    ///
    /// Values are not inspected: coordinates are not range-checked and the
    /// DEM type is not matched against a known list.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = self.missing_keys();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingParameters {
                missing: missing.into_iter().map(str::to_string).collect(),
            })
        }
    }
}

impl<K, V> FromIterator<(K, V)> for DemParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for DemParams
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

/// Geographic extent in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern latitude.
    pub south: f64,
    /// Northern latitude.
    pub north: f64,
    /// Western longitude.
    pub west: f64,
    /// Eastern longitude.
    pub east: f64,
}

impl BoundingBox {
    /// Create a bounding box from its four edges.
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self {
            south,
            north,
            west,
            east,
        }
    }
}

/// Typed description of a global DEM request.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DemRequest {
    /// DEM product identifier, e.g. `SRTMGL3`.
    pub demtype: String,
    /// Requested extent.
    pub bbox: BoundingBox,
    /// Response encoding, e.g. `GTiff`.
    #[serde(rename = "outputFormat")]
    pub output_format: String,
    /// OpenTopography API key.
    #[serde(rename = "API_Key")]
    pub api_key: String,
    /// Extra parameters passed through as-is.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, ParamValue>,
}

impl DemRequest {
    /// Create a request with no extra parameters.
    pub fn new(
        demtype: impl Into<String>,
        bbox: BoundingBox,
        output_format: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            demtype: demtype.into(),
            bbox,
            output_format: output_format.into(),
            api_key: api_key.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Add an extra pass-through parameter.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Flatten into a parameter map.
    ///
    /// Extra parameters never override the typed fields.
    pub fn to_params(&self) -> DemParams {
        let mut params: DemParams = self.extra.clone().into_iter().collect();
        params.extend([
            (DEMTYPE, ParamValue::from(self.demtype.as_str())),
            (SOUTH, ParamValue::from(self.bbox.south)),
            (NORTH, ParamValue::from(self.bbox.north)),
            (WEST, ParamValue::from(self.bbox.west)),
            (EAST, ParamValue::from(self.bbox.east)),
            (OUTPUT_FORMAT, ParamValue::from(self.output_format.as_str())),
            (API_KEY, ParamValue::from(self.api_key.as_str())),
        ]);
        params
    }
}

impl From<&DemRequest> for DemParams {
    fn from(request: &DemRequest) -> Self {
        request.to_params()
    }
}

impl From<DemRequest> for DemParams {
    fn from(request: DemRequest) -> Self {
        request.to_params()
    }
}

impl fmt::Debug for DemRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemRequest")
            .field("demtype", &self.demtype)
            .field("bbox", &self.bbox)
            .field("output_format", &self.output_format)
            .field("api_key", &"<redacted>")
            .field("extra", &self.extra)
            .finish()
    }
}
