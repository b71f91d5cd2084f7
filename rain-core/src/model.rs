use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{RainError, Result};

/// A GPS position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Rejects non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<()> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(RainError::InvalidInput(format!(
                "non-finite coordinates ({}, {})",
                self.lat, self.lon
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(RainError::InvalidInput(format!(
                "coordinates out of range ({}, {})",
                self.lat, self.lon
            )));
        }
        Ok(())
    }
}

/// INSEE municipality code. Opaque: never parsed beyond trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MunicipalityCode(String);

impl MunicipalityCode {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RainError::InvalidInput("no municipality code".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MunicipalityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One normalized step of a rain nowcast.
///
/// Fields the source sent that have no normalized counterpart are kept in
/// `extra` and serialized back out next to the normalized ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RainForecastEntry {
    #[serde(alias = "niveauPluie")]
    pub rain_level: u8,
    #[serde(alias = "niveauPluieText")]
    pub rain_level_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RainForecastEntry {
    pub fn new(rain_level: u8, rain_level_text: impl Into<String>) -> Self {
        Self {
            rain_level,
            rain_level_text: rain_level_text.into(),
            timestamp: None,
            extra: Map::new(),
        }
    }
}

/// Chronological nowcast as returned by a source. May be empty.
pub type RainForecast = Vec<RainForecastEntry>;
