//! Wire messages and the reading data model.

use crate::aqi::calculate_aqi;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Measured pollutant concentrations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityComponents {
    /// Carbon monoxide
    pub co: f64,
    /// Nitric oxide
    pub no: f64,
    /// Nitrogen dioxide
    pub no2: f64,
    /// Ozone
    pub o3: f64,
    /// Sulphur dioxide
    pub so2: f64,
    /// Fine particulate matter
    pub pm2_5: f64,
    /// Coarse particulate matter
    pub pm10: f64,
    /// Ammonia, not reported by every source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nh3: Option<f64>,
}

impl AirQualityComponents {
    /// Composite index derived from PM2.5, PM10 and NO2.
    pub fn composite_aqi(&self) -> u32 {
        calculate_aqi(self.pm2_5, self.pm10, self.no2)
    }
}

/// Where a reading was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A snapshot of pollutant concentrations plus the derived composite index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub aqi: f64,
    pub components: AirQualityComponents,
    /// ISO-8601 time the reading was produced
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl AirQualityReading {
    /// Build a reading whose `aqi` is computed from its components.
    pub fn from_components(
        components: AirQualityComponents,
        timestamp: impl Into<String>,
        location: Option<Location>,
    ) -> Self {
        Self {
            aqi: f64::from(components.composite_aqi()),
            components,
            timestamp: timestamp.into(),
            location,
        }
    }
}

/// Messages pushed by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    AirQualityUpdate { data: AirQualityReading },
    Error { message: String },
    /// Any other `type`; ignored by clients
    #[serde(other)]
    Unknown,
}

impl FeedMessage {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode as a text frame.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Location-change request sent by clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}
