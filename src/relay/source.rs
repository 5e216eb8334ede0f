//! Where the relay gets its readings from.

use crate::error::{Result, SentinelError};
use crate::feed::message::{AirQualityComponents, AirQualityReading, Location};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// A provider of readings for a coordinate pair.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Fetch the current reading at a location.
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<AirQualityReading>;
}

/// Reject coordinates outside [-90, 90] x [-180, 180].
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(SentinelError::invalid_coordinates(format!(
            "latitude {} must be between -90 and 90",
            latitude
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(SentinelError::invalid_coordinates(format!(
            "longitude {} must be between -180 and 180",
            longitude
        )));
    }
    Ok(())
}

/// Generates plausible sample readings without any upstream service.
///
/// Values depend only on the coordinates and the hour, so repeated requests
/// within an hour agree with each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSource;

impl SimulatedSource {
    pub fn new() -> Self {
        Self
    }

    /// The reading this source reports for a location at time `at`.
    pub fn reading_at(&self, latitude: f64, longitude: f64, at: DateTime<Utc>) -> AirQualityReading {
        let seed = latitude * 1_000.0 + longitude * 7.0;
        let hour = (at.timestamp() / 3_600) as f64;
        let wave = |channel: f64| ((seed + channel * 13.37) * 12.9898 + hour * 0.261).sin().abs();
        let tenth = |value: f64| (value * 10.0).round() / 10.0;

        let pm2_5 = tenth(4.0 + 60.0 * wave(1.0));
        let components = AirQualityComponents {
            co: tenth(180.0 + 420.0 * wave(2.0)),
            no: tenth(0.2 + 6.0 * wave(3.0)),
            no2: tenth(5.0 + 95.0 * wave(4.0)),
            o3: tenth(15.0 + 110.0 * wave(5.0)),
            so2: tenth(0.5 + 25.0 * wave(6.0)),
            pm2_5,
            pm10: tenth(pm2_5 * 1.5 + 20.0 * wave(7.0)),
            nh3: Some(tenth(0.5 + 12.0 * wave(8.0))),
        };

        AirQualityReading::from_components(
            components,
            at.to_rfc3339(),
            Some(Location {
                lat: latitude,
                lon: longitude,
                name: None,
            }),
        )
    }
}

#[async_trait]
impl ReadingSource for SimulatedSource {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<AirQualityReading> {
        validate_coordinates(latitude, longitude)?;
        Ok(self.reading_at(latitude, longitude, Utc::now()))
    }
}

/// Locations a [`CachedSource`] remembers unless told otherwise.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Caches another source's readings per location for a fixed time.
///
/// Expired entries are dropped whenever a new reading is stored, and the
/// oldest entry makes room once `capacity` locations are held.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    capacity: usize,
    entries: RwLock<HashMap<String, (Instant, AirQualityReading)>>,
}

impl<S: ReadingSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self::with_capacity(inner, ttl, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: S, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            ttl,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Locations closer than ~11 m share a cache entry.
    fn cache_key(latitude: f64, longitude: f64) -> String {
        format!("{:.4},{:.4}", latitude, longitude)
    }

    pub async fn cached_locations(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl<S: ReadingSource> ReadingSource for CachedSource<S> {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<AirQualityReading> {
        validate_coordinates(latitude, longitude)?;
        let key = Self::cache_key(latitude, longitude);

        if let Some((fetched_at, reading)) = self.entries.read().await.get(&key) {
            if fetched_at.elapsed() < self.ttl {
                debug!("Cache hit for {}", key);
                return Ok(reading.clone());
            }
        }

        let reading = self.inner.fetch(latitude, longitude).await?;

        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, (fetched_at, _)| fetched_at.elapsed() < ttl);
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (fetched_at, _))| *fetched_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!("Cache full, evicting {}", oldest);
                entries.remove(&oldest);
            }
        }
        entries.insert(key, (Instant::now(), reading.clone()));
        Ok(reading)
    }
}
