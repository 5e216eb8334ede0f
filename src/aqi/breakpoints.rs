//! Breakpoint tables for the pollutants that feed the composite index.

use serde::{Deserialize, Serialize};

/// One linear segment of the concentration-to-index mapping for a pollutant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantBreakpoint {
    /// Lowest concentration covered by this segment (inclusive)
    pub concentration_min: f64,
    /// Highest concentration covered by this segment (inclusive)
    pub concentration_max: f64,
    /// Index value at `concentration_min`
    pub index_min: u32,
    /// Index value at `concentration_max`
    pub index_max: u32,
}

impl PollutantBreakpoint {
    const fn new(concentration_min: f64, concentration_max: f64, index_min: u32, index_max: u32) -> Self {
        Self {
            concentration_min,
            concentration_max,
            index_min,
            index_max,
        }
    }

    /// Whether `concentration` falls inside this segment.
    pub fn contains(&self, concentration: f64) -> bool {
        concentration >= self.concentration_min && concentration <= self.concentration_max
    }

    /// Interpolate the sub-index for a concentration inside this segment.
    pub fn interpolate(&self, concentration: f64) -> u32 {
        let index_span = f64::from(self.index_max - self.index_min);
        let concentration_span = self.concentration_max - self.concentration_min;
        let value = index_span / concentration_span * (concentration - self.concentration_min)
            + f64::from(self.index_min);
        value.round() as u32
    }
}

/// Fine particulate matter, µg/m³.
pub const PM25_BREAKPOINTS: [PollutantBreakpoint; 6] = [
    PollutantBreakpoint::new(0.0, 12.0, 0, 50),
    PollutantBreakpoint::new(12.1, 35.4, 51, 100),
    PollutantBreakpoint::new(35.5, 55.4, 101, 150),
    PollutantBreakpoint::new(55.5, 150.4, 151, 200),
    PollutantBreakpoint::new(150.5, 250.4, 201, 300),
    PollutantBreakpoint::new(250.5, 500.4, 301, 500),
];

/// Coarse particulate matter, µg/m³.
pub const PM10_BREAKPOINTS: [PollutantBreakpoint; 6] = [
    PollutantBreakpoint::new(0.0, 54.0, 0, 50),
    PollutantBreakpoint::new(55.0, 154.0, 51, 100),
    PollutantBreakpoint::new(155.0, 254.0, 101, 150),
    PollutantBreakpoint::new(255.0, 354.0, 151, 200),
    PollutantBreakpoint::new(355.0, 424.0, 201, 300),
    PollutantBreakpoint::new(425.0, 604.0, 301, 500),
];

/// Nitrogen dioxide, ppb.
pub const NO2_BREAKPOINTS: [PollutantBreakpoint; 6] = [
    PollutantBreakpoint::new(0.0, 53.0, 0, 50),
    PollutantBreakpoint::new(54.0, 100.0, 51, 100),
    PollutantBreakpoint::new(101.0, 360.0, 101, 150),
    PollutantBreakpoint::new(361.0, 649.0, 151, 200),
    PollutantBreakpoint::new(650.0, 1249.0, 201, 300),
    PollutantBreakpoint::new(1250.0, 2049.0, 301, 500),
];

/// Pollutants with a breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pollutant {
    #[serde(rename = "pm2_5")]
    Pm25,
    Pm10,
    No2,
}

impl Pollutant {
    /// All pollutants that contribute to the composite index.
    pub const ALL: [Pollutant; 3] = [Pollutant::Pm25, Pollutant::Pm10, Pollutant::No2];

    /// The breakpoint table for this pollutant, in ascending order.
    pub fn breakpoints(self) -> &'static [PollutantBreakpoint] {
        match self {
            Pollutant::Pm25 => &PM25_BREAKPOINTS,
            Pollutant::Pm10 => &PM10_BREAKPOINTS,
            Pollutant::No2 => &NO2_BREAKPOINTS,
        }
    }
}
