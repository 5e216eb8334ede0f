//! Composite index calculation.

use crate::aqi::breakpoints::{Pollutant, PollutantBreakpoint};

/// Sub-index reported for any concentration above the top of its table.
pub const AQI_CEILING: u32 = 500;

/// Compute the sub-index for one pollutant.
///
/// Scans `breakpoints` in order and interpolates inside the first segment
/// containing `concentration`. Values above the highest segment saturate at
/// [`AQI_CEILING`]; anything else that matches no segment (negative values,
/// gaps between segments, NaN) yields 0.
pub fn pollutant_sub_index(concentration: f64, breakpoints: &[PollutantBreakpoint]) -> u32 {
    if let Some(segment) = breakpoints.iter().find(|bp| bp.contains(concentration)) {
        return segment.interpolate(concentration);
    }

    match breakpoints.last() {
        Some(top) if concentration > top.concentration_max => AQI_CEILING,
        _ => 0,
    }
}

/// Compute the composite index from PM2.5, PM10 and NO2 concentrations.
///
/// The result is the highest of the three sub-indices.
pub fn calculate_aqi(pm25: f64, pm10: f64, no2: f64) -> u32 {
    let pm25_aqi = pollutant_sub_index(pm25, Pollutant::Pm25.breakpoints());
    let pm10_aqi = pollutant_sub_index(pm10, Pollutant::Pm10.breakpoints());
    let no2_aqi = pollutant_sub_index(no2, Pollutant::No2.breakpoints());

    pm25_aqi.max(pm10_aqi).max(no2_aqi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::breakpoints::{NO2_BREAKPOINTS, PM10_BREAKPOINTS, PM25_BREAKPOINTS};

    #[test]
    fn test_pm25_boundaries_are_exact() {
        for bp in PM25_BREAKPOINTS {
            assert_eq!(pollutant_sub_index(bp.concentration_min, &PM25_BREAKPOINTS), bp.index_min);
            assert_eq!(pollutant_sub_index(bp.concentration_max, &PM25_BREAKPOINTS), bp.index_max);
        }
    }

    #[test]
    fn test_other_tables_boundaries_are_exact() {
        for table in [&PM10_BREAKPOINTS, &NO2_BREAKPOINTS] {
            for bp in table.iter() {
                assert_eq!(pollutant_sub_index(bp.concentration_min, table), bp.index_min);
                assert_eq!(pollutant_sub_index(bp.concentration_max, table), bp.index_max);
            }
        }
    }

    #[test]
    fn test_interpolation_midpoint() {
        // Halfway through the first PM2.5 segment
        assert_eq!(pollutant_sub_index(6.0, &PM25_BREAKPOINTS), 25);
    }

    #[test]
    fn test_saturates_above_table() {
        assert_eq!(pollutant_sub_index(500.5, &PM25_BREAKPOINTS), AQI_CEILING);
        assert_eq!(pollutant_sub_index(10_000.0, &NO2_BREAKPOINTS), AQI_CEILING);
    }

    #[test]
    fn test_no_data_cases_return_zero() {
        assert_eq!(pollutant_sub_index(-1.0, &PM25_BREAKPOINTS), 0);
        assert_eq!(pollutant_sub_index(f64::NAN, &PM25_BREAKPOINTS), 0);
        // Falls between 12.0 and 12.1
        assert_eq!(pollutant_sub_index(12.05, &PM25_BREAKPOINTS), 0);
        assert_eq!(pollutant_sub_index(5.0, &[]), 0);
    }

    #[test]
    fn test_composite_takes_maximum() {
        assert_eq!(calculate_aqi(12.0, 54.0, 53.0), 50);
        assert_eq!(calculate_aqi(35.4, 154.0, 100.0), 100);
        assert_eq!(calculate_aqi(0.0, 0.0, 360.0), 150);
        assert_eq!(calculate_aqi(0.0, 0.0, 0.0), 0);
    }
}
