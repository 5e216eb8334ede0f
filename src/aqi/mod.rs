//! Air Quality Index computation.
//!
//! Converts raw pollutant concentrations into a composite index using linear
//! interpolation over fixed breakpoint tables, and maps an index onto its
//! health category.

pub mod breakpoints;
pub mod calculator;
pub mod category;

// Re-export commonly used items
pub use breakpoints::{Pollutant, PollutantBreakpoint};
pub use calculator::{calculate_aqi, pollutant_sub_index, AQI_CEILING};
pub use category::{get_aqi_category, AqiCategory};
