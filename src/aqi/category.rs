//! Health categories for composite index values.

use serde::Serialize;

/// A health category with its display color and advisory text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AqiCategory {
    pub category: &'static str,
    pub color: &'static str,
    pub description: &'static str,
}

const GOOD: AqiCategory = AqiCategory {
    category: "Good",
    color: "green",
    description: "Air quality is satisfactory, and air pollution poses little or no risk.",
};

const MODERATE: AqiCategory = AqiCategory {
    category: "Moderate",
    color: "yellow",
    description: "Air quality is acceptable. However, there may be a risk for some people.",
};

const SENSITIVE: AqiCategory = AqiCategory {
    category: "Unhealthy for Sensitive Groups",
    color: "orange",
    description: "Members of sensitive groups may experience health effects.",
};

const UNHEALTHY: AqiCategory = AqiCategory {
    category: "Unhealthy",
    color: "red",
    description: "Everyone may begin to experience health effects.",
};

const VERY_UNHEALTHY: AqiCategory = AqiCategory {
    category: "Very Unhealthy",
    color: "purple",
    description: "Health warnings of emergency conditions. The entire population is likely to be affected.",
};

const HAZARDOUS: AqiCategory = AqiCategory {
    category: "Hazardous",
    color: "maroon",
    description: "Health alert: everyone may experience more serious health effects.",
};

/// Classify an index value into one of the six health bands.
///
/// Every input has a category. There is no lower bound check, so negative
/// values land in "Good".
pub fn get_aqi_category(aqi: f64) -> AqiCategory {
    if aqi <= 50.0 {
        GOOD
    } else if aqi <= 100.0 {
        MODERATE
    } else if aqi <= 150.0 {
        SENSITIVE
    } else if aqi <= 200.0 {
        UNHEALTHY
    } else if aqi <= 300.0 {
        VERY_UNHEALTHY
    } else {
        HAZARDOUS
    }
}
