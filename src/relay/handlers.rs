//! HTTP handlers for API endpoints.

use crate::aqi::{calculate_aqi, get_aqi_category};
use crate::error::SentinelError;
use crate::feed::message::AirQualityReading;
use crate::relay::RelayState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

impl IntoResponse for SentinelError {
    fn into_response(self) -> Response {
        let status = match self {
            SentinelError::InvalidCoordinates(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CoordinatesQuery {
    pub lat: f64,
    pub lon: f64,
}

/// Current reading for a location.
pub async fn get_air_quality(
    State(state): State<RelayState>,
    Query(query): Query<CoordinatesQuery>,
) -> Result<Json<AirQualityReading>, SentinelError> {
    state
        .source
        .fetch(query.lat, query.lon)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Failed to fetch reading for ({}, {}): {}", query.lat, query.lon, e);
            e
        })
}

#[derive(Debug, Deserialize)]
pub struct ConcentrationsQuery {
    pub pm25: f64,
    pub pm10: f64,
    pub no2: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AqiResponse {
    pub aqi: u32,
    pub category: String,
    pub color: String,
    pub description: String,
}

/// Composite index and category for raw concentrations.
pub async fn get_aqi(Query(query): Query<ConcentrationsQuery>) -> Json<AqiResponse> {
    let aqi = calculate_aqi(query.pm25, query.pm10, query.no2);
    let category = get_aqi_category(f64::from(aqi));
    Json(AqiResponse {
        aqi,
        category: category.category.to_string(),
        color: category.color.to_string(),
        description: category.description.to_string(),
    })
}

/// Health check endpoint.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "air-sentinel",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "air-sentinel");
    }

    #[tokio::test]
    async fn test_get_aqi() {
        let Json(body) = get_aqi(Query(ConcentrationsQuery {
            pm25: 35.4,
            pm10: 154.0,
            no2: 100.0,
        }))
        .await;
        assert_eq!(body.aqi, 100);
        assert_eq!(body.category, "Moderate");
        assert_eq!(body.color, "yellow");
    }

    #[test]
    fn test_error_status_codes() {
        let response = SentinelError::invalid_coordinates("lat").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = SentinelError::web_server_error("upstream").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
