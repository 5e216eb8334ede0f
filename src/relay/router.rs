//! Relay application router and middleware setup.

use crate::relay::{handlers, websocket, RelayState};
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the relay application with all routes and middleware.
pub fn create_app(state: RelayState) -> Router {
    let enable_cors = state.config.enable_cors;

    let mut app = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/v1/air-quality", get(handlers::get_air_quality))
        .route("/api/v1/aqi", get(handlers::get_aqi))
        .route("/api/v1/ws/air-quality", get(websocket::websocket_handler))
        .with_state(state);

    if enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
