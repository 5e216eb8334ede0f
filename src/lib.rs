//! # Air Sentinel - Air Quality Index and Live Feed
//!
//! A Rust crate for air-quality monitoring dashboards: compute the composite
//! Air Quality Index from pollutant concentrations, and keep a live feed of
//! readings flowing to any number of listeners over a reconnecting WebSocket.
//!
//! ## Features
//!
//! - **AQI calculation**: breakpoint interpolation for PM2.5, PM10 and NO2
//! - **Health categories**: the six standard bands with colors and advice
//! - **Live feed client**: exponential-backoff reconnects and listener fan-out
//! - **Relay server**: the WebSocket feed and REST API the client talks to
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use air_sentinel::{calculate_aqi, get_aqi_category, FeedClient, FeedConfig, StaticToken};
//!
//! #[tokio::main]
//! async fn main() {
//!     let aqi = calculate_aqi(35.4, 154.0, 100.0);
//!     println!("{} ({})", aqi, get_aqi_category(f64::from(aqi)).category);
//!
//!     let client = FeedClient::new(FeedConfig::default(), StaticToken::new("token"));
//!     client.subscribe(|reading| println!("AQI {}", reading.aqi));
//!     client.connect();
//! }
//! ```

pub mod aqi;
pub mod error;
pub mod feed;
pub mod relay;

// Re-export public API
pub use aqi::{calculate_aqi, get_aqi_category, AqiCategory, Pollutant, PollutantBreakpoint};
pub use error::{FeedError, Result, SentinelError};
pub use feed::{
    AirQualityComponents, AirQualityReading, ConnectionState, CredentialSource, EnvToken, FeedClient,
    FeedConfig, FeedMessage, Location, StaticToken, Subscription, TokenFile,
};
pub use relay::{start_relay_server, RelayConfig, ReadingSource};

/// The default relay server port
pub const DEFAULT_RELAY_PORT: u16 = 8000;

/// Initial reconnect delay in milliseconds
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1_000;

/// Reconnect attempts before the feed client gives up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Seconds between pushed updates for a subscribed location
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;

/// Environment variable the CLI and [`EnvToken`] read the feed token from
pub const TOKEN_ENV_VAR: &str = "AIR_SENTINEL_TOKEN";
