//! Live air-quality feed client.
//!
//! Maintains a WebSocket subscription to a push data source, reconnects with
//! exponential backoff when the connection drops, and fans parsed readings and
//! errors out to any number of listeners.

pub mod backoff;
pub mod client;
pub mod config;
pub mod credentials;
pub mod listeners;
pub mod message;

// Re-export commonly used items
pub use backoff::{CloseAction, ConnectionState, ConnectionTracker, ReconnectPolicy};
pub use client::FeedClient;
pub use config::FeedConfig;
pub use credentials::{CredentialSource, EnvToken, StaticToken, TokenFile};
pub use listeners::{ListenerList, Subscription};
pub use message::{AirQualityComponents, AirQualityReading, FeedMessage, Location, LocationRequest};
