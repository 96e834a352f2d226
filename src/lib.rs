// src/lib.rs
//! GPS Relay Library
//!
//! Ingests a raw NMEA-0183 stream over TCP or serial, keeps a short
//! history of decoded fixes and republishes normalized position views to
//! subscribers at the refresh periods they ask for.

pub mod config;
pub mod display;
pub mod error;
pub mod nmea;
pub mod position;
pub mod registry;
pub mod relay;

// Re-export main types for convenience
pub use config::RelayConfig;
pub use error::{GpsError, Result};
pub use position::{Fix, FixBuffer, PositionType};
pub use registry::{normalize_period, Subscription, DEFAULT_PERIOD_MS};
pub use relay::{GpsRelay, RelayStatus, StreamSource};
