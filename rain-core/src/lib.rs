//! Core library for the `rain` CLI.
//!
//! This crate defines:
//! - Configuration (HTTP policy, upstream endpoints, default location)
//! - Rain sources for Météo-France and Orange, behind one trait
//! - A resolver that falls back from one source to the next
//! - Sunrise/sunset helpers
//!
//! It is used by `rain-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod geocode;
pub mod http;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod session;
pub mod sun;

pub use config::{Config, EndpointConfig, HttpConfig, LocationConfig};
pub use error::RainError;
pub use model::{GeoPoint, MunicipalityCode, RainForecast, RainForecastEntry};
pub use provider::{ProviderId, RainSource};
pub use resolver::RainResolver;
