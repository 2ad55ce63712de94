//! Core library for the `meteo` voice skill.
//!
//! This crate defines:
//! - Forecast caching keyed by location, with a short TTL
//! - Resolution of a requested time onto a 3-hour forecast sample
//! - Condition, clothing and temperature verdicts built on the resolved sample
//! - Configuration and the OpenWeatherMap provider
//!
//! It is used by `meteo-cli`, but can also be driven by a dialogue platform adapter.

pub mod advice;
pub mod cache;
pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod service;

pub use cache::ForecastCache;
pub use config::Config;
pub use error::ForecastError;
pub use location::{CountryTable, Location, LocationQuery};
pub use model::{BundleStatus, ForecastBundle, ForecastSample, RequestedTime, WeatherCondition};
pub use provider::ForecastProvider;
pub use resolver::resolve;
pub use service::{ForecastRequest, ResolvedForecast, WeatherService};
